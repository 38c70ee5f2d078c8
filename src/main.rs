// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Liked-Sync Server
//!
//! Logs in to Spotify once via the browser, then copies the user's liked
//! songs into a playlist every week.

use liked_sync::{
    config::Config,
    services::{
        run_logged_sync, spawn_weekly_sync, AuthSession, FileTokenStore, PlaylistSyncer,
        SpotifyApi, SpotifyClient, TokenStore,
    },
    AppState,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging
    init_logging()?;

    // Load configuration from environment
    let config = Config::from_env()?;
    tracing::info!(port = config.port, "Starting Liked-Sync");

    let api: Arc<dyn SpotifyApi> = Arc::new(SpotifyClient::new(
        config.spotify_client_id.clone(),
        config.spotify_client_secret.clone(),
        config.redirect_uri.clone(),
        config.http_timeout,
    )?);

    let store: Arc<dyn TokenStore> = Arc::new(FileTokenStore::new(config.token_path.clone()));
    tracing::info!(path = %config.token_path.display(), "Using credential file");

    let session = Arc::new(AuthSession::load(api.clone(), store).await);

    let syncer = Arc::new(PlaylistSyncer::new(
        api,
        session.clone(),
        config.playlist_target.clone(),
        config.liked_tracks_limit,
    ));

    // Weekly trigger
    spawn_weekly_sync(config.sync_schedule, syncer.clone());
    tracing::info!(schedule = %config.sync_schedule, "Weekly sync scheduled");

    if config.sync_on_startup {
        let syncer = syncer.clone();
        tokio::spawn(async move {
            run_logged_sync(&syncer).await;
        });
    }

    // Build shared state
    let state = Arc::new(AppState {
        config: config.clone(),
        session,
        syncer,
    });

    // Build router
    let app = liked_sync::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging.
fn init_logging() -> Result<(), Box<dyn std::error::Error>> {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            EnvFilter::from_default_env()
                .add_directive("liked_sync=debug".parse()?)
                .add_directive("info".parse()?),
        )
        .with(format)
        .init();
    Ok(())
}
