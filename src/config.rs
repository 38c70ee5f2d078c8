// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application configuration loaded from environment variables.
//!
//! A `.env` file in the working directory is honored for local runs.

use crate::models::PlaylistTarget;
use crate::services::scheduler::WeeklySchedule;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Name used for the target playlist when no fixed ID is configured.
pub const DEFAULT_PLAYLIST_NAME: &str = "Liked Songs Weekly Update";

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Spotify OAuth client ID
    pub spotify_client_id: String,
    /// Spotify OAuth client secret
    pub spotify_client_secret: String,
    /// Redirect URI registered with Spotify (points at `/callback`)
    pub redirect_uri: String,
    /// Server port
    pub port: u16,
    /// Where the credential record is persisted
    pub token_path: PathBuf,
    /// Playlist that receives the liked songs
    pub playlist_target: PlaylistTarget,
    /// Optional cap on liked tracks fetched per sync (None = all)
    pub liked_tracks_limit: Option<usize>,
    /// When the weekly sync fires (local time)
    pub sync_schedule: WeeklySchedule,
    /// Run one sync right after startup
    pub sync_on_startup: bool,
    /// Per-request timeout for Spotify calls
    pub http_timeout: Duration,
    /// HMAC key for the OAuth state parameter
    pub oauth_state_key: Vec<u8>,
}

impl Config {
    /// Default config for testing only.
    pub fn test_default() -> Self {
        Self {
            spotify_client_id: "test_client_id".to_string(),
            spotify_client_secret: "test_secret".to_string(),
            redirect_uri: "http://localhost:3000/callback".to_string(),
            port: 3000,
            token_path: PathBuf::from("data/test_credentials.json"),
            playlist_target: PlaylistTarget::ByName(DEFAULT_PLAYLIST_NAME.to_string()),
            liked_tracks_limit: None,
            sync_schedule: WeeklySchedule::default(),
            sync_on_startup: false,
            http_timeout: Duration::from_secs(30),
            oauth_state_key: b"test_oauth_state_key".to_vec(),
        }
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let spotify_client_secret = env::var("SPOTIFY_CLIENT_SECRET")
            .map(|v| v.trim().to_string())
            .map_err(|_| ConfigError::Missing("SPOTIFY_CLIENT_SECRET"))?;

        let playlist_target = match non_empty_var("TARGET_PLAYLIST_ID") {
            Some(id) => PlaylistTarget::Fixed(id),
            None => PlaylistTarget::ByName(
                non_empty_var("TARGET_PLAYLIST_NAME")
                    .unwrap_or_else(|| DEFAULT_PLAYLIST_NAME.to_string()),
            ),
        };

        let liked_tracks_limit = match non_empty_var("LIKED_TRACKS_LIMIT") {
            Some(v) => Some(
                v.parse::<usize>()
                    .map_err(|_| ConfigError::Invalid("LIKED_TRACKS_LIMIT", v))?,
            ),
            None => None,
        };

        let sync_schedule = match non_empty_var("SYNC_SCHEDULE") {
            Some(v) => v
                .parse::<WeeklySchedule>()
                .map_err(|_| ConfigError::Invalid("SYNC_SCHEDULE", v))?,
            None => WeeklySchedule::default(),
        };

        let sync_on_startup = match non_empty_var("SYNC_ON_STARTUP") {
            Some(v) => parse_bool(&v).ok_or_else(|| ConfigError::Invalid("SYNC_ON_STARTUP", v))?,
            None => false,
        };

        let http_timeout_secs: u64 = match non_empty_var("HTTP_TIMEOUT_SECS") {
            Some(v) => v
                .parse::<u64>()
                .map_err(|_| ConfigError::Invalid("HTTP_TIMEOUT_SECS", v))?,
            None => 30,
        };

        let port: u16 = match non_empty_var("PORT") {
            Some(v) => v
                .parse::<u16>()
                .map_err(|_| ConfigError::Invalid("PORT", v))?,
            None => 3000,
        };

        // Falls back to the client secret, which is already private to this process.
        let oauth_state_key = non_empty_var("OAUTH_STATE_KEY")
            .unwrap_or_else(|| spotify_client_secret.clone())
            .into_bytes();

        Ok(Self {
            spotify_client_id: env::var("SPOTIFY_CLIENT_ID")
                .map(|v| v.trim().to_string())
                .map_err(|_| ConfigError::Missing("SPOTIFY_CLIENT_ID"))?,
            spotify_client_secret,
            redirect_uri: env::var("SPOTIFY_REDIRECT_URI")
                .unwrap_or_else(|_| "http://localhost:3000/callback".to_string()),
            port,
            token_path: env::var("TOKEN_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("data/credentials.json")),
            playlist_target,
            liked_tracks_limit,
            sync_schedule,
            sync_on_startup,
            http_timeout: Duration::from_secs(http_timeout_secs),
            oauth_state_key,
        })
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {0}: {1:?}")]
    Invalid(&'static str, String),
}
