// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Copies the user's liked songs into the target playlist.
//!
//! A sync is one sequential chain: token → liked tracks → playlist →
//! replace. The first failure aborts the run; the next scheduled run is
//! the retry. Only one run is in flight at a time.

use crate::error::Result;
use crate::models::{PlaylistTarget, TrackUri};
use crate::services::auth_session::AuthSession;
use crate::services::spotify::{CreatePlaylistRequest, SpotifyApi};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Largest page Spotify serves for `/me/tracks` and `/me/playlists`.
pub const PAGE_SIZE: u32 = 50;

/// Largest number of URIs accepted by one playlist write.
pub const MAX_URIS_PER_REQUEST: usize = 100;

const PLAYLIST_DESCRIPTION: &str = "Liked songs, refreshed automatically.";

/// Result of a `sync()` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// The playlist now holds exactly the liked tracks.
    Completed { playlist_id: String, tracks: usize },
    /// Another sync was already running; nothing was done.
    Skipped,
}

/// State that lives for the process and is only touched by the running sync.
#[derive(Debug, Default)]
struct SyncState {
    /// Playlist ID resolved by name on an earlier run.
    resolved_playlist_id: Option<String>,
}

/// Replaces the target playlist's contents with the liked tracks.
pub struct PlaylistSyncer {
    api: Arc<dyn SpotifyApi>,
    session: Arc<AuthSession>,
    target: PlaylistTarget,
    liked_tracks_limit: Option<usize>,
    /// In-flight guard; held for the whole run.
    in_flight: Mutex<SyncState>,
}

impl PlaylistSyncer {
    pub fn new(
        api: Arc<dyn SpotifyApi>,
        session: Arc<AuthSession>,
        target: PlaylistTarget,
        liked_tracks_limit: Option<usize>,
    ) -> Self {
        Self {
            api,
            session,
            target,
            liked_tracks_limit,
            in_flight: Mutex::new(SyncState::default()),
        }
    }

    /// Run one sync pass, or return `Skipped` if one is already running.
    pub async fn sync(&self) -> Result<SyncOutcome> {
        let Ok(mut sync_state) = self.in_flight.try_lock() else {
            tracing::warn!("Sync already in progress, skipping this trigger");
            return Ok(SyncOutcome::Skipped);
        };

        tracing::info!(playlist = %self.target, "Starting playlist sync");

        let result = self.run(&mut sync_state).await;
        match &result {
            Ok(SyncOutcome::Completed {
                playlist_id,
                tracks,
            }) => {
                tracing::info!(playlist_id = %playlist_id, tracks, "Playlist updated successfully");
            }
            Ok(SyncOutcome::Skipped) => {}
            Err(e) => tracing::error!(error = %e, "Playlist sync failed"),
        }
        result
    }

    async fn run(&self, sync_state: &mut SyncState) -> Result<SyncOutcome> {
        let access_token = self.session.get_valid_access_token().await?;

        let uris = self.liked_track_uris(&access_token).await?;
        tracing::debug!(count = uris.len(), "Fetched liked tracks");

        let playlist_id = self.resolve_playlist(&access_token, sync_state).await?;

        self.replace_tracks(&access_token, &playlist_id, &uris).await?;

        Ok(SyncOutcome::Completed {
            playlist_id,
            tracks: uris.len(),
        })
    }

    /// Page through `/me/tracks` until exhausted or the configured cap is hit.
    async fn liked_track_uris(&self, access_token: &str) -> Result<Vec<TrackUri>> {
        let mut uris = Vec::new();
        let mut offset = 0u32;

        loop {
            let limit = match self.liked_tracks_limit {
                Some(cap) if uris.len() >= cap => break,
                Some(cap) => PAGE_SIZE.min((cap - uris.len()) as u32),
                None => PAGE_SIZE,
            };

            let page = self.api.saved_tracks(access_token, limit, offset).await?;
            let fetched = page.items.len() as u32;

            uris.extend(
                page.items
                    .into_iter()
                    .filter_map(|item| item.track)
                    .map(|track| track.uri),
            );

            if page.next.is_none() || fetched == 0 {
                break;
            }
            offset += fetched;
        }

        if let Some(cap) = self.liked_tracks_limit {
            uris.truncate(cap);
        }
        Ok(uris)
    }

    /// Fixed ID as configured, or find-or-create by name (cached once found).
    async fn resolve_playlist(
        &self,
        access_token: &str,
        sync_state: &mut SyncState,
    ) -> Result<String> {
        let name = match &self.target {
            PlaylistTarget::Fixed(id) => return Ok(id.clone()),
            PlaylistTarget::ByName(name) => name,
        };

        if let Some(id) = &sync_state.resolved_playlist_id {
            return Ok(id.clone());
        }

        let user = self.api.current_user(access_token).await?;

        let id = match self.find_playlist(access_token, &user.id, name).await? {
            Some(id) => {
                tracing::info!(playlist_id = %id, name = %name, "Found existing playlist");
                id
            }
            None => {
                let request = CreatePlaylistRequest {
                    name: name.clone(),
                    public: false,
                    description: PLAYLIST_DESCRIPTION.to_string(),
                };
                let created = self
                    .api
                    .create_playlist(access_token, &user.id, &request)
                    .await?;
                tracing::info!(
                    playlist_id = %created.id,
                    name = %name,
                    owner = user.display_name.as_deref().unwrap_or(&user.id),
                    "Created private playlist"
                );
                created.id
            }
        };

        sync_state.resolved_playlist_id = Some(id.clone());
        Ok(id)
    }

    /// Exact-name match among playlists owned by `user_id`.
    async fn find_playlist(
        &self,
        access_token: &str,
        user_id: &str,
        name: &str,
    ) -> Result<Option<String>> {
        let mut offset = 0u32;

        loop {
            let page = self
                .api
                .current_user_playlists(access_token, PAGE_SIZE, offset)
                .await?;
            let fetched = page.items.len() as u32;

            // Followed playlists show up here too; only our own are writable.
            if let Some(found) = page
                .items
                .into_iter()
                .find(|p| p.name == name && p.owner.id == user_id)
            {
                return Ok(Some(found.id));
            }

            if page.next.is_none() || fetched == 0 {
                return Ok(None);
            }
            offset += fetched;
        }
    }

    /// Full replace. Spotify caps writes at 100 URIs, so the first chunk
    /// replaces and the rest are appended in order. A failure after the first
    /// chunk leaves a prefix of the liked list in the playlist.
    async fn replace_tracks(
        &self,
        access_token: &str,
        playlist_id: &str,
        uris: &[TrackUri],
    ) -> Result<()> {
        let mut chunks = uris.chunks(MAX_URIS_PER_REQUEST);

        let first = chunks.next().unwrap_or(&[]);
        self.api
            .replace_playlist_tracks(access_token, playlist_id, first)
            .await?;

        for chunk in chunks {
            self.api
                .add_playlist_tracks(access_token, playlist_id, chunk)
                .await?;
        }
        Ok(())
    }
}
