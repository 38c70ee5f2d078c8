// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-memory Spotify fake shared by the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use liked_sync::config::Config;
use liked_sync::error::{AppError, Result};
use liked_sync::models::{PlaylistTarget, TrackUri};
use liked_sync::routes::create_router;
use liked_sync::services::spotify::{
    CreatePlaylistRequest, Page, PlaylistOwner, SavedTrack, SimplifiedPlaylist, SpotifyApi,
    SpotifyUser, TokenResponse, Track,
};
use liked_sync::services::{AuthSession, FileTokenStore, PlaylistSyncer, TokenStore};
use liked_sync::AppState;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

pub const USER_ID: &str = "user-1";
pub const VALID_CODE: &str = "good-code";

#[derive(Debug, Clone)]
pub struct FakePlaylist {
    pub id: String,
    pub name: String,
    pub owner: String,
    pub public: bool,
    pub tracks: Vec<TrackUri>,
}

#[derive(Default)]
struct FakeState {
    liked: Vec<TrackUri>,
    playlists: Vec<FakePlaylist>,
    /// Lifetime handed out by the code exchange.
    exchange_expires_in: i64,
    refresh_expires_in: i64,
    refresh_fails: bool,
    /// Method name whose next call fails with `RemoteApi`.
    fail_method: Option<&'static str>,
    /// When set, `saved_tracks` parks until notified.
    saved_tracks_gate: Option<Arc<Notify>>,
}

/// In-memory stand-in for the Spotify Web API.
#[derive(Default)]
pub struct FakeSpotify {
    state: Mutex<FakeState>,
    pub exchange_calls: AtomicUsize,
    pub refresh_calls: AtomicUsize,
    pub saved_tracks_calls: AtomicUsize,
    pub create_calls: AtomicUsize,
    pub write_calls: AtomicUsize,
    /// Notified whenever `saved_tracks` is entered.
    pub saved_tracks_entered: Notify,
}

impl FakeSpotify {
    pub fn new() -> Arc<Self> {
        let fake = Self::default();
        {
            let mut state = fake.state.lock().unwrap();
            state.exchange_expires_in = 3600;
            state.refresh_expires_in = 3600;
        }
        Arc::new(fake)
    }

    pub fn set_liked(&self, count: usize) {
        self.state.lock().unwrap().liked = (0..count)
            .map(|i| format!("spotify:track:{:04}", i))
            .collect();
    }

    pub fn liked(&self) -> Vec<TrackUri> {
        self.state.lock().unwrap().liked.clone()
    }

    pub fn set_exchange_expires_in(&self, secs: i64) {
        self.state.lock().unwrap().exchange_expires_in = secs;
    }

    pub fn set_refresh_expires_in(&self, secs: i64) {
        self.state.lock().unwrap().refresh_expires_in = secs;
    }

    pub fn set_refresh_fails(&self, fails: bool) {
        self.state.lock().unwrap().refresh_fails = fails;
    }

    pub fn fail_next(&self, method: &'static str) {
        self.state.lock().unwrap().fail_method = Some(method);
    }

    pub fn gate_saved_tracks(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.state.lock().unwrap().saved_tracks_gate = Some(gate.clone());
        gate
    }

    pub fn add_playlist(&self, id: &str, name: &str, owner: &str, tracks: Vec<TrackUri>) {
        self.state.lock().unwrap().playlists.push(FakePlaylist {
            id: id.to_string(),
            name: name.to_string(),
            owner: owner.to_string(),
            public: true,
            tracks,
        });
    }

    pub fn playlists(&self) -> Vec<FakePlaylist> {
        self.state.lock().unwrap().playlists.clone()
    }

    pub fn playlist(&self, id: &str) -> Option<FakePlaylist> {
        self.playlists().into_iter().find(|p| p.id == id)
    }

    pub fn count(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }

    fn check_failure(&self, method: &'static str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if state.fail_method == Some(method) {
            state.fail_method = None;
            return Err(AppError::RemoteApi(format!("HTTP 500: {} failed", method)));
        }
        Ok(())
    }
}

#[async_trait]
impl SpotifyApi for FakeSpotify {
    async fn exchange_code(&self, code: &str) -> Result<TokenResponse> {
        let n = self.exchange_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if code != VALID_CODE {
            return Err(AppError::RemoteApi(
                "invalid_grant: Invalid authorization code".to_string(),
            ));
        }
        Ok(TokenResponse {
            access_token: format!("access-{}", n),
            refresh_token: Some(format!("refresh-{}", n)),
            expires_in: self.state.lock().unwrap().exchange_expires_in,
        })
    }

    async fn refresh_token(&self, refresh_token: &str) -> Result<TokenResponse> {
        let n = self.refresh_calls.fetch_add(1, Ordering::SeqCst) + 1;
        let (fails, expires_in) = {
            let state = self.state.lock().unwrap();
            (state.refresh_fails, state.refresh_expires_in)
        };
        if fails {
            return Err(AppError::RemoteApi(
                "invalid_grant: Refresh token revoked".to_string(),
            ));
        }
        Ok(TokenResponse {
            access_token: format!("refreshed-{}-from-{}", n, refresh_token),
            refresh_token: None,
            expires_in,
        })
    }

    async fn saved_tracks(
        &self,
        _access_token: &str,
        limit: u32,
        offset: u32,
    ) -> Result<Page<SavedTrack>> {
        self.saved_tracks_calls.fetch_add(1, Ordering::SeqCst);
        self.saved_tracks_entered.notify_one();

        let gate = self.state.lock().unwrap().saved_tracks_gate.take();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        self.check_failure("saved_tracks")?;

        assert!(limit <= 50, "Spotify rejects limit > 50");
        let liked = self.liked();
        let start = (offset as usize).min(liked.len());
        let end = (start + limit as usize).min(liked.len());

        let items = liked[start..end]
            .iter()
            .map(|uri| SavedTrack {
                track: Some(Track { uri: uri.clone() }),
            })
            .collect();

        Ok(Page {
            items,
            next: (end < liked.len()).then(|| format!("next?offset={}", end)),
        })
    }

    async fn current_user(&self, _access_token: &str) -> Result<SpotifyUser> {
        self.check_failure("current_user")?;
        Ok(SpotifyUser {
            id: USER_ID.to_string(),
            display_name: Some("Test User".to_string()),
        })
    }

    async fn current_user_playlists(
        &self,
        _access_token: &str,
        limit: u32,
        offset: u32,
    ) -> Result<Page<SimplifiedPlaylist>> {
        self.check_failure("current_user_playlists")?;

        let playlists = self.playlists();
        let start = (offset as usize).min(playlists.len());
        let end = (start + limit as usize).min(playlists.len());

        Ok(Page {
            items: playlists[start..end]
                .iter()
                .map(|p| SimplifiedPlaylist {
                    id: p.id.clone(),
                    name: p.name.clone(),
                    owner: PlaylistOwner {
                        id: p.owner.clone(),
                    },
                })
                .collect(),
            next: (end < playlists.len()).then(|| format!("next?offset={}", end)),
        })
    }

    async fn create_playlist(
        &self,
        _access_token: &str,
        user_id: &str,
        request: &CreatePlaylistRequest,
    ) -> Result<SimplifiedPlaylist> {
        self.check_failure("create_playlist")?;
        let n = self.create_calls.fetch_add(1, Ordering::SeqCst) + 1;

        let playlist = FakePlaylist {
            id: format!("created-{}", n),
            name: request.name.clone(),
            owner: user_id.to_string(),
            public: request.public,
            tracks: Vec::new(),
        };
        self.state.lock().unwrap().playlists.push(playlist.clone());

        Ok(SimplifiedPlaylist {
            id: playlist.id,
            name: playlist.name,
            owner: PlaylistOwner { id: playlist.owner },
        })
    }

    async fn replace_playlist_tracks(
        &self,
        _access_token: &str,
        playlist_id: &str,
        uris: &[TrackUri],
    ) -> Result<()> {
        self.check_failure("replace_playlist_tracks")?;
        self.write_calls.fetch_add(1, Ordering::SeqCst);
        assert!(uris.len() <= 100, "Spotify rejects more than 100 URIs");

        let mut state = self.state.lock().unwrap();
        let playlist = state
            .playlists
            .iter_mut()
            .find(|p| p.id == playlist_id)
            .ok_or_else(|| AppError::RemoteApi("HTTP 404: playlist not found".to_string()))?;
        playlist.tracks = uris.to_vec();
        Ok(())
    }

    async fn add_playlist_tracks(
        &self,
        _access_token: &str,
        playlist_id: &str,
        uris: &[TrackUri],
    ) -> Result<()> {
        self.check_failure("add_playlist_tracks")?;
        self.write_calls.fetch_add(1, Ordering::SeqCst);
        assert!(uris.len() <= 100, "Spotify rejects more than 100 URIs");

        let mut state = self.state.lock().unwrap();
        let playlist = state
            .playlists
            .iter_mut()
            .find(|p| p.id == playlist_id)
            .ok_or_else(|| AppError::RemoteApi("HTTP 404: playlist not found".to_string()))?;
        playlist.tracks.extend_from_slice(uris);
        Ok(())
    }
}

/// Token store backed by a file inside `dir`.
pub fn file_store(dir: &Path) -> Arc<FileTokenStore> {
    Arc::new(FileTokenStore::new(dir.join("credentials.json")))
}

/// Fresh session over `fake` and `store`.
pub async fn session(fake: &Arc<FakeSpotify>, store: Arc<dyn TokenStore>) -> Arc<AuthSession> {
    let api: Arc<dyn SpotifyApi> = fake.clone();
    Arc::new(AuthSession::load(api, store).await)
}

/// Session that has already completed the code exchange.
pub async fn logged_in_session(fake: &Arc<FakeSpotify>, dir: &Path) -> Arc<AuthSession> {
    let session = session(fake, file_store(dir)).await;
    session
        .exchange_code(VALID_CODE)
        .await
        .expect("code exchange should succeed");
    session
}

pub fn syncer(
    fake: &Arc<FakeSpotify>,
    session: Arc<AuthSession>,
    target: PlaylistTarget,
    limit: Option<usize>,
) -> Arc<PlaylistSyncer> {
    let api: Arc<dyn SpotifyApi> = fake.clone();
    Arc::new(PlaylistSyncer::new(api, session, target, limit))
}

/// Router over the fake with the test config.
pub async fn create_test_app(
    fake: &Arc<FakeSpotify>,
    dir: &Path,
) -> (axum::Router, Arc<AppState>) {
    let config = Config::test_default();
    let session = session(fake, file_store(dir)).await;
    let syncer = syncer(fake, session.clone(), config.playlist_target.clone(), None);

    let state = Arc::new(AppState {
        config,
        session,
        syncer,
    });

    (create_router(state.clone()), state)
}
