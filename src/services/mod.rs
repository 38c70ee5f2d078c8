// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod auth_session;
pub mod playlist_sync;
pub mod scheduler;
pub mod spotify;
pub mod token_store;

pub use auth_session::{AuthSession, SessionStatus};
pub use playlist_sync::{PlaylistSyncer, SyncOutcome};
pub use scheduler::{run_logged_sync, spawn_weekly_sync, WeeklySchedule};
pub use spotify::{SpotifyApi, SpotifyClient};
pub use token_store::{FileTokenStore, TokenStore};
