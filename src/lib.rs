// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Liked-Sync: keep a Spotify playlist in step with your liked songs
//!
//! This crate provides the OAuth session, credential persistence and the
//! weekly playlist sync, plus the small HTTP surface used to log in.

pub mod config;
pub mod error;
pub mod models;
pub mod routes;
pub mod services;

use config::Config;
use services::{AuthSession, PlaylistSyncer};
use std::sync::Arc;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub session: Arc<AuthSession>,
    pub syncer: Arc<PlaylistSyncer>,
}
