// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Playlist and track identifiers.

/// Spotify track URI (`spotify:track:<id>`). Never stored locally.
pub type TrackUri = String;

/// Which playlist receives the liked songs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaylistTarget {
    /// A known playlist ID, used as-is.
    Fixed(String),
    /// Looked up by exact name among the current user's playlists,
    /// created (private) if missing.
    ByName(String),
}

impl std::fmt::Display for PlaylistTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlaylistTarget::Fixed(id) => write!(f, "playlist {}", id),
            PlaylistTarget::ByName(name) => write!(f, "playlist named {:?}", name),
        }
    }
}
