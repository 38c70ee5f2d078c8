// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! OAuth credential persisted between restarts.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Margin before expiry at which an access token is treated as stale (1 minute).
pub const TOKEN_REFRESH_MARGIN_SECS: i64 = 60;

/// Spotify OAuth credential for the single configured user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    pub access_token: String,
    pub refresh_token: String,
    /// Issue time + `expires_in`, serialized as RFC 3339.
    pub expires_at: DateTime<Utc>,
}

impl Credential {
    /// Build a credential from a token response received at `issued_at`.
    ///
    /// Returns `None` when `expires_in_secs` does not fit a timestamp.
    pub fn issued(
        access_token: String,
        refresh_token: String,
        expires_in_secs: i64,
        issued_at: DateTime<Utc>,
    ) -> Option<Self> {
        let expires_at = Duration::try_seconds(expires_in_secs)
            .and_then(|lifetime| issued_at.checked_add_signed(lifetime))?;

        Some(Self {
            access_token,
            refresh_token,
            expires_at,
        })
    }

    /// Whether the access token must be refreshed before use at `now`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now + Duration::seconds(TOKEN_REFRESH_MARGIN_SECS) >= self.expires_at
    }

    /// Apply a refresh result. Spotify may omit the refresh token, in
    /// which case the existing one is kept.
    pub fn refreshed(
        &self,
        access_token: String,
        refresh_token: Option<String>,
        expires_in_secs: i64,
        issued_at: DateTime<Utc>,
    ) -> Option<Self> {
        Self::issued(
            access_token,
            refresh_token.unwrap_or_else(|| self.refresh_token.clone()),
            expires_in_secs,
            issued_at,
        )
    }
}
