// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! OAuth session for the single configured Spotify user.
//!
//! The session owns the in-memory credential and keeps it in step with the
//! `TokenStore`. States:
//!
//! - `Unauthenticated`: no usable credential; only `exchange_code` helps.
//! - `Valid`: access token usable until its expiry.
//! - `Expired`: refresh token held, access token must be refreshed first.
//!   A credential loaded from storage at startup always starts here.

use crate::error::{AppError, Result};
use crate::models::Credential;
use crate::services::spotify::SpotifyApi;
use crate::services::token_store::TokenStore;
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Debug, Clone)]
enum SessionState {
    Unauthenticated,
    Valid(Credential),
    Expired(Credential),
}

/// Externally visible summary of the session state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Unauthenticated,
    Valid,
    Expired,
}

/// Owns the credential lifecycle: code exchange, refresh, persistence.
pub struct AuthSession {
    api: Arc<dyn SpotifyApi>,
    store: Arc<dyn TokenStore>,
    /// Held across the refresh round trip so concurrent callers never
    /// refresh twice.
    state: Mutex<SessionState>,
}

impl AuthSession {
    /// Create a session, picking up any credential left by a previous run.
    pub async fn load(api: Arc<dyn SpotifyApi>, store: Arc<dyn TokenStore>) -> Self {
        let state = match store.load().await {
            Some(credential) => {
                tracing::info!("Loaded persisted credential, refresh forced before first use");
                SessionState::Expired(credential)
            }
            None => {
                tracing::info!("No persisted credential, login required");
                SessionState::Unauthenticated
            }
        };

        Self {
            api,
            store,
            state: Mutex::new(state),
        }
    }

    pub async fn status(&self) -> SessionStatus {
        match &*self.state.lock().await {
            SessionState::Unauthenticated => SessionStatus::Unauthenticated,
            SessionState::Valid(c) if c.is_expired(Utc::now()) => SessionStatus::Expired,
            SessionState::Valid(_) => SessionStatus::Valid,
            SessionState::Expired(_) => SessionStatus::Expired,
        }
    }

    /// Exchange an authorization code for a fresh credential.
    ///
    /// Replaces whatever credential the session held before. On failure the
    /// previous state, including any refresh token, is kept.
    pub async fn exchange_code(&self, code: &str) -> Result<()> {
        let mut state = self.state.lock().await;

        let tokens = match self.api.exchange_code(code).await {
            Ok(t) => t,
            Err(e) => {
                tracing::warn!(error = %e, "Authorization code exchange failed");
                return Err(AppError::AuthExchangeFailed(upstream_message(e)));
            }
        };

        let Some(refresh_token) = tokens.refresh_token else {
            return Err(AppError::AuthExchangeFailed(
                "token response did not include a refresh token".to_string(),
            ));
        };

        let credential =
            Credential::issued(tokens.access_token, refresh_token, tokens.expires_in, Utc::now())
                .ok_or_else(|| invalid_lifetime(tokens.expires_in))?;

        *state = SessionState::Valid(credential.clone());
        // Persistence failure is reported; the in-memory credential stays usable.
        self.store.save(&credential).await?;

        tracing::info!("Authorization code exchanged, credential stored");
        Ok(())
    }

    /// Refresh the access token now.
    ///
    /// Fails with `NotAuthenticated` if there is no refresh token. If Spotify
    /// rejects the refresh, the session drops to `Unauthenticated`.
    pub async fn refresh(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        self.refresh_locked(&mut state).await.map(|_| ())
    }

    /// Return an access token that is not known to be expired, refreshing
    /// first when necessary.
    pub async fn get_valid_access_token(&self) -> Result<String> {
        let mut state = self.state.lock().await;

        if let SessionState::Valid(credential) = &*state {
            if !credential.is_expired(Utc::now()) {
                return Ok(credential.access_token.clone());
            }
        }

        self.refresh_locked(&mut state).await
    }

    async fn refresh_locked(&self, state: &mut SessionState) -> Result<String> {
        let current = match &*state {
            SessionState::Unauthenticated => return Err(AppError::NotAuthenticated),
            SessionState::Valid(c) | SessionState::Expired(c) => c.clone(),
        };

        tracing::info!("Access token expired, refreshing");

        let tokens = match self.api.refresh_token(&current.refresh_token).await {
            Ok(t) => t,
            Err(e) => {
                *state = SessionState::Unauthenticated;
                tracing::error!(error = %e, "Token refresh failed, login required");
                return Err(AppError::RefreshFailed(upstream_message(e)));
            }
        };

        // An unusable lifetime leaves the state untouched.
        let credential = current
            .refreshed(
                tokens.access_token,
                tokens.refresh_token,
                tokens.expires_in,
                Utc::now(),
            )
            .ok_or_else(|| invalid_lifetime(tokens.expires_in))?;

        // Persistence failure is only logged here; the sync continues with the new token.
        *state = SessionState::Valid(credential.clone());
        if let Err(e) = self.store.save(&credential).await {
            tracing::warn!(error = %e, "Refreshed credential could not be persisted");
        }

        tracing::info!(expires_at = %credential.expires_at, "Token refreshed");
        Ok(credential.access_token)
    }
}

/// The upstream message without our own `Spotify API error:` prefix.
fn upstream_message(err: AppError) -> String {
    match err {
        AppError::RemoteApi(msg) => msg,
        other => other.to_string(),
    }
}

fn invalid_lifetime(expires_in: i64) -> AppError {
    tracing::warn!(expires_in, "Token response carried an unusable expires_in");
    AppError::RemoteApi(format!("token lifetime out of range: {}s", expires_in))
}
