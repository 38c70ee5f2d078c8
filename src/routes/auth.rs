// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Spotify OAuth authentication routes.
//!
//! `/login` binds the flow to the browser: a random nonce goes into an
//! HttpOnly cookie and into the signed `state`. `/callback` accepts only a
//! `state` whose nonce matches the cookie.

use axum::{
    extract::{Query, State},
    response::{Html, Redirect},
    routing::get,
    Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::Utc;
use hmac::{Hmac, Mac};
use rand::{distr::Alphanumeric, Rng};
use serde::Deserialize;
use sha2::Sha256;
use std::sync::Arc;
use subtle::ConstantTimeEq;

use crate::error::{AppError, Result};
use crate::services::run_logged_sync;
use crate::services::spotify::authorize_url;
use crate::AppState;

// Type alias for HMAC-SHA256
type HmacSha256 = Hmac<Sha256>;

/// How long a `state` issued by `/login` stays acceptable (10 minutes).
pub const STATE_MAX_AGE_MS: i64 = 10 * 60 * 1000;

/// Cookie carrying the per-login nonce.
pub const NONCE_COOKIE: &str = "liked_sync_oauth_nonce";

const NONCE_LEN: usize = 32;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/login", get(login))
        .route("/callback", get(callback))
}

/// Start OAuth flow - redirect to Spotify authorization.
async fn login(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
) -> Result<(CookieJar, Redirect)> {
    let nonce = generate_nonce();
    let oauth_state = sign_state(
        &state.config.oauth_state_key,
        Utc::now().timestamp_millis(),
        &nonce,
    )?;

    let auth_url = authorize_url(
        &state.config.spotify_client_id,
        &state.config.redirect_uri,
        &oauth_state,
    );

    let cookie = Cookie::build((NONCE_COOKIE, nonce))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(state.config.redirect_uri.starts_with("https://"));

    tracing::info!(
        client_id = %state.config.spotify_client_id,
        "Starting OAuth flow, redirecting to Spotify"
    );

    Ok((jar.add(cookie), Redirect::temporary(&auth_url)))
}

#[derive(Deserialize)]
pub struct CallbackParams {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    state: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// OAuth callback - exchange code for tokens, then kick off one sync.
async fn callback(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Query(params): Query<CallbackParams>,
) -> Result<(CookieJar, Html<&'static str>)> {
    let nonce = jar.get(NONCE_COOKIE).map(|c| c.value().to_string());

    let state_ok = match (params.state.as_deref(), nonce.as_deref()) {
        (Some(s), Some(nonce)) => verify_state(
            s,
            &state.config.oauth_state_key,
            nonce,
            Utc::now().timestamp_millis(),
        ),
        _ => false,
    };
    if !state_ok {
        tracing::warn!(
            has_cookie = nonce.is_some(),
            "Invalid, expired or missing OAuth state parameter"
        );
        return Err(AppError::BadRequest(
            "invalid or expired OAuth state".to_string(),
        ));
    }

    // The nonce is single-use.
    let jar = jar.remove(Cookie::build(NONCE_COOKIE).path("/"));

    // Check for OAuth errors (e.g. user pressed "Cancel")
    if let Some(error) = params.error {
        tracing::warn!(error = %error, "OAuth error from Spotify");
        return Err(AppError::AuthExchangeFailed(error));
    }

    let code = params
        .code
        .filter(|c| !c.is_empty())
        .ok_or_else(|| AppError::BadRequest("missing authorization code".to_string()))?;

    tracing::info!("Exchanging authorization code for tokens");
    state.session.exchange_code(&code).await?;

    let syncer = state.syncer.clone();
    tokio::spawn(async move {
        run_logged_sync(&syncer).await;
    });

    Ok((
        jar,
        Html("Authentication successful! Your playlist is being updated."),
    ))
}

fn generate_nonce() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(NONCE_LEN)
        .map(char::from)
        .collect()
}

/// Build the signed OAuth `state`: base64url("issued_at_hex.nonce|hmac_hex").
pub fn sign_state(secret: &[u8], issued_at_ms: i64, nonce: &str) -> Result<String> {
    let payload = format!("{:x}.{}", issued_at_ms, nonce);

    let mut mac = HmacSha256::new_from_slice(secret)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("HMAC init failed: {}", e)))?;
    mac.update(payload.as_bytes());
    let signature = hex::encode(mac.finalize().into_bytes());

    Ok(URL_SAFE_NO_PAD.encode(format!("{}|{}", payload, signature)))
}

/// Verify signature, nonce and age of a `state` produced by `sign_state`.
pub fn verify_state(state: &str, secret: &[u8], expected_nonce: &str, now_ms: i64) -> bool {
    let Some((payload, signature)) = decode_state(state) else {
        return false;
    };

    let Ok(mut mac) = HmacSha256::new_from_slice(secret) else {
        return false;
    };
    mac.update(payload.as_bytes());
    let expected = hex::encode(mac.finalize().into_bytes());

    if !bool::from(expected.as_bytes().ct_eq(signature.as_bytes())) {
        tracing::error!("OAuth state signature mismatch! Potential tampering.");
        return false;
    }

    let Some((issued_at_hex, nonce)) = payload.split_once('.') else {
        return false;
    };
    if !bool::from(nonce.as_bytes().ct_eq(expected_nonce.as_bytes())) {
        tracing::warn!("OAuth state nonce does not match the browser cookie");
        return false;
    }

    let Ok(issued_at) = i64::from_str_radix(issued_at_hex, 16) else {
        return false;
    };
    now_ms
        .checked_sub(issued_at)
        .is_some_and(|age| (0..=STATE_MAX_AGE_MS).contains(&age))
}

/// Split a `state` into its signed payload and hex signature.
fn decode_state(state: &str) -> Option<(String, String)> {
    let bytes = URL_SAFE_NO_PAD.decode(state).ok()?;
    let state_str = String::from_utf8(bytes).ok()?;

    let (payload, signature) = state_str.split_once('|')?;
    Some((payload.to_string(), signature.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &[u8] = b"secret_key";
    const NONCE: &str = "n0nce";
    const ISSUED_AT: i64 = 1_700_000_000_000;

    #[test]
    fn test_verify_state_success() {
        let state = sign_state(SECRET, ISSUED_AT, NONCE).unwrap();
        assert!(verify_state(&state, SECRET, NONCE, ISSUED_AT + 1_000));
    }

    #[test]
    fn test_verify_state_wrong_secret() {
        let state = sign_state(SECRET, ISSUED_AT, NONCE).unwrap();
        assert!(!verify_state(&state, b"wrong_key", NONCE, ISSUED_AT));
    }

    #[test]
    fn test_verify_state_wrong_nonce() {
        let state = sign_state(SECRET, ISSUED_AT, NONCE).unwrap();
        assert!(!verify_state(&state, SECRET, "other", ISSUED_AT));
        assert!(!verify_state(&state, SECRET, "", ISSUED_AT));
    }

    #[test]
    fn test_verify_state_expired() {
        let state = sign_state(SECRET, ISSUED_AT, NONCE).unwrap();
        assert!(!verify_state(&state, SECRET, NONCE, ISSUED_AT + STATE_MAX_AGE_MS + 1));
    }

    #[test]
    fn test_verify_state_from_future() {
        let state = sign_state(SECRET, ISSUED_AT, NONCE).unwrap();
        assert!(!verify_state(&state, SECRET, NONCE, ISSUED_AT - 1));
    }

    #[test]
    fn test_verify_state_tampered_timestamp() {
        let state = sign_state(SECRET, ISSUED_AT, NONCE).unwrap();
        let decoded = String::from_utf8(URL_SAFE_NO_PAD.decode(&state).unwrap()).unwrap();
        let (_, signature) = decoded.split_once('|').unwrap();
        let forged =
            URL_SAFE_NO_PAD.encode(format!("{:x}.{}|{}", ISSUED_AT + 5, NONCE, signature));

        assert!(!verify_state(&forged, SECRET, NONCE, ISSUED_AT + 10));
    }

    #[test]
    fn test_verify_state_malformed() {
        assert!(!verify_state("not-valid-base64!!!", SECRET, NONCE, ISSUED_AT));
        assert!(!verify_state(
            &URL_SAFE_NO_PAD.encode("no-separator"),
            SECRET,
            NONCE,
            ISSUED_AT
        ));
        assert!(!verify_state("", SECRET, NONCE, ISSUED_AT));
    }

    #[test]
    fn test_state_is_url_safe() {
        let state = sign_state(SECRET, ISSUED_AT, &generate_nonce()).unwrap();
        assert!(!state.contains('+'));
        assert!(!state.contains('/'));
        assert!(!state.contains('='));
    }

    #[test]
    fn test_nonces_are_alphanumeric_and_distinct() {
        let a = generate_nonce();
        let b = generate_nonce();
        assert_eq!(a.len(), NONCE_LEN);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(a, b);
    }
}
