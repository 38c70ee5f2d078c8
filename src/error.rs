// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application error types with consistent API responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Application error type that converts to HTTP responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Authorization code was rejected (invalid, expired, already used).
    #[error("Authorization code exchange failed: {0}")]
    AuthExchangeFailed(String),

    /// Refresh token was rejected; the user must log in again.
    #[error("Token refresh failed: {0}")]
    RefreshFailed(String),

    #[error("Not authenticated")]
    NotAuthenticated,

    #[error("Spotify API error: {0}")]
    RemoteApi(String),

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Message carried by `RemoteApi` when Spotify answers 429.
    pub const RATE_LIMITED: &'static str = "Rate limit exceeded";

    /// True when the remote API throttled the request.
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, AppError::RemoteApi(msg) if msg == Self::RATE_LIMITED)
    }

    /// True when nothing but a new authorization-code flow can recover.
    pub fn requires_reauth(&self) -> bool {
        matches!(self, AppError::RefreshFailed(_) | AppError::NotAuthenticated)
    }
}

/// JSON error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, details) = match &self {
            AppError::AuthExchangeFailed(msg) => (
                StatusCode::BAD_REQUEST,
                "auth_exchange_failed",
                Some(msg.clone()),
            ),
            AppError::RefreshFailed(msg) => {
                (StatusCode::UNAUTHORIZED, "refresh_failed", Some(msg.clone()))
            }
            AppError::NotAuthenticated => (StatusCode::UNAUTHORIZED, "not_authenticated", None),
            AppError::RemoteApi(msg) => {
                (StatusCode::BAD_GATEWAY, "spotify_error", Some(msg.clone()))
            }
            AppError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, "bad_request", Some(msg.clone()))
            }
            AppError::Persistence(msg) => {
                tracing::error!(error = %msg, "Persistence error");
                (StatusCode::INTERNAL_SERVER_ERROR, "persistence_error", None)
            }
            AppError::Internal(err) => {
                tracing::error!(error = %err, "Internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", None)
            }
        };

        let body = ErrorResponse {
            error: error.to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for handlers and services
pub type Result<T> = std::result::Result<T, AppError>;
