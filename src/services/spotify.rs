// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Spotify Web API client.
//!
//! Handles:
//! - Authorization-code and refresh-token grants
//! - Paged reads of saved tracks and the user's playlists
//! - Playlist creation and track replacement
//! - Rate limit detection (429)

use crate::error::{AppError, Result};
use crate::models::TrackUri;
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const AUTHORIZE_URL: &str = "https://accounts.spotify.com/authorize";
pub const TOKEN_URL: &str = "https://accounts.spotify.com/api/token";
pub const API_BASE_URL: &str = "https://api.spotify.com/v1";

/// Scopes requested at login: read the library, write private playlists.
pub const SCOPES: [&str; 2] = ["user-library-read", "playlist-modify-private"];

/// Build the Spotify authorization URL the user is redirected to.
pub fn authorize_url(client_id: &str, redirect_uri: &str, state: &str) -> String {
    format!(
        "{}?client_id={}&response_type=code&redirect_uri={}&scope={}&state={}",
        AUTHORIZE_URL,
        urlencoding::encode(client_id),
        urlencoding::encode(redirect_uri),
        urlencoding::encode(&SCOPES.join(" ")),
        urlencoding::encode(state),
    )
}

/// Remote operations the sync needs. `SpotifyClient` talks to the real
/// service; tests plug in an in-memory implementation.
#[async_trait]
pub trait SpotifyApi: Send + Sync {
    /// Exchange an authorization code for tokens.
    async fn exchange_code(&self, code: &str) -> Result<TokenResponse>;

    /// Mint a new access token from a refresh token.
    async fn refresh_token(&self, refresh_token: &str) -> Result<TokenResponse>;

    /// One page of the user's saved ("liked") tracks.
    async fn saved_tracks(
        &self,
        access_token: &str,
        limit: u32,
        offset: u32,
    ) -> Result<Page<SavedTrack>>;

    async fn current_user(&self, access_token: &str) -> Result<SpotifyUser>;

    /// One page of playlists owned or followed by the current user.
    async fn current_user_playlists(
        &self,
        access_token: &str,
        limit: u32,
        offset: u32,
    ) -> Result<Page<SimplifiedPlaylist>>;

    async fn create_playlist(
        &self,
        access_token: &str,
        user_id: &str,
        request: &CreatePlaylistRequest,
    ) -> Result<SimplifiedPlaylist>;

    /// Overwrite the playlist with `uris` (at most 100).
    async fn replace_playlist_tracks(
        &self,
        access_token: &str,
        playlist_id: &str,
        uris: &[TrackUri],
    ) -> Result<()>;

    /// Append `uris` (at most 100) to the end of the playlist.
    async fn add_playlist_tracks(
        &self,
        access_token: &str,
        playlist_id: &str,
        uris: &[TrackUri],
    ) -> Result<()>;
}

/// Spotify API client.
#[derive(Clone)]
pub struct SpotifyClient {
    http: reqwest::Client,
    base_url: String,
    token_url: String,
    client_id: String,
    client_secret: String,
    redirect_uri: String,
}

impl SpotifyClient {
    /// Create a new Spotify client with OAuth credentials and a per-request timeout.
    pub fn new(
        client_id: String,
        client_secret: String,
        redirect_uri: String,
        timeout: Duration,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Internal(anyhow::anyhow!("HTTP client init failed: {}", e)))?;

        Ok(Self {
            http,
            base_url: API_BASE_URL.to_string(),
            token_url: TOKEN_URL.to_string(),
            client_id,
            client_secret,
            redirect_uri,
        })
    }

    /// `Authorization: Basic base64(client_id:client_secret)`
    fn basic_auth_header(&self) -> String {
        let raw = format!("{}:{}", self.client_id, self.client_secret);
        format!("Basic {}", BASE64.encode(raw))
    }

    /// POST to the token endpoint with the given grant parameters.
    async fn token_request(&self, form: &[(&str, &str)]) -> Result<TokenResponse> {
        let response = self
            .http
            .post(&self.token_url)
            .header(reqwest::header::AUTHORIZATION, self.basic_auth_header())
            .form(form)
            .send()
            .await
            .map_err(|e| AppError::RemoteApi(format!("Token request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();

            // The accounts service answers with {"error", "error_description"}.
            let message = serde_json::from_str::<TokenErrorBody>(&body)
                .map(|e| match e.error_description {
                    Some(desc) => format!("{}: {}", e.error, desc),
                    None => e.error,
                })
                .unwrap_or(body);

            tracing::warn!(status = %status, error = %message, "Spotify token request rejected");
            return Err(AppError::RemoteApi(message));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::RemoteApi(format!("Failed to parse token response: {}", e)))
    }

    async fn get_json<T: for<'de> Deserialize<'de>>(
        &self,
        url: &str,
        access_token: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        let response = self
            .http
            .get(url)
            .bearer_auth(access_token)
            .query(query)
            .send()
            .await
            .map_err(|e| AppError::RemoteApi(e.to_string()))?;

        check_response_json(response).await
    }

    async fn send_uris(
        &self,
        method: reqwest::Method,
        access_token: &str,
        playlist_id: &str,
        uris: &[TrackUri],
    ) -> Result<()> {
        let url = format!(
            "{}/playlists/{}/tracks",
            self.base_url,
            urlencoding::encode(playlist_id)
        );

        let response = self
            .http
            .request(method, &url)
            .bearer_auth(access_token)
            .json(&serde_json::json!({ "uris": uris }))
            .send()
            .await
            .map_err(|e| AppError::RemoteApi(e.to_string()))?;

        check_response(response).await
    }
}

#[async_trait]
impl SpotifyApi for SpotifyClient {
    async fn exchange_code(&self, code: &str) -> Result<TokenResponse> {
        self.token_request(&[
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", self.redirect_uri.as_str()),
        ])
        .await
    }

    async fn refresh_token(&self, refresh_token: &str) -> Result<TokenResponse> {
        self.token_request(&[
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
        ])
        .await
    }

    async fn saved_tracks(
        &self,
        access_token: &str,
        limit: u32,
        offset: u32,
    ) -> Result<Page<SavedTrack>> {
        let url = format!("{}/me/tracks", self.base_url);
        self.get_json(
            &url,
            access_token,
            &[("limit", limit.to_string()), ("offset", offset.to_string())],
        )
        .await
    }

    async fn current_user(&self, access_token: &str) -> Result<SpotifyUser> {
        let url = format!("{}/me", self.base_url);
        self.get_json(&url, access_token, &[]).await
    }

    async fn current_user_playlists(
        &self,
        access_token: &str,
        limit: u32,
        offset: u32,
    ) -> Result<Page<SimplifiedPlaylist>> {
        let url = format!("{}/me/playlists", self.base_url);
        self.get_json(
            &url,
            access_token,
            &[("limit", limit.to_string()), ("offset", offset.to_string())],
        )
        .await
    }

    async fn create_playlist(
        &self,
        access_token: &str,
        user_id: &str,
        request: &CreatePlaylistRequest,
    ) -> Result<SimplifiedPlaylist> {
        let url = format!(
            "{}/users/{}/playlists",
            self.base_url,
            urlencoding::encode(user_id)
        );

        let response = self
            .http
            .post(&url)
            .bearer_auth(access_token)
            .json(request)
            .send()
            .await
            .map_err(|e| AppError::RemoteApi(e.to_string()))?;

        check_response_json(response).await
    }

    async fn replace_playlist_tracks(
        &self,
        access_token: &str,
        playlist_id: &str,
        uris: &[TrackUri],
    ) -> Result<()> {
        self.send_uris(reqwest::Method::PUT, access_token, playlist_id, uris)
            .await
    }

    async fn add_playlist_tracks(
        &self,
        access_token: &str,
        playlist_id: &str,
        uris: &[TrackUri],
    ) -> Result<()> {
        self.send_uris(reqwest::Method::POST, access_token, playlist_id, uris)
            .await
    }
}

/// Map a non-2xx response to `AppError::RemoteApi`.
async fn error_from_response(response: reqwest::Response) -> AppError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();

    if status.as_u16() == 429 {
        tracing::warn!("Spotify rate limit hit (429)");
        return AppError::RemoteApi(AppError::RATE_LIMITED.to_string());
    }

    AppError::RemoteApi(format!("HTTP {}: {}", status, body))
}

/// Check response status and return error if not successful.
async fn check_response(response: reqwest::Response) -> Result<()> {
    if response.status().is_success() {
        return Ok(());
    }
    Err(error_from_response(response).await)
}

/// Check response and parse JSON body.
async fn check_response_json<T: for<'de> Deserialize<'de>>(
    response: reqwest::Response,
) -> Result<T> {
    if !response.status().is_success() {
        return Err(error_from_response(response).await);
    }

    response
        .json()
        .await
        .map_err(|e| AppError::RemoteApi(format!("JSON parse error: {}", e)))
}

#[derive(Debug, Deserialize)]
struct TokenErrorBody {
    error: String,
    error_description: Option<String>,
}

/// Token endpoint response (both grants).
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    /// Absent on most refresh responses.
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Lifetime in seconds.
    pub expires_in: i64,
}

/// Offset-based paging wrapper.
#[derive(Debug, Clone, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// URL of the next page, `None` on the last page.
    #[serde(default)]
    pub next: Option<String>,
}

/// Entry of `/me/tracks`.
#[derive(Debug, Clone, Deserialize)]
pub struct SavedTrack {
    /// `null` for tracks no longer available in the catalog.
    pub track: Option<Track>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Track {
    pub uri: TrackUri,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SpotifyUser {
    pub id: String,
    #[serde(default)]
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlaylistOwner {
    pub id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SimplifiedPlaylist {
    pub id: String,
    pub name: String,
    pub owner: PlaylistOwner,
}

/// Body of `POST /users/{user_id}/playlists`.
#[derive(Debug, Clone, Serialize)]
pub struct CreatePlaylistRequest {
    pub name: String,
    pub public: bool,
    pub description: String,
}
