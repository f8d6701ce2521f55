//! HTTP client for end-to-end tests
//!
//! This module provides a high-level HTTP client that wraps reqwest
//! and provides methods for all tune endpoints.
//!
//! When API routes or request formats change, update only this file.

use super::constants::*;
use reqwest::{RequestBuilder, Response};
use serde_json::{json, Value};
use std::time::Duration;

/// HTTP test client sending a bearer token with every request
pub struct TestClient {
    /// The underlying reqwest client (public for custom requests in tests)
    pub client: reqwest::Client,
    /// The base URL of the test server
    pub base_url: String,
    token: Option<String>,
}

impl TestClient {
    /// Creates a client that sends no Authorization header
    pub fn anonymous(base_url: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .expect("Failed to build reqwest client");

        Self {
            client,
            base_url,
            token: None,
        }
    }

    /// Creates a client acting with the given catalog access token
    pub fn with_token(base_url: String, token: &str) -> Self {
        Self {
            token: Some(token.to_string()),
            ..Self::anonymous(base_url)
        }
    }

    fn request(&self, method: reqwest::Method, path: &str) -> RequestBuilder {
        let builder = self
            .client
            .request(method, format!("{}{}", self.base_url, path));
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send(builder: RequestBuilder) -> Response {
        builder.send().await.expect("Request failed")
    }

    // ========================================================================
    // Server
    // ========================================================================

    /// GET /
    pub async fn get_home(&self) -> Response {
        Self::send(self.request(reqwest::Method::GET, "/")).await
    }

    // ========================================================================
    // Library
    // ========================================================================

    /// POST /v1/tune/index
    pub async fn index_library(&self) -> Response {
        Self::send(self.request(reqwest::Method::POST, "/v1/tune/index")).await
    }

    /// GET /v1/tune/removed
    pub async fn get_removed_tracks(&self) -> Response {
        Self::send(self.request(reqwest::Method::GET, "/v1/tune/removed")).await
    }

    /// DELETE /v1/tune/track/{id}
    pub async fn remove_track(&self, track_id: &str) -> Response {
        let path = format!("/v1/tune/track/{}", track_id);
        Self::send(self.request(reqwest::Method::DELETE, &path)).await
    }

    /// POST /v1/tune/track/{id}
    pub async fn unremove_track(&self, track_id: &str) -> Response {
        let path = format!("/v1/tune/track/{}", track_id);
        Self::send(self.request(reqwest::Method::POST, &path)).await
    }

    // ========================================================================
    // Playlists
    // ========================================================================

    /// POST /v1/tune/playlist
    pub async fn generate_playlist(&self, mood: f32, date: Option<&str>) -> Response {
        let mut body = json!({ "mood": mood });
        if let Some(date) = date {
            body["date"] = Value::String(date.to_string());
        }
        Self::send(
            self.request(reqwest::Method::POST, "/v1/tune/playlist")
                .json(&body),
        )
        .await
    }

    /// POST /v1/tune/playlist with an arbitrary body
    pub async fn generate_playlist_raw(&self, body: Value) -> Response {
        Self::send(
            self.request(reqwest::Method::POST, "/v1/tune/playlist")
                .json(&body),
        )
        .await
    }

    /// GET /v1/tune/playlists
    pub async fn get_playlists(&self) -> Response {
        Self::send(self.request(reqwest::Method::GET, "/v1/tune/playlists")).await
    }

    /// GET /v1/tune/playlist/{date}
    pub async fn get_playlist(&self, date: &str) -> Response {
        let path = format!("/v1/tune/playlist/{}", date);
        Self::send(self.request(reqwest::Method::GET, &path)).await
    }

    /// POST /v1/tune/playlist/{date}/sync
    pub async fn sync_playlist(&self, date: &str) -> Response {
        let path = format!("/v1/tune/playlist/{}/sync", date);
        Self::send(self.request(reqwest::Method::POST, &path)).await
    }

    /// GET /v1/tune/remote_playlist
    pub async fn get_remote_playlist(&self) -> Response {
        Self::send(self.request(reqwest::Method::GET, "/v1/tune/remote_playlist")).await
    }

    // ========================================================================
    // User Data
    // ========================================================================

    /// GET /v1/tune/data
    pub async fn export_data(&self) -> Response {
        Self::send(self.request(reqwest::Method::GET, "/v1/tune/data")).await
    }

    /// DELETE /v1/tune/data
    pub async fn clear_data(&self) -> Response {
        Self::send(self.request(reqwest::Method::DELETE, "/v1/tune/data")).await
    }
}
