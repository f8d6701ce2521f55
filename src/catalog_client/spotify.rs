//! reqwest-backed client for the Spotify Web API.

use super::models::{
    track_uri, AddTracksRequest, AudioFeaturesResponse, CreatePlaylistRequest, CreatedPlaylist,
    CurrentUser, PlaylistItemsResponse, RemoveTracksRequest, SavedTracksResponse, TrackUri,
};
use super::{
    AudioFeatures, CatalogClient, CatalogClientFactory, CatalogError, CatalogResult,
    SavedTrackPage,
};
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{header, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Most ids the API accepts in a single features, add or remove call.
const MAX_IDS_PER_REQUEST: usize = 100;

/// Spaces out requests sharing the same application credentials.
struct RequestPacer {
    min_interval: Duration,
    last_request: Mutex<Option<Instant>>,
}

impl RequestPacer {
    async fn wait(&self) {
        if self.min_interval.is_zero() {
            return;
        }
        let mut last = self.last_request.lock().await;
        if let Some(previous) = *last {
            let elapsed = previous.elapsed();
            if elapsed < self.min_interval {
                tokio::time::sleep(self.min_interval - elapsed).await;
            }
        }
        *last = Some(Instant::now());
    }
}

/// Client acting on behalf of the user owning `access_token`.
pub struct SpotifyCatalogClient {
    client: reqwest::Client,
    base_url: String,
    access_token: String,
    pacer: Arc<RequestPacer>,
}

impl SpotifyCatalogClient {
    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        self.client
            .request(method, url)
            .bearer_auth(&self.access_token)
    }

    async fn send(&self, builder: RequestBuilder) -> CatalogResult<Response> {
        self.pacer.wait().await;
        let response = builder.send().await.map_err(map_reqwest_error)?;
        check_status(response).await
    }

    async fn send_json<T: DeserializeOwned>(&self, builder: RequestBuilder) -> CatalogResult<T> {
        let response = self.send(builder).await?;
        let body = response.bytes().await.map_err(map_reqwest_error)?;
        serde_json::from_slice(&body).map_err(|e| CatalogError::Decode(e.to_string()))
    }
}

fn map_reqwest_error(err: reqwest::Error) -> CatalogError {
    if err.is_timeout() {
        CatalogError::Timeout
    } else {
        CatalogError::Http(err)
    }
}

async fn check_status(response: Response) -> CatalogResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    if status == StatusCode::TOO_MANY_REQUESTS {
        let retry_after_secs = response
            .headers()
            .get(header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok());
        warn!("Catalog rate limited, retry after {:?}s", retry_after_secs);
        return Err(CatalogError::RateLimited { retry_after_secs });
    }
    let body = response.text().await.unwrap_or_default();
    Err(CatalogError::Status {
        status: status.as_u16(),
        body,
    })
}

#[async_trait]
impl CatalogClient for SpotifyCatalogClient {
    async fn current_user_id(&self) -> CatalogResult<String> {
        let user: CurrentUser = self.send_json(self.request(Method::GET, "/me")).await?;
        Ok(user.id)
    }

    async fn saved_tracks(&self, offset: u32, limit: u32) -> CatalogResult<SavedTrackPage> {
        let path = format!("/me/tracks?offset={}&limit={}", offset, limit);
        let response: SavedTracksResponse =
            self.send_json(self.request(Method::GET, &path)).await?;
        debug!(
            "Fetched {} saved tracks at offset {} (total {})",
            response.items.len(),
            offset,
            response.total
        );
        Ok(response.into())
    }

    async fn audio_features(&self, track_ids: &[String]) -> CatalogResult<Vec<AudioFeatures>> {
        let mut features = Vec::with_capacity(track_ids.len());
        for chunk in track_ids.chunks(MAX_IDS_PER_REQUEST) {
            let path = format!("/audio-features?ids={}", chunk.join(","));
            let response: AudioFeaturesResponse =
                self.send_json(self.request(Method::GET, &path)).await?;
            features.extend(response.into_features());
        }
        Ok(features)
    }

    async fn create_playlist(
        &self,
        user_id: &str,
        name: &str,
        description: &str,
        public: bool,
    ) -> CatalogResult<String> {
        let path = format!("/users/{}/playlists", user_id);
        let body = CreatePlaylistRequest {
            name,
            description,
            public,
        };
        let created: CreatedPlaylist = self
            .send_json(self.request(Method::POST, &path).json(&body))
            .await?;
        Ok(created.id)
    }

    async fn playlist_track_ids(&self, playlist_id: &str) -> CatalogResult<Vec<String>> {
        let mut ids = Vec::new();
        let mut offset = 0;
        loop {
            let path = format!(
                "/playlists/{}/tracks?offset={}&limit={}",
                playlist_id, offset, MAX_IDS_PER_REQUEST
            );
            let response: PlaylistItemsResponse =
                self.send_json(self.request(Method::GET, &path)).await?;
            let count = response.items.len();
            ids.extend(
                response
                    .items
                    .into_iter()
                    .filter_map(|item| item.track.and_then(|t| t.id)),
            );
            if response.next.is_none() || count == 0 {
                break;
            }
            offset += count;
        }
        Ok(ids)
    }

    async fn add_tracks_to_playlist(
        &self,
        playlist_id: &str,
        track_ids: &[String],
    ) -> CatalogResult<()> {
        let path = format!("/playlists/{}/tracks", playlist_id);
        for chunk in track_ids.chunks(MAX_IDS_PER_REQUEST) {
            let body = AddTracksRequest {
                uris: chunk.iter().map(|id| track_uri(id)).collect(),
            };
            self.send(self.request(Method::POST, &path).json(&body))
                .await?;
        }
        Ok(())
    }

    async fn remove_tracks_from_playlist(
        &self,
        playlist_id: &str,
        track_ids: &[String],
    ) -> CatalogResult<()> {
        let path = format!("/playlists/{}/tracks", playlist_id);
        for chunk in track_ids.chunks(MAX_IDS_PER_REQUEST) {
            let body = RemoveTracksRequest {
                tracks: chunk
                    .iter()
                    .map(|id| TrackUri { uri: track_uri(id) })
                    .collect(),
            };
            self.send(self.request(Method::DELETE, &path).json(&body))
                .await?;
        }
        Ok(())
    }
}

/// Hands out [`SpotifyCatalogClient`]s sharing one connection pool and pacer.
pub struct SpotifyClientFactory {
    client: reqwest::Client,
    base_url: String,
    pacer: Arc<RequestPacer>,
}

impl SpotifyClientFactory {
    pub fn new(base_url: &str, timeout_sec: u64, min_request_interval: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_sec))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            pacer: Arc::new(RequestPacer {
                min_interval: min_request_interval,
                last_request: Mutex::new(None),
            }),
        })
    }
}

impl CatalogClientFactory for SpotifyClientFactory {
    fn client_for_token(&self, token: &str) -> Arc<dyn CatalogClient> {
        Arc::new(SpotifyCatalogClient {
            client: self.client.clone(),
            base_url: self.base_url.clone(),
            access_token: token.to_string(),
            pacer: self.pacer.clone(),
        })
    }
}
