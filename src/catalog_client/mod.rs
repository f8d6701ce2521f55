//! Access to the remote music catalog holding each user's saved library.

#[cfg(test)]
pub(crate) mod mock;
mod models;
mod spotify;

pub use spotify::{SpotifyCatalogClient, SpotifyClientFactory};

use crate::tune_store::ArtistRef;
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Catalog request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Catalog returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Catalog rate limit hit, retry after {retry_after_secs:?}s")]
    RateLimited { retry_after_secs: Option<u64> },

    #[error("Catalog request timed out")]
    Timeout,

    #[error("Failed to decode catalog response: {0}")]
    Decode(String),
}

impl CatalogError {
    /// Short label used for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            CatalogError::Http(_) => "http",
            CatalogError::Status { .. } => "status",
            CatalogError::RateLimited { .. } => "rate_limited",
            CatalogError::Timeout => "timeout",
            CatalogError::Decode(_) => "decode",
        }
    }
}

pub type CatalogResult<T> = std::result::Result<T, CatalogError>;

/// A track as it appears in a user's saved library.
#[derive(Clone, Debug, PartialEq)]
pub struct SavedTrack {
    pub id: String,
    pub name: String,
    pub album_id: String,
    pub album_art_url: Option<String>,
    pub artists: Vec<ArtistRef>,
    /// `None` when the catalog did not report markets at all.
    pub available_markets: Option<Vec<String>>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SavedTrackPage {
    pub tracks: Vec<SavedTrack>,
    /// Size of the whole library, not of this page.
    pub total: u32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct AudioFeatures {
    pub id: String,
    pub valence: f32,
    pub energy: f32,
}

/// Operations the tune service needs from the catalog, on behalf of one user.
#[async_trait]
pub trait CatalogClient: Send + Sync {
    async fn current_user_id(&self) -> CatalogResult<String>;

    async fn saved_tracks(&self, offset: u32, limit: u32) -> CatalogResult<SavedTrackPage>;

    /// Features for the given ids. Tracks the catalog has no features for are
    /// absent from the result.
    async fn audio_features(&self, track_ids: &[String]) -> CatalogResult<Vec<AudioFeatures>>;

    async fn create_playlist(
        &self,
        user_id: &str,
        name: &str,
        description: &str,
        public: bool,
    ) -> CatalogResult<String>;

    async fn playlist_track_ids(&self, playlist_id: &str) -> CatalogResult<Vec<String>>;

    async fn add_tracks_to_playlist(
        &self,
        playlist_id: &str,
        track_ids: &[String],
    ) -> CatalogResult<()>;

    async fn remove_tracks_from_playlist(
        &self,
        playlist_id: &str,
        track_ids: &[String],
    ) -> CatalogResult<()>;
}

/// Builds a catalog client acting with the given user access token.
pub trait CatalogClientFactory: Send + Sync {
    fn client_for_token(&self, token: &str) -> Arc<dyn CatalogClient>;
}
