//! Wire shapes of the Spotify Web API responses and request bodies.

use serde::{Deserialize, Serialize};

use super::{AudioFeatures, SavedTrack, SavedTrackPage};
use crate::tune_store::ArtistRef;

#[derive(Debug, Deserialize)]
pub struct CurrentUser {
    pub id: String,
}

#[derive(Debug, Deserialize)]
pub struct Image {
    pub url: String,
}

#[derive(Debug, Deserialize)]
pub struct Album {
    /// Null for local files.
    pub id: Option<String>,
    #[serde(default)]
    pub images: Vec<Image>,
}

#[derive(Debug, Deserialize)]
pub struct Artist {
    /// Null for local files.
    pub id: Option<String>,
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct FullTrack {
    /// Absent for local files.
    pub id: Option<String>,
    pub name: String,
    pub album: Album,
    #[serde(default)]
    pub artists: Vec<Artist>,
    pub available_markets: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
pub struct SavedTrackItem {
    pub track: FullTrack,
}

#[derive(Debug, Deserialize)]
pub struct SavedTracksResponse {
    pub items: Vec<SavedTrackItem>,
    pub total: u32,
}

impl From<SavedTracksResponse> for SavedTrackPage {
    fn from(response: SavedTracksResponse) -> Self {
        let tracks = response
            .items
            .into_iter()
            .filter_map(|item| {
                let track = item.track;
                let id = track.id?;
                Some(SavedTrack {
                    id,
                    name: track.name,
                    album_id: track.album.id.unwrap_or_default(),
                    album_art_url: track.album.images.into_iter().next().map(|i| i.url),
                    artists: track
                        .artists
                        .into_iter()
                        .filter_map(|a| {
                            Some(ArtistRef {
                                id: a.id?,
                                name: a.name,
                            })
                        })
                        .collect(),
                    available_markets: track.available_markets,
                })
            })
            .collect();
        SavedTrackPage {
            tracks,
            total: response.total,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct WireAudioFeatures {
    pub id: String,
    pub valence: f32,
    pub energy: f32,
}

#[derive(Debug, Deserialize)]
pub struct AudioFeaturesResponse {
    /// Null entries stand for tracks without analysis.
    pub audio_features: Vec<Option<WireAudioFeatures>>,
}

impl AudioFeaturesResponse {
    pub fn into_features(self) -> Vec<AudioFeatures> {
        self.audio_features
            .into_iter()
            .flatten()
            .map(|f| AudioFeatures {
                id: f.id,
                valence: f.valence,
                energy: f.energy,
            })
            .collect()
    }
}

#[derive(Debug, Serialize)]
pub struct CreatePlaylistRequest<'a> {
    pub name: &'a str,
    pub description: &'a str,
    pub public: bool,
}

#[derive(Debug, Deserialize)]
pub struct CreatedPlaylist {
    pub id: String,
}

#[derive(Debug, Deserialize)]
pub struct PlaylistTrackRef {
    pub id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PlaylistItem {
    pub track: Option<PlaylistTrackRef>,
}

#[derive(Debug, Deserialize)]
pub struct PlaylistItemsResponse {
    pub items: Vec<PlaylistItem>,
    pub next: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AddTracksRequest {
    pub uris: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct TrackUri {
    pub uri: String,
}

#[derive(Debug, Serialize)]
pub struct RemoveTracksRequest {
    pub tracks: Vec<TrackUri>,
}

pub fn track_uri(track_id: &str) -> String {
    format!("spotify:track:{}", track_id)
}
