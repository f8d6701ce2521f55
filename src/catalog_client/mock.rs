//! In-memory catalog used by unit tests.

use super::{
    AudioFeatures, CatalogClient, CatalogClientFactory, CatalogError, CatalogResult, SavedTrack,
    SavedTrackPage,
};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub struct MockCatalogClient {
    user_id: String,
    library: Mutex<Vec<SavedTrack>>,
    features: Mutex<HashMap<String, (f32, f32)>>,
    playlists: Mutex<HashMap<String, Vec<String>>>,
    fail_saved_tracks_from: Mutex<Option<u32>>,
    saved_tracks_delay: Mutex<Option<Duration>>,
    requested_offsets: Mutex<Vec<u32>>,
    call_counts: Mutex<HashMap<String, usize>>,
}

impl MockCatalogClient {
    pub fn new(user_id: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            library: Mutex::new(Vec::new()),
            features: Mutex::new(HashMap::new()),
            playlists: Mutex::new(HashMap::new()),
            fail_saved_tracks_from: Mutex::new(None),
            saved_tracks_delay: Mutex::new(None),
            requested_offsets: Mutex::new(Vec::new()),
            call_counts: Mutex::new(HashMap::new()),
        }
    }

    pub fn saved_track(id: &str, markets: Option<Vec<&str>>) -> SavedTrack {
        SavedTrack {
            id: id.to_string(),
            name: format!("Track {}", id),
            album_id: format!("album-{}", id),
            album_art_url: Some(format!("http://img/{}", id)),
            artists: vec![],
            available_markets: markets.map(|m| m.into_iter().map(String::from).collect()),
        }
    }

    /// Appends a track with features to the end of the library.
    pub fn add_track(&self, id: &str, valence: f32, energy: f32) {
        self.add_saved_track(Self::saved_track(id, Some(vec!["AU"])));
        self.set_features(id, valence, energy);
    }

    pub fn add_saved_track(&self, track: SavedTrack) {
        self.library.lock().unwrap().push(track);
    }

    /// Inserts a track at the top of the library, as a fresh save would.
    pub fn prepend_track(&self, id: &str, valence: f32, energy: f32) {
        self.library
            .lock()
            .unwrap()
            .insert(0, Self::saved_track(id, Some(vec!["AU"])));
        self.set_features(id, valence, energy);
    }

    pub fn set_features(&self, id: &str, valence: f32, energy: f32) {
        self.features
            .lock()
            .unwrap()
            .insert(id.to_string(), (valence, energy));
    }

    pub fn fail_saved_tracks_from(&self, offset: u32) {
        *self.fail_saved_tracks_from.lock().unwrap() = Some(offset);
    }

    pub fn clear_failure(&self) {
        *self.fail_saved_tracks_from.lock().unwrap() = None;
    }

    pub fn delay_saved_tracks(&self, delay: Duration) {
        *self.saved_tracks_delay.lock().unwrap() = Some(delay);
    }

    pub fn requested_offsets(&self) -> Vec<u32> {
        self.requested_offsets.lock().unwrap().clone()
    }

    pub fn playlist_tracks(&self, playlist_id: &str) -> Option<Vec<String>> {
        self.playlists.lock().unwrap().get(playlist_id).cloned()
    }

    pub fn get_call_count(&self, method: &str) -> usize {
        *self.call_counts.lock().unwrap().get(method).unwrap_or(&0)
    }

    pub fn total_calls(&self) -> usize {
        self.call_counts.lock().unwrap().values().sum()
    }

    fn increment_call(&self, method: &str) {
        let mut counts = self.call_counts.lock().unwrap();
        *counts.entry(method.to_string()).or_insert(0) += 1;
    }
}

#[async_trait]
impl CatalogClient for MockCatalogClient {
    async fn current_user_id(&self) -> CatalogResult<String> {
        self.increment_call("current_user_id");
        Ok(self.user_id.clone())
    }

    async fn saved_tracks(&self, offset: u32, limit: u32) -> CatalogResult<SavedTrackPage> {
        self.increment_call("saved_tracks");
        self.requested_offsets.lock().unwrap().push(offset);

        let delay = *self.saved_tracks_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(fail_from) = *self.fail_saved_tracks_from.lock().unwrap() {
            if offset >= fail_from {
                return Err(CatalogError::Status {
                    status: 502,
                    body: "bad gateway".to_string(),
                });
            }
        }

        let library = self.library.lock().unwrap();
        let start = (offset as usize).min(library.len());
        let end = (start + limit as usize).min(library.len());
        Ok(SavedTrackPage {
            tracks: library[start..end].to_vec(),
            total: library.len() as u32,
        })
    }

    async fn audio_features(&self, track_ids: &[String]) -> CatalogResult<Vec<AudioFeatures>> {
        self.increment_call("audio_features");
        let features = self.features.lock().unwrap();
        Ok(track_ids
            .iter()
            .filter_map(|id| {
                features.get(id).map(|(valence, energy)| AudioFeatures {
                    id: id.clone(),
                    valence: *valence,
                    energy: *energy,
                })
            })
            .collect())
    }

    async fn create_playlist(
        &self,
        _user_id: &str,
        _name: &str,
        _description: &str,
        _public: bool,
    ) -> CatalogResult<String> {
        self.increment_call("create_playlist");
        let mut playlists = self.playlists.lock().unwrap();
        let id = format!("remote-{}", playlists.len() + 1);
        playlists.insert(id.clone(), Vec::new());
        Ok(id)
    }

    async fn playlist_track_ids(&self, playlist_id: &str) -> CatalogResult<Vec<String>> {
        self.increment_call("playlist_track_ids");
        self.playlists
            .lock()
            .unwrap()
            .get(playlist_id)
            .cloned()
            .ok_or_else(|| CatalogError::Status {
                status: 404,
                body: format!("no playlist {}", playlist_id),
            })
    }

    async fn add_tracks_to_playlist(
        &self,
        playlist_id: &str,
        track_ids: &[String],
    ) -> CatalogResult<()> {
        self.increment_call("add_tracks_to_playlist");
        self.playlists
            .lock()
            .unwrap()
            .entry(playlist_id.to_string())
            .or_default()
            .extend(track_ids.iter().cloned());
        Ok(())
    }

    async fn remove_tracks_from_playlist(
        &self,
        playlist_id: &str,
        track_ids: &[String],
    ) -> CatalogResult<()> {
        self.increment_call("remove_tracks_from_playlist");
        if let Some(tracks) = self.playlists.lock().unwrap().get_mut(playlist_id) {
            tracks.retain(|id| !track_ids.contains(id));
        }
        Ok(())
    }
}

/// Maps every token to the same mock client.
pub struct MockClientFactory {
    pub client: Arc<MockCatalogClient>,
}

impl CatalogClientFactory for MockClientFactory {
    fn client_for_token(&self, _token: &str) -> Arc<dyn CatalogClient> {
        self.client.clone()
    }
}
