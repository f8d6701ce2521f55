use super::models::{format_date, MoodPlaylist, Track, UserTrackIndex};
use crate::kv_store::KvStore;
use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

fn track_key(track_id: &str) -> String {
    format!("tracks/{}", track_id)
}

fn user_tracks_key(user_id: &str) -> String {
    format!("user/tracks/{}", user_id)
}

fn fetch_lock_key(user_id: &str) -> String {
    format!("user/fetch_lock/{}", user_id)
}

fn mood_playlist_prefix(user_id: &str) -> String {
    format!("user/playlist/{}/", user_id)
}

fn mood_playlist_key(user_id: &str, date: NaiveDate) -> String {
    format!("{}{}", mood_playlist_prefix(user_id), format_date(date))
}

fn remote_playlist_key(user_id: &str) -> String {
    format!("user/remote_playlist/{}", user_id)
}

/// Typed access to everything the tune service persists.
#[derive(Clone)]
pub struct TuneStore {
    kv: Arc<dyn KvStore>,
}

impl TuneStore {
    pub fn new(kv: Arc<dyn KvStore>) -> Self {
        Self { kv }
    }

    fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.kv.get(key)? {
            Some(bytes) => {
                let value = serde_json::from_slice(&bytes)
                    .with_context(|| format!("Failed to decode value at {}", key))?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    fn put_json<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        let bytes = serde_json::to_vec(value)
            .with_context(|| format!("Failed to encode value for {}", key))?;
        self.kv.put(key, &bytes)
    }

    // =========================================================================
    // Track metadata cache
    // =========================================================================

    pub fn put_track(&self, track: &Track) -> Result<()> {
        self.put_json(&track_key(&track.id), track)
    }

    pub fn get_track(&self, track_id: &str) -> Result<Option<Track>> {
        self.get_json(&track_key(track_id))
    }

    /// Returns the tracks that resolve, in the order of `track_ids`.
    pub fn get_tracks(&self, track_ids: &[String]) -> Result<Vec<Track>> {
        let mut tracks = Vec::with_capacity(track_ids.len());
        for id in track_ids {
            match self.get_track(id)? {
                Some(track) => tracks.push(track),
                None => warn!("Track {} is not in the metadata cache", id),
            }
        }
        Ok(tracks)
    }

    // =========================================================================
    // User track index
    // =========================================================================

    pub fn get_user_tracks(&self, user_id: &str) -> Result<Option<UserTrackIndex>> {
        self.get_json(&user_tracks_key(user_id))
    }

    pub fn set_user_tracks(&self, index: &UserTrackIndex) -> Result<()> {
        self.put_json(&user_tracks_key(&index.user_id), index)
    }

    pub fn clear_user_tracks(&self, user_id: &str) -> Result<bool> {
        self.kv.delete(&user_tracks_key(user_id))
    }

    // =========================================================================
    // Fetch lock
    // =========================================================================

    pub fn set_user_fetch_lock(&self, user_id: &str, ttl: Duration) -> Result<()> {
        self.kv.put_with_ttl(&fetch_lock_key(user_id), &[1], ttl)
    }

    pub fn is_user_fetch_locked(&self, user_id: &str) -> Result<bool> {
        Ok(self.kv.get(&fetch_lock_key(user_id))?.is_some())
    }

    pub fn clear_user_fetch_lock(&self, user_id: &str) -> Result<bool> {
        self.kv.delete(&fetch_lock_key(user_id))
    }

    // =========================================================================
    // Mood playlists
    // =========================================================================

    pub fn set_mood_playlist(&self, user_id: &str, playlist: &MoodPlaylist) -> Result<()> {
        self.put_json(&mood_playlist_key(user_id, playlist.date), playlist)
    }

    pub fn get_mood_playlist(&self, user_id: &str, date: NaiveDate) -> Result<Option<MoodPlaylist>> {
        self.get_json(&mood_playlist_key(user_id, date))
    }

    /// All of the user's playlists, oldest first.
    pub fn get_mood_playlists(&self, user_id: &str) -> Result<Vec<MoodPlaylist>> {
        self.kv
            .scan_prefix(&mood_playlist_prefix(user_id))?
            .into_iter()
            .map(|(key, bytes)| {
                serde_json::from_slice(&bytes)
                    .with_context(|| format!("Failed to decode playlist at {}", key))
            })
            .collect()
    }

    /// Playlists dated within `[start, end]`, both ends inclusive.
    pub fn get_mood_playlists_between(
        &self,
        user_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<MoodPlaylist>> {
        let prefix = mood_playlist_prefix(user_id);
        let start_key = format!("{}{}", prefix, format_date(start));
        let end_key = format!("{}{}", prefix, format_date(end));
        self.kv
            .scan_prefix(&prefix)?
            .into_iter()
            .filter(|(key, _)| *key >= start_key && *key <= end_key)
            .map(|(key, bytes)| {
                serde_json::from_slice(&bytes)
                    .with_context(|| format!("Failed to decode playlist at {}", key))
            })
            .collect()
    }

    pub fn clear_mood_playlists(&self, user_id: &str) -> Result<usize> {
        self.kv.delete_prefix(&mood_playlist_prefix(user_id))
    }

    // =========================================================================
    // Remote playlist
    // =========================================================================

    pub fn get_remote_playlist_id(&self, user_id: &str) -> Result<Option<String>> {
        Ok(self
            .kv
            .get(&remote_playlist_key(user_id))?
            .map(|bytes| String::from_utf8_lossy(&bytes).into_owned()))
    }

    pub fn set_remote_playlist_id(&self, user_id: &str, playlist_id: &str) -> Result<()> {
        self.kv
            .put(&remote_playlist_key(user_id), playlist_id.as_bytes())
    }

    pub fn clear_remote_playlist_id(&self, user_id: &str) -> Result<bool> {
        self.kv.delete(&remote_playlist_key(user_id))
    }
}
