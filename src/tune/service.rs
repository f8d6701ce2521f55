use super::error::{TuneError, TuneResult};
use super::ingestion::{with_deadline, IngestionConfig, IngestionReport, LibraryIngestor};
use super::mood_walk::{PlaylistConfig, PlaylistGenerator};
use crate::catalog_client::{CatalogClient, CatalogError};
use crate::tune_store::{MoodPlaylist, Track, TuneStore, UserDataExport};
use chrono::NaiveDate;
use std::time::Duration;
use tracing::{info, warn};

#[derive(Clone, Debug)]
pub struct TuneServiceConfig {
    pub ingestion: IngestionConfig,
    pub playlist: PlaylistConfig,
    /// Name given to the catalog playlist created on first sync.
    pub remote_playlist_name: String,
}

impl Default for TuneServiceConfig {
    fn default() -> Self {
        Self {
            ingestion: IngestionConfig::default(),
            playlist: PlaylistConfig::default(),
            remote_playlist_name: "Tune Neutral".to_string(),
        }
    }
}

/// Entry point for every user-facing tune operation.
pub struct TuneService {
    store: TuneStore,
    ingestor: LibraryIngestor,
    generator: PlaylistGenerator,
    remote_playlist_name: String,
    remote_call_timeout: Duration,
}

impl TuneService {
    pub fn new(store: TuneStore, config: TuneServiceConfig) -> Self {
        Self {
            remote_call_timeout: config.ingestion.remote_call_timeout,
            ingestor: LibraryIngestor::new(store.clone(), config.ingestion),
            generator: PlaylistGenerator::new(store.clone(), config.playlist),
            remote_playlist_name: config.remote_playlist_name,
            store,
        }
    }

    pub async fn ensure_indexed(
        &self,
        client: &dyn CatalogClient,
        user_id: &str,
    ) -> TuneResult<IngestionReport> {
        self.ingestor.ensure_indexed(client, user_id).await
    }

    pub async fn generate_mood_playlist(
        &self,
        client: &dyn CatalogClient,
        user_id: &str,
        start_mood: f32,
        date: NaiveDate,
        note: Option<String>,
    ) -> TuneResult<MoodPlaylist> {
        self.ingestor.ensure_indexed(client, user_id).await?;
        self.generator
            .generate(user_id, start_mood, date, note, &mut rand::rng())
    }

    pub fn get_playlists(&self, user_id: &str) -> TuneResult<Vec<MoodPlaylist>> {
        Ok(self.store.get_mood_playlists(user_id)?)
    }

    pub fn get_playlist(&self, user_id: &str, date: NaiveDate) -> TuneResult<MoodPlaylist> {
        self.store
            .get_mood_playlist(user_id, date)?
            .ok_or_else(|| TuneError::NotFound(format!("playlist for {}", date)))
    }

    pub fn get_track(&self, track_id: &str) -> TuneResult<Track> {
        self.store
            .get_track(track_id)?
            .ok_or_else(|| TuneError::NotFound(format!("track {}", track_id)))
    }

    /// Resolves ids through the track cache, dropping those that don't resolve.
    pub fn get_tracks(&self, track_ids: &[String]) -> TuneResult<Vec<Track>> {
        Ok(self.store.get_tracks(track_ids)?)
    }

    /// Moves a track out of the user's index so it is never picked again.
    pub fn remove_track(&self, user_id: &str, track_id: &str) -> TuneResult<()> {
        let mut index = self
            .store
            .get_user_tracks(user_id)?
            .ok_or_else(|| TuneError::NotFound(format!("track index for {}", user_id)))?;
        if index.tracks.remove(track_id).is_none() {
            return Err(TuneError::NotFound(format!("indexed track {}", track_id)));
        }
        index.ignored.insert(track_id.to_string());
        self.store.set_user_tracks(&index)?;
        info!("User {} removed track {}", user_id, track_id);
        Ok(())
    }

    pub fn unremove_track(&self, user_id: &str, track_id: &str) -> TuneResult<()> {
        let mut index = self
            .store
            .get_user_tracks(user_id)?
            .ok_or_else(|| TuneError::NotFound(format!("track index for {}", user_id)))?;
        if !index.ignored.contains(track_id) {
            return Err(TuneError::NotFound(format!("removed track {}", track_id)));
        }
        let track = self.get_track(track_id)?;
        index.ignored.remove(track_id);
        index.tracks.insert(track.id.clone(), track.projection());
        self.store.set_user_tracks(&index)?;
        info!("User {} restored track {}", user_id, track_id);
        Ok(())
    }

    pub fn removed_tracks(&self, user_id: &str) -> TuneResult<Vec<String>> {
        let index = self
            .store
            .get_user_tracks(user_id)?
            .ok_or_else(|| TuneError::NotFound(format!("track index for {}", user_id)))?;
        Ok(index.ignored.into_iter().collect())
    }

    /// Forgets everything stored for the user. The shared track cache is kept.
    pub fn clear_user_data(&self, user_id: &str) -> TuneResult<()> {
        self.store.clear_user_tracks(user_id)?;
        self.store.clear_user_fetch_lock(user_id)?;
        let playlists = self.store.clear_mood_playlists(user_id)?;
        self.store.clear_remote_playlist_id(user_id)?;
        info!(
            "Cleared data of {} ({} playlists removed)",
            user_id, playlists
        );
        Ok(())
    }

    pub fn remote_playlist_id(&self, user_id: &str) -> TuneResult<Option<String>> {
        Ok(self.store.get_remote_playlist_id(user_id)?)
    }

    async fn create_remote_playlist(
        &self,
        client: &dyn CatalogClient,
        user_id: &str,
    ) -> TuneResult<String> {
        let playlist_id = with_deadline(
            self.remote_call_timeout,
            client.create_playlist(
                user_id,
                &self.remote_playlist_name,
                "Mood walk towards neutral",
                false,
            ),
        )
        .await?;
        self.store.set_remote_playlist_id(user_id, &playlist_id)?;
        info!("Created remote playlist {} for {}", playlist_id, user_id);
        Ok(playlist_id)
    }

    /// Replaces the content of the user's catalog playlist with the tracks of
    /// the playlist for `date`. Returns the catalog playlist id.
    pub async fn sync_remote_playlist(
        &self,
        client: &dyn CatalogClient,
        user_id: &str,
        date: NaiveDate,
    ) -> TuneResult<String> {
        let playlist = self.get_playlist(user_id, date)?;
        let deadline = self.remote_call_timeout;

        let (playlist_id, existing) = match self.store.get_remote_playlist_id(user_id)? {
            Some(playlist_id) => {
                match with_deadline(deadline, client.playlist_track_ids(&playlist_id)).await {
                    Ok(existing) => (playlist_id, existing),
                    Err(TuneError::RemoteService(CatalogError::Status { status: 404, .. })) => {
                        warn!(
                            "Remote playlist {} of {} is gone, creating a new one",
                            playlist_id, user_id
                        );
                        (self.create_remote_playlist(client, user_id).await?, vec![])
                    }
                    Err(err) => return Err(err),
                }
            }
            None => (self.create_remote_playlist(client, user_id).await?, vec![]),
        };

        if !existing.is_empty() {
            with_deadline(
                deadline,
                client.remove_tracks_from_playlist(&playlist_id, &existing),
            )
            .await?;
        }
        if !playlist.tracks.is_empty() {
            with_deadline(
                deadline,
                client.add_tracks_to_playlist(&playlist_id, &playlist.tracks),
            )
            .await?;
        }

        info!(
            "Synced playlist of {} for {} to {}",
            date, user_id, playlist_id
        );
        Ok(playlist_id)
    }

    pub fn export_user_data(&self, user_id: &str) -> TuneResult<UserDataExport> {
        Ok(UserDataExport {
            user_tracks: self.store.get_user_tracks(user_id)?,
            mood_playlists: self.store.get_mood_playlists(user_id)?,
            fetch_locked: self.store.is_user_fetch_locked(user_id)?,
        })
    }
}
