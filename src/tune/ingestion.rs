//! Incremental, resumable indexing of a user's saved library.
//!
//! Each call walks the remote library page by page from the stored cursor,
//! persisting the index after every page so an aborted call resumes where it
//! stopped. Once a scan cycle completes the user gets a cool-down lock and
//! further calls return without touching the catalog until it expires.

use super::error::{TuneError, TuneResult};
use crate::catalog_client::{CatalogClient, CatalogError};
use crate::server::metrics;
use crate::tune_store::{Track, TuneStore, UserTrackIndex};
use serde::Serialize;
use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, info, warn};

#[derive(Clone, Debug)]
pub struct IngestionConfig {
    pub page_size: u32,
    /// Size of the index past which a call stops paging.
    pub max_indexed_tracks: usize,
    pub fetch_lock_ttl: Duration,
    pub remote_call_timeout: Duration,
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            page_size: 20,
            max_indexed_tracks: 1000,
            fetch_lock_ttl: Duration::from_secs(45 * 60),
            remote_call_timeout: Duration::from_secs(60),
        }
    }
}

/// What a single `ensure_indexed` call did.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct IngestionReport {
    pub skipped_by_lock: bool,
    pub pages_fetched: usize,
    pub tracks_indexed: usize,
    pub tracks_skipped: usize,
    pub completed_scan: bool,
}

/// Runs a catalog call under `deadline`, a timeout being a remote error.
pub(super) async fn with_deadline<T, F>(deadline: Duration, call: F) -> TuneResult<T>
where
    F: Future<Output = Result<T, CatalogError>>,
{
    let result = match tokio::time::timeout(deadline, call).await {
        Ok(result) => result,
        Err(_) => Err(CatalogError::Timeout),
    };
    result.map_err(|e| {
        metrics::record_catalog_error(e.kind());
        TuneError::RemoteService(e)
    })
}

pub struct LibraryIngestor {
    store: TuneStore,
    config: IngestionConfig,
}

impl LibraryIngestor {
    pub fn new(store: TuneStore, config: IngestionConfig) -> Self {
        Self { store, config }
    }

    async fn remote<T, F>(&self, call: F) -> TuneResult<T>
    where
        F: Future<Output = Result<T, CatalogError>>,
    {
        with_deadline(self.config.remote_call_timeout, call).await
    }

    pub async fn ensure_indexed(
        &self,
        client: &dyn CatalogClient,
        user_id: &str,
    ) -> TuneResult<IngestionReport> {
        if self.store.is_user_fetch_locked(user_id)? {
            debug!("Library of {} scanned recently, skipping", user_id);
            metrics::record_scan_skipped_by_lock();
            return Ok(IngestionReport {
                skipped_by_lock: true,
                ..Default::default()
            });
        }

        let mut index = self
            .store
            .get_user_tracks(user_id)?
            .unwrap_or_else(|| UserTrackIndex::new(user_id));
        // Every unlocked call starts a new cycle from the stored cursor.
        index.completed_scan = false;
        let mut report = IngestionReport::default();

        loop {
            self.ingest_page(client, &mut index, &mut report).await?;
            self.store.set_user_tracks(&index)?;

            if index.completed_scan || index.tracks.len() >= self.config.max_indexed_tracks {
                break;
            }
        }

        self.store
            .set_user_fetch_lock(user_id, self.config.fetch_lock_ttl)?;
        report.completed_scan = index.completed_scan;

        info!(
            "Indexed library of {}: {} pages, {} tracks indexed, {} skipped, completed: {}",
            user_id,
            report.pages_fetched,
            report.tracks_indexed,
            report.tracks_skipped,
            report.completed_scan
        );
        Ok(report)
    }

    async fn ingest_page(
        &self,
        client: &dyn CatalogClient,
        index: &mut UserTrackIndex,
        report: &mut IngestionReport,
    ) -> TuneResult<()> {
        let page_size = self.config.page_size;
        let page = self
            .remote(client.saved_tracks(index.cursor, page_size))
            .await?;
        report.pages_fetched += 1;

        let ids: Vec<String> = page.tracks.iter().map(|t| t.id.clone()).collect();
        let features: HashMap<String, (f32, f32)> = if ids.is_empty() {
            HashMap::new()
        } else {
            self.remote(client.audio_features(&ids))
                .await?
                .into_iter()
                .map(|f| (f.id, (f.valence, f.energy)))
                .collect()
        };

        let mut caught_up = false;
        let mut indexed = 0;
        for saved in &page.tracks {
            if index.last_track_scanned.as_deref() == Some(saved.id.as_str()) {
                debug!(
                    "Reached last scanned track {} for {}",
                    saved.id, index.user_id
                );
                index.cursor = page.total.saturating_add(1);
                caught_up = true;
                break;
            }

            if index.ignored.contains(&saved.id) {
                metrics::record_track_skipped("ignored");
                report.tracks_skipped += 1;
                continue;
            }

            let Some(&(valence, energy)) = features.get(&saved.id) else {
                metrics::record_track_skipped("missing_features");
                report.tracks_skipped += 1;
                continue;
            };

            if saved
                .available_markets
                .as_ref()
                .is_some_and(|markets| markets.is_empty())
            {
                warn!("Track {} is not available in any market", saved.id);
                metrics::record_track_skipped("no_markets");
                report.tracks_skipped += 1;
                continue;
            }

            let track = Track {
                id: saved.id.clone(),
                name: saved.name.clone(),
                valence,
                energy,
                album_id: saved.album_id.clone(),
                album_art_url: saved.album_art_url.clone(),
                artists: saved.artists.clone(),
                available_markets: saved
                    .available_markets
                    .iter()
                    .flatten()
                    .cloned()
                    .collect(),
            };
            self.store.put_track(&track)?;
            index.tracks.insert(track.id.clone(), track.projection());
            indexed += 1;
        }

        if !caught_up {
            index.cursor = index.cursor.saturating_add(page_size);
        }

        if index.cursor >= page.total {
            index.completed_scan = true;
            index.cursor = 0;
            // Local files are already dropped from the page, so this is the
            // last item that has an id.
            if let Some(last) = page.tracks.last() {
                index.last_track_scanned = Some(last.id.clone());
            }
        }

        debug!(
            "Page for {} done: {} indexed, cursor now {}",
            index.user_id, indexed, index.cursor
        );
        metrics::record_ingestion_page(indexed);
        report.tracks_indexed += indexed;
        Ok(())
    }
}
