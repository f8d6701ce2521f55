//! Mood-walk playlist selection.
//!
//! Starting from the listener's mood, each step picks a track from the
//! category opposite to the current mood and moves the mood by a quarter of
//! the track's centered valence, converging towards neutral. Once the mood
//! enters the neutral band it must stay there.

use super::error::{TuneError, TuneResult};
use super::mood::{feel_nothing_yet, transform_valence, Category, MoodCategory};
use crate::server::metrics;
use crate::tune_store::{MoodPlaylist, TuneStore};
use chrono::{Days, NaiveDate, Utc};
use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::{BTreeSet, VecDeque};
use tracing::{debug, info};

const MOOD_STEP_DIVISOR: f32 = 4.0;
const MAX_WIDENING_STEPS: usize = 5;

#[derive(Clone, Debug, PartialEq)]
pub struct WalkEntry {
    pub id: String,
    pub valence: f32,
    pub energy: f32,
}

impl WalkEntry {
    fn transformed(&self) -> f32 {
        transform_valence(self.valence)
    }
}

#[derive(Debug)]
pub struct WalkOutcome {
    /// Selected entries, ordered by valence towards neutral.
    pub tracks: Vec<WalkEntry>,
    /// Mood after the last accepted track.
    pub final_mood: f32,
}

/// Runs the mood walk over `entries`, selecting at most `length` of them.
pub fn walk<R: Rng + ?Sized>(
    entries: Vec<WalkEntry>,
    start_mood: f32,
    length: usize,
    rng: &mut R,
) -> WalkOutcome {
    let mut grouped: [Vec<WalkEntry>; 5] = Default::default();
    for entry in entries {
        grouped[MoodCategory::snap(entry.transformed()).index()].push(entry);
    }
    let mut buckets: [VecDeque<WalkEntry>; 5] = grouped.map(|mut bucket| {
        bucket.shuffle(&mut *rng);
        VecDeque::from(bucket)
    });

    let mut mood = start_mood;
    let mut feel_nothing = false;
    let mut selected = Vec::with_capacity(length);

    while selected.len() < length {
        if feel_nothing_yet(mood) {
            feel_nothing = true;
        }

        let mut target = MoodCategory::snap(mood).opposite();
        if !feel_nothing {
            let mut steps = 0;
            while buckets[target.index()].is_empty()
                && !target.is_neutral()
                && steps < MAX_WIDENING_STEPS
            {
                target = target.toward_neutral();
                steps += 1;
            }
        }

        let Some(entry) = buckets[target.index()].pop_front() else {
            debug!("No track left towards {:?}, stopping walk", target);
            break;
        };

        let candidate = mood + entry.transformed() / MOOD_STEP_DIVISOR;
        if feel_nothing && !feel_nothing_yet(candidate) {
            continue;
        }
        mood = candidate;
        selected.push(entry);
    }

    if start_mood > 0.0 {
        selected.sort_by(|a, b| a.valence.total_cmp(&b.valence));
    } else {
        selected.sort_by(|a, b| b.valence.total_cmp(&a.valence));
    }

    WalkOutcome {
        tracks: selected,
        final_mood: mood,
    }
}

#[derive(Clone, Debug)]
pub struct PlaylistConfig {
    pub length: usize,
    /// Days before the playlist date whose playlists' tracks are excluded.
    pub lookback_days: u32,
}

impl Default for PlaylistConfig {
    fn default() -> Self {
        Self {
            length: 10,
            lookback_days: 7,
        }
    }
}

pub struct PlaylistGenerator {
    store: TuneStore,
    config: PlaylistConfig,
}

impl PlaylistGenerator {
    pub fn new(store: TuneStore, config: PlaylistConfig) -> Self {
        Self { store, config }
    }

    fn excluded_tracks(&self, user_id: &str, date: NaiveDate) -> TuneResult<BTreeSet<String>> {
        let window_start = date
            .checked_sub_days(Days::new(u64::from(self.config.lookback_days)))
            .unwrap_or(NaiveDate::MIN);
        let recent = self
            .store
            .get_mood_playlists_between(user_id, window_start, date)?;
        Ok(recent.into_iter().flat_map(|p| p.tracks).collect())
    }

    /// Builds and stores the playlist for `date`, replacing any previous one.
    pub fn generate<R: Rng + ?Sized>(
        &self,
        user_id: &str,
        start_mood: f32,
        date: NaiveDate,
        note: Option<String>,
        rng: &mut R,
    ) -> TuneResult<MoodPlaylist> {
        let index = self
            .store
            .get_user_tracks(user_id)?
            .ok_or_else(|| TuneError::NotFound(format!("track index for {}", user_id)))?;
        let excluded = self.excluded_tracks(user_id, date)?;

        let entries: Vec<WalkEntry> = index
            .tracks
            .iter()
            .filter(|(id, _)| !excluded.contains(*id) && !index.ignored.contains(*id))
            .map(|(id, projection)| WalkEntry {
                id: id.clone(),
                valence: projection.valence,
                energy: projection.energy,
            })
            .collect();
        debug!(
            "Walking {} candidate tracks for {} ({} excluded)",
            entries.len(),
            user_id,
            excluded.len()
        );

        let outcome = walk(entries, start_mood, self.config.length, rng);
        let playlist = MoodPlaylist {
            date,
            tracks: outcome.tracks.into_iter().map(|e| e.id).collect(),
            start_mood,
            end_mood: MoodCategory::snap(outcome.final_mood).value(),
            note,
            created_at: Utc::now(),
        };
        self.store.set_mood_playlist(user_id, &playlist)?;

        metrics::record_playlist_generated(playlist.tracks.len());
        info!(
            "Generated playlist of {} tracks for {} on {}, mood {} -> {}",
            playlist.tracks.len(),
            user_id,
            date,
            playlist.start_mood,
            playlist.end_mood
        );
        Ok(playlist)
    }
}
