use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::tune::mood::MoodCategory;

/// Format used for playlist dates, both in keys and on the wire.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Parses a playlist date. Only four digit years are accepted so that date
/// keys sort chronologically.
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s, DATE_FORMAT)
        .ok()
        .filter(|date| (0..=9999).contains(&date.year()))
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ArtistRef {
    pub id: String,
    pub name: String,
}

/// Denormalized track metadata, shared by every user.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub id: String,
    pub name: String,
    pub valence: f32,
    pub energy: f32,
    pub album_id: String,
    pub album_art_url: Option<String>,
    pub artists: Vec<ArtistRef>,
    pub available_markets: BTreeSet<String>,
}

impl Track {
    pub fn mood(&self) -> MoodCategory {
        MoodCategory::of_valence(self.valence)
    }

    pub fn projection(&self) -> MoodProjection {
        MoodProjection {
            valence: self.valence,
            energy: self.energy,
        }
    }
}

/// The part of a track the mood walk needs.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct MoodProjection {
    pub valence: f32,
    pub energy: f32,
}

/// Per-user scan state and projection of the user's saved library.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct UserTrackIndex {
    pub user_id: String,
    /// Offset of the next page to request from the remote library.
    pub cursor: u32,
    pub tracks: BTreeMap<String, MoodProjection>,
    pub ignored: BTreeSet<String>,
    pub completed_scan: bool,
    /// Last track of the page that completed the previous scan cycle.
    pub last_track_scanned: Option<String>,
}

impl UserTrackIndex {
    pub fn new(user_id: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            ..Default::default()
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MoodPlaylist {
    pub date: NaiveDate,
    pub tracks: Vec<String>,
    pub start_mood: f32,
    pub end_mood: f32,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Everything stored about a user, as returned by the data export.
#[derive(Clone, Debug, Serialize)]
pub struct UserDataExport {
    pub user_tracks: Option<UserTrackIndex>,
    pub mood_playlists: Vec<MoodPlaylist>,
    pub fetch_locked: bool,
}
