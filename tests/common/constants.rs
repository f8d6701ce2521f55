//! Shared constants for end-to-end tests
//!
//! This module contains all constants used across the test suite.
//! When test data changes (tokens, library content, etc.),
//! update only this file.

// ============================================================================
// Catalog Users
// ============================================================================

/// Access token the fake catalog maps to [`TEST_USER_ID`]
pub const TEST_TOKEN: &str = "token-paul";

/// Catalog user owning the scenario library
pub const TEST_USER_ID: &str = "paul";

/// Access token of a second user with an empty library
pub const OTHER_TOKEN: &str = "token-ringo";

/// Catalog user behind [`OTHER_TOKEN`]
pub const OTHER_USER_ID: &str = "ringo";

/// Token the fake catalog does not know
pub const UNKNOWN_TOKEN: &str = "token-nobody";

// ============================================================================
// Scenario Library
// ============================================================================

/// Saved tracks of [`TEST_USER_ID`] as (id, valence, energy), newest first
pub const SCENARIO_TRACKS: [(&str, f32, f32); 3] =
    [("me", 0.5, 0.5), ("hire", 0.3, 0.4), ("please", 0.2, 0.6)];

/// Saved track with no audio analysis in the fake catalog
pub const UNANALYZED_TRACK_ID: &str = "demo-tape";

/// Local file at the end of the saved library; the catalog reports it with null ids
pub const LOCAL_FILE_NAME: &str = "Garage Rehearsal";

/// Date used for generated playlists
pub const PLAYLIST_DATE: &str = "2022-01-06";

// ============================================================================
// Timeouts
// ============================================================================

/// Maximum time to wait for the server to become ready (milliseconds)
pub const SERVER_READY_TIMEOUT_MS: u64 = 5000;

/// Interval between readiness polls (milliseconds)
pub const SERVER_READY_POLL_INTERVAL_MS: u64 = 20;

/// Per-request timeout of the test client (seconds)
pub const REQUEST_TIMEOUT_SECS: u64 = 10;
