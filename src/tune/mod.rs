//! Mood-based playlist generation over a user's saved library.

mod error;
mod ingestion;
pub mod mood;
mod mood_walk;
mod service;

pub use error::{TuneError, TuneResult};
pub use ingestion::{IngestionConfig, IngestionReport, LibraryIngestor};
pub use mood::{Category, EnergyCategory, MoodCategory};
pub use mood_walk::{walk, PlaylistConfig, PlaylistGenerator, WalkEntry, WalkOutcome};
pub use service::{TuneService, TuneServiceConfig};
