mod models;
mod store;

pub use models::{
    format_date, parse_date, ArtistRef, MoodPlaylist, MoodProjection, Track, UserDataExport,
    UserTrackIndex, DATE_FORMAT,
};
pub use store::TuneStore;
