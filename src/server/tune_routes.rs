//! Routes of the tune API, mounted under `/v1/tune`.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::error;

use super::session::Session;
use super::state::{GuardedTuneService, ServerState};
use crate::tune::{MoodCategory, TuneError};
use crate::tune_store::{parse_date, ArtistRef, MoodPlaylist, Track};

impl IntoResponse for TuneError {
    fn into_response(self) -> Response {
        match self {
            TuneError::NotFound(what) => {
                (StatusCode::NOT_FOUND, Json(ErrorBody::not_found(&what))).into_response()
            }
            err => {
                let correlation_id = uuid::Uuid::new_v4().to_string();
                error!("[{}] Request failed: {:#}", correlation_id, err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ErrorBody {
                        error: "internal error".to_string(),
                        correlation_id: Some(correlation_id),
                    }),
                )
                    .into_response()
            }
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    correlation_id: Option<String>,
}

impl ErrorBody {
    fn not_found(what: &str) -> Self {
        Self {
            error: format!("not found: {}", what),
            correlation_id: None,
        }
    }

    fn bad_request(reason: &str) -> Self {
        Self {
            error: reason.to_string(),
            correlation_id: None,
        }
    }
}

fn bad_request(reason: &str) -> Response {
    (StatusCode::BAD_REQUEST, Json(ErrorBody::bad_request(reason))).into_response()
}

fn parse_date_param(s: &str) -> Result<NaiveDate, Response> {
    parse_date(s).ok_or_else(|| bad_request("date must be formatted as YYYY-MM-DD"))
}

#[derive(Deserialize, Debug)]
struct GeneratePlaylistBody {
    pub mood: f32,
    pub date: Option<String>,
    pub note: Option<String>,
}

#[derive(Serialize, Debug)]
struct PlaylistSummary {
    pub date: NaiveDate,
    pub start_mood: f32,
    pub end_mood: f32,
    pub note: Option<String>,
    pub track_count: usize,
    pub created_at: DateTime<Utc>,
}

impl From<MoodPlaylist> for PlaylistSummary {
    fn from(playlist: MoodPlaylist) -> Self {
        Self {
            date: playlist.date,
            start_mood: playlist.start_mood,
            end_mood: playlist.end_mood,
            note: playlist.note,
            track_count: playlist.tracks.len(),
            created_at: playlist.created_at,
        }
    }
}

#[derive(Serialize, Debug)]
struct ResolvedTrack {
    pub id: String,
    pub name: String,
    pub valence: f32,
    pub energy: f32,
    pub mood: MoodCategory,
    pub album_id: String,
    pub album_art_url: Option<String>,
    pub artists: Vec<ArtistRef>,
}

impl From<Track> for ResolvedTrack {
    fn from(track: Track) -> Self {
        Self {
            mood: track.mood(),
            id: track.id,
            name: track.name,
            valence: track.valence,
            energy: track.energy,
            album_id: track.album_id,
            album_art_url: track.album_art_url,
            artists: track.artists,
        }
    }
}

#[derive(Serialize, Debug)]
struct ResolvedPlaylist {
    pub date: NaiveDate,
    pub start_mood: f32,
    pub end_mood: f32,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub tracks: Vec<ResolvedTrack>,
}

#[derive(Serialize, Debug)]
struct SyncedPlaylist {
    pub remote_playlist_id: String,
}

#[derive(Serialize, Debug)]
struct RemotePlaylist {
    pub remote_playlist_id: Option<String>,
}

async fn post_index(session: Session, State(tune): State<GuardedTuneService>) -> Response {
    match tune
        .ensure_indexed(session.client.as_ref(), &session.user_id)
        .await
    {
        Ok(report) => Json(report).into_response(),
        Err(err) => err.into_response(),
    }
}

async fn post_playlist(
    session: Session,
    State(tune): State<GuardedTuneService>,
    Json(body): Json<GeneratePlaylistBody>,
) -> Response {
    if !body.mood.is_finite() {
        return bad_request("mood must be a finite number");
    }
    let date = match body.date.as_deref() {
        Some(s) => match parse_date_param(s) {
            Ok(date) => date,
            Err(response) => return response,
        },
        None => Utc::now().date_naive(),
    };

    match tune
        .generate_mood_playlist(
            session.client.as_ref(),
            &session.user_id,
            body.mood,
            date,
            body.note,
        )
        .await
    {
        Ok(playlist) => (StatusCode::CREATED, Json(playlist)).into_response(),
        Err(err) => err.into_response(),
    }
}

async fn get_playlists(session: Session, State(tune): State<GuardedTuneService>) -> Response {
    match tune.get_playlists(&session.user_id) {
        Ok(playlists) => Json(
            playlists
                .into_iter()
                .map(PlaylistSummary::from)
                .collect::<Vec<_>>(),
        )
        .into_response(),
        Err(err) => err.into_response(),
    }
}

async fn get_playlist(
    session: Session,
    State(tune): State<GuardedTuneService>,
    Path(date): Path<String>,
) -> Response {
    let date = match parse_date_param(&date) {
        Ok(date) => date,
        Err(response) => return response,
    };
    let resolved = tune.get_playlist(&session.user_id, date).and_then(|playlist| {
        let tracks = tune.get_tracks(&playlist.tracks)?;
        Ok(ResolvedPlaylist {
            date: playlist.date,
            start_mood: playlist.start_mood,
            end_mood: playlist.end_mood,
            note: playlist.note,
            created_at: playlist.created_at,
            tracks: tracks.into_iter().map(ResolvedTrack::from).collect(),
        })
    });
    match resolved {
        Ok(playlist) => Json(playlist).into_response(),
        Err(err) => err.into_response(),
    }
}

async fn post_playlist_sync(
    session: Session,
    State(tune): State<GuardedTuneService>,
    Path(date): Path<String>,
) -> Response {
    let date = match parse_date_param(&date) {
        Ok(date) => date,
        Err(response) => return response,
    };
    match tune
        .sync_remote_playlist(session.client.as_ref(), &session.user_id, date)
        .await
    {
        Ok(remote_playlist_id) => Json(SyncedPlaylist { remote_playlist_id }).into_response(),
        Err(err) => err.into_response(),
    }
}

async fn get_removed_tracks(
    session: Session,
    State(tune): State<GuardedTuneService>,
) -> Response {
    let resolved = tune
        .removed_tracks(&session.user_id)
        .and_then(|ids| tune.get_tracks(&ids));
    match resolved {
        Ok(tracks) => Json(
            tracks
                .into_iter()
                .map(ResolvedTrack::from)
                .collect::<Vec<_>>(),
        )
        .into_response(),
        Err(err) => err.into_response(),
    }
}

async fn delete_track(
    session: Session,
    State(tune): State<GuardedTuneService>,
    Path(id): Path<String>,
) -> Response {
    match tune.remove_track(&session.user_id, &id) {
        Ok(()) => StatusCode::OK.into_response(),
        Err(err) => err.into_response(),
    }
}

async fn post_track(
    session: Session,
    State(tune): State<GuardedTuneService>,
    Path(id): Path<String>,
) -> Response {
    match tune.unremove_track(&session.user_id, &id) {
        Ok(()) => StatusCode::OK.into_response(),
        Err(err) => err.into_response(),
    }
}

async fn get_user_data(session: Session, State(tune): State<GuardedTuneService>) -> Response {
    match tune.export_user_data(&session.user_id) {
        Ok(export) => Json(export).into_response(),
        Err(err) => err.into_response(),
    }
}

async fn delete_user_data(session: Session, State(tune): State<GuardedTuneService>) -> Response {
    match tune.clear_user_data(&session.user_id) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => err.into_response(),
    }
}

async fn get_remote_playlist(
    session: Session,
    State(tune): State<GuardedTuneService>,
) -> Response {
    match tune.remote_playlist_id(&session.user_id) {
        Ok(remote_playlist_id) => Json(RemotePlaylist { remote_playlist_id }).into_response(),
        Err(err) => err.into_response(),
    }
}

pub fn make_tune_routes(state: ServerState) -> Router {
    Router::new()
        .route("/index", post(post_index))
        .route("/playlist", post(post_playlist))
        .route("/playlists", get(get_playlists))
        .route("/playlist/{date}", get(get_playlist))
        .route("/playlist/{date}/sync", post(post_playlist_sync))
        .route("/removed", get(get_removed_tracks))
        .route("/track/{id}", post(post_track).delete(delete_track))
        .route("/data", get(get_user_data).delete(delete_user_data))
        .route("/remote_playlist", get(get_remote_playlist))
        .with_state(state)
}
