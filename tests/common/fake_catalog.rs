//! In-process stand-in for the music catalog Web API
//!
//! Serves the subset of endpoints the tune server calls, backed by
//! in-memory data, so end-to-end tests exercise the real HTTP client.

use super::constants::*;
use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;

const TRACK_URI_PREFIX: &str = "spotify:track:";
const LOCAL_ENTRY_PREFIX: &str = "local:";

#[derive(Default)]
struct CatalogData {
    users_by_token: HashMap<String, String>,
    /// Saved track ids per user, newest first.
    libraries: HashMap<String, Vec<String>>,
    features: HashMap<String, (f32, f32)>,
    playlists: HashMap<String, Vec<String>>,
    next_playlist: usize,
    call_counts: HashMap<String, usize>,
}

/// Handle on the fake catalog data, shared with the serving task.
#[derive(Clone)]
pub struct FakeCatalog {
    data: Arc<Mutex<CatalogData>>,
    pub base_url: String,
}

impl FakeCatalog {
    /// Spawns the fake catalog on a random port, seeded with the scenario library.
    pub async fn spawn() -> Self {
        let data = Arc::new(Mutex::new(CatalogData::default()));
        {
            let mut data = data.lock().unwrap();
            data.users_by_token
                .insert(TEST_TOKEN.to_string(), TEST_USER_ID.to_string());
            data.users_by_token
                .insert(OTHER_TOKEN.to_string(), OTHER_USER_ID.to_string());
            let mut library = Vec::new();
            for (id, valence, energy) in SCENARIO_TRACKS {
                library.push(id.to_string());
                data.features.insert(id.to_string(), (valence, energy));
            }
            library.push(UNANALYZED_TRACK_ID.to_string());
            library.push(format!("{}{}", LOCAL_ENTRY_PREFIX, LOCAL_FILE_NAME));
            data.libraries.insert(TEST_USER_ID.to_string(), library);
        }

        let app = Router::new()
            .route("/me", get(get_me))
            .route("/me/tracks", get(get_saved_tracks))
            .route("/audio-features", get(get_audio_features))
            .route("/users/{user_id}/playlists", post(post_playlist))
            .route(
                "/playlists/{id}/tracks",
                get(get_playlist_tracks)
                    .post(add_playlist_tracks)
                    .delete(remove_playlist_tracks),
            )
            .with_state(data.clone());

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind fake catalog");
        let port = listener
            .local_addr()
            .expect("Failed to get local address")
            .port();
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("Fake catalog failed");
        });

        Self {
            data,
            base_url: format!("http://127.0.0.1:{}", port),
        }
    }

    /// Number of requests served for `endpoint` (e.g. "saved_tracks")
    pub fn get_call_count(&self, endpoint: &str) -> usize {
        *self
            .data
            .lock()
            .unwrap()
            .call_counts
            .get(endpoint)
            .unwrap_or(&0)
    }

    /// Track ids currently in the catalog playlist `playlist_id`
    pub fn playlist_tracks(&self, playlist_id: &str) -> Option<Vec<String>> {
        self.data.lock().unwrap().playlists.get(playlist_id).cloned()
    }

    /// Deletes a catalog playlist, as a user would from another app
    pub fn delete_playlist(&self, playlist_id: &str) {
        self.data.lock().unwrap().playlists.remove(playlist_id);
    }
}

type SharedData = Arc<Mutex<CatalogData>>;

fn increment_call(data: &mut CatalogData, endpoint: &str) {
    *data.call_counts.entry(endpoint.to_string()).or_insert(0) += 1;
}

fn authenticate(data: &CatalogData, headers: &HeaderMap) -> Option<String> {
    let token = headers
        .get("authorization")?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")?;
    data.users_by_token.get(token).cloned()
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({"error": {"status": 401, "message": "Invalid access token"}})),
    )
        .into_response()
}

fn not_found() -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({"error": {"status": 404, "message": "Not found."}})),
    )
        .into_response()
}

#[derive(Deserialize)]
struct Paging {
    offset: usize,
    limit: usize,
}

#[derive(Deserialize)]
struct IdsQuery {
    ids: String,
}

#[derive(Deserialize)]
struct CreatePlaylistBody {
    name: String,
}

#[derive(Deserialize)]
struct AddTracksBody {
    uris: Vec<String>,
}

#[derive(Deserialize)]
struct UriRef {
    uri: String,
}

#[derive(Deserialize)]
struct RemoveTracksBody {
    tracks: Vec<UriRef>,
}

fn strip_uri(uri: &str) -> String {
    uri.strip_prefix(TRACK_URI_PREFIX).unwrap_or(uri).to_string()
}

async fn get_me(State(data): State<SharedData>, headers: HeaderMap) -> Response {
    let mut data = data.lock().unwrap();
    increment_call(&mut data, "me");
    match authenticate(&data, &headers) {
        Some(user_id) => Json(json!({ "id": user_id })).into_response(),
        None => unauthorized(),
    }
}

async fn get_saved_tracks(
    State(data): State<SharedData>,
    headers: HeaderMap,
    Query(paging): Query<Paging>,
) -> Response {
    let mut data = data.lock().unwrap();
    increment_call(&mut data, "saved_tracks");
    let Some(user_id) = authenticate(&data, &headers) else {
        return unauthorized();
    };
    let library = data.libraries.get(&user_id).cloned().unwrap_or_default();
    let items: Vec<Value> = library
        .iter()
        .skip(paging.offset)
        .take(paging.limit)
        .map(|id| match id.strip_prefix(LOCAL_ENTRY_PREFIX) {
            Some(name) => json!({
                "added_at": "2022-01-01T00:00:00Z",
                "track": {
                    "id": null,
                    "name": name,
                    "is_local": true,
                    "album": {"id": null, "name": null, "images": []},
                    "artists": [{"id": null, "name": "The Test Band"}],
                    "available_markets": []
                }
            }),
            None => json!({
                "added_at": "2022-01-01T00:00:00Z",
                "track": {
                    "id": id,
                    "name": format!("Track {}", id),
                    "album": {
                        "id": format!("album-{}", id),
                        "images": [{"url": format!("http://img/{}", id)}]
                    },
                    "artists": [{"id": "artist-1", "name": "The Test Band"}],
                    "available_markets": ["AU", "NZ"]
                }
            }),
        })
        .collect();
    Json(json!({ "items": items, "total": library.len() })).into_response()
}

async fn get_audio_features(
    State(data): State<SharedData>,
    headers: HeaderMap,
    Query(query): Query<IdsQuery>,
) -> Response {
    let mut data = data.lock().unwrap();
    increment_call(&mut data, "audio_features");
    if authenticate(&data, &headers).is_none() {
        return unauthorized();
    }
    let features: Vec<Value> = query
        .ids
        .split(',')
        .map(|id| match data.features.get(id) {
            Some((valence, energy)) => json!({"id": id, "valence": valence, "energy": energy}),
            None => Value::Null,
        })
        .collect();
    Json(json!({ "audio_features": features })).into_response()
}

async fn post_playlist(
    State(data): State<SharedData>,
    headers: HeaderMap,
    Path(user_id): Path<String>,
    Json(body): Json<CreatePlaylistBody>,
) -> Response {
    let mut data = data.lock().unwrap();
    increment_call(&mut data, "create_playlist");
    if authenticate(&data, &headers).as_deref() != Some(user_id.as_str()) {
        return (StatusCode::FORBIDDEN, "not your account").into_response();
    }
    data.next_playlist += 1;
    let id = format!("playlist-{}", data.next_playlist);
    data.playlists.insert(id.clone(), vec![]);
    (
        StatusCode::CREATED,
        Json(json!({ "id": id, "name": body.name })),
    )
        .into_response()
}

async fn get_playlist_tracks(
    State(data): State<SharedData>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Query(paging): Query<Paging>,
) -> Response {
    let mut data = data.lock().unwrap();
    increment_call(&mut data, "playlist_tracks");
    if authenticate(&data, &headers).is_none() {
        return unauthorized();
    }
    let Some(tracks) = data.playlists.get(&id) else {
        return not_found();
    };
    let items: Vec<Value> = tracks
        .iter()
        .skip(paging.offset)
        .take(paging.limit)
        .map(|id| json!({"track": {"id": id}}))
        .collect();
    let next = if paging.offset + paging.limit < tracks.len() {
        Value::String("more".to_string())
    } else {
        Value::Null
    };
    Json(json!({ "items": items, "next": next })).into_response()
}

async fn add_playlist_tracks(
    State(data): State<SharedData>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<AddTracksBody>,
) -> Response {
    let mut data = data.lock().unwrap();
    increment_call(&mut data, "add_tracks");
    if authenticate(&data, &headers).is_none() {
        return unauthorized();
    }
    let Some(tracks) = data.playlists.get_mut(&id) else {
        return not_found();
    };
    tracks.extend(body.uris.iter().map(|uri| strip_uri(uri)));
    (StatusCode::CREATED, Json(json!({"snapshot_id": "snapshot"}))).into_response()
}

async fn remove_playlist_tracks(
    State(data): State<SharedData>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<RemoveTracksBody>,
) -> Response {
    let mut data = data.lock().unwrap();
    increment_call(&mut data, "remove_tracks");
    if authenticate(&data, &headers).is_none() {
        return unauthorized();
    }
    let Some(tracks) = data.playlists.get_mut(&id) else {
        return not_found();
    };
    let removed: Vec<String> = body.tracks.iter().map(|t| strip_uri(&t.uri)).collect();
    tracks.retain(|id| !removed.contains(id));
    Json(json!({"snapshot_id": "snapshot"})).into_response()
}
