//! HTTP request handlers

use crate::api::{ApiError, AppState};
use crate::director::{DirectorSnapshot, PlaybackIntent};
use crate::error::Error;
use crate::search::VideoHit;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Json;
use mixdeck_common::Track;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct LoadRequest {
    pub track: Track,
    #[serde(default)]
    pub resume_at: f64,
}

#[derive(Debug, Deserialize)]
pub struct SkipRequest {
    #[serde(default = "default_true")]
    pub use_crossfade: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize)]
pub struct SeekRequest {
    pub position: f64,
}

#[derive(Debug, Deserialize)]
pub struct VolumeRequest {
    pub level: u8, // 0-100 user-facing scale
}

#[derive(Debug, Deserialize)]
pub struct MuteRequest {
    pub muted: bool,
}

#[derive(Debug, Deserialize)]
pub struct UpcomingRequest {
    #[serde(default)]
    pub next: Option<Track>,
    #[serde(default)]
    pub previous: Option<Track>,
}

#[derive(Debug, Deserialize)]
pub struct RoleRequest {
    pub authority: bool,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: String,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub results: Vec<VideoHit>,
}

// ============================================================================
// Handlers
// ============================================================================

pub async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "module": "mixdeck-pd",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

pub async fn get_state(State(state): State<AppState>) -> Json<DirectorSnapshot> {
    Json(state.director.snapshot().await)
}

pub async fn load(
    State(state): State<AppState>,
    Json(req): Json<LoadRequest>,
) -> Result<StatusCode, ApiError> {
    if req.track.id.is_empty() {
        return Err(Error::BadRequest("track id must not be empty".to_string()).into());
    }
    state.director.dispatch(PlaybackIntent::LoadSong {
        track: req.track,
        resume_at: req.resume_at,
    })?;
    Ok(StatusCode::ACCEPTED)
}

pub async fn play(State(state): State<AppState>) -> Result<StatusCode, ApiError> {
    state.director.dispatch(PlaybackIntent::Play)?;
    Ok(StatusCode::ACCEPTED)
}

pub async fn pause(State(state): State<AppState>) -> Result<StatusCode, ApiError> {
    state.director.dispatch(PlaybackIntent::Pause)?;
    Ok(StatusCode::ACCEPTED)
}

pub async fn next(
    State(state): State<AppState>,
    Json(req): Json<SkipRequest>,
) -> Result<StatusCode, ApiError> {
    state.director.dispatch(PlaybackIntent::SkipNext {
        use_crossfade: req.use_crossfade,
    })?;
    Ok(StatusCode::ACCEPTED)
}

pub async fn previous(
    State(state): State<AppState>,
    Json(req): Json<SkipRequest>,
) -> Result<StatusCode, ApiError> {
    state.director.dispatch(PlaybackIntent::SkipPrevious {
        use_crossfade: req.use_crossfade,
    })?;
    Ok(StatusCode::ACCEPTED)
}

pub async fn crossfade(State(state): State<AppState>) -> Result<StatusCode, ApiError> {
    state.director.dispatch(PlaybackIntent::CrossfadeToNext)?;
    Ok(StatusCode::ACCEPTED)
}

pub async fn seek(
    State(state): State<AppState>,
    Json(req): Json<SeekRequest>,
) -> Result<StatusCode, ApiError> {
    if !req.position.is_finite() || req.position < 0.0 {
        return Err(Error::BadRequest("position must be a non-negative number".to_string()).into());
    }
    state.director.dispatch(PlaybackIntent::Seek {
        position: req.position,
    })?;
    Ok(StatusCode::ACCEPTED)
}

pub async fn reset(State(state): State<AppState>) -> Result<StatusCode, ApiError> {
    state.director.dispatch(PlaybackIntent::ResetTrack)?;
    Ok(StatusCode::ACCEPTED)
}

pub async fn volume(
    State(state): State<AppState>,
    Json(req): Json<VolumeRequest>,
) -> Result<StatusCode, ApiError> {
    if req.level > 100 {
        return Err(Error::BadRequest("volume must be 0-100".to_string()).into());
    }
    state
        .director
        .dispatch(PlaybackIntent::SetVolume { level: req.level })?;
    Ok(StatusCode::ACCEPTED)
}

pub async fn mute(
    State(state): State<AppState>,
    Json(req): Json<MuteRequest>,
) -> Result<StatusCode, ApiError> {
    state
        .director
        .dispatch(PlaybackIntent::Mute { muted: req.muted })?;
    Ok(StatusCode::ACCEPTED)
}

pub async fn upcoming(
    State(state): State<AppState>,
    Json(req): Json<UpcomingRequest>,
) -> Result<StatusCode, ApiError> {
    state.director.dispatch(PlaybackIntent::SetUpcoming {
        next: req.next,
        previous: req.previous,
    })?;
    Ok(StatusCode::ACCEPTED)
}

pub async fn role(
    State(state): State<AppState>,
    Json(req): Json<RoleRequest>,
) -> Result<StatusCode, ApiError> {
    state.director.dispatch(PlaybackIntent::SetRole {
        authority: req.authority,
    })?;
    Ok(StatusCode::ACCEPTED)
}

pub async fn search(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<SearchResponse>, ApiError> {
    let Some(client) = state.search.as_ref() else {
        return Err(Error::Search("search is not configured".to_string()).into());
    };
    if query.q.trim().is_empty() {
        return Err(Error::BadRequest("query must not be empty".to_string()).into());
    }
    let results = client.search(&query.q).await?;
    Ok(Json(SearchResponse { results }))
}
