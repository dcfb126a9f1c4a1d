//! HTTP control surface
//!
//! Thin layer over the director: every POST maps onto exactly one intent,
//! queries read the shared snapshot, and `/events` streams the event bus
//! over SSE. No playback logic lives here.

pub mod handlers;
pub mod sse;

use crate::director::Director;
use crate::error::Error;
use crate::search::SearchClient;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::Router;
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

/// State shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub director: Director,
    pub search: Option<Arc<SearchClient>>,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/playback/state", get(handlers::get_state))
        .route("/playback/load", post(handlers::load))
        .route("/playback/play", post(handlers::play))
        .route("/playback/pause", post(handlers::pause))
        .route("/playback/next", post(handlers::next))
        .route("/playback/previous", post(handlers::previous))
        .route("/playback/crossfade", post(handlers::crossfade))
        .route("/playback/seek", post(handlers::seek))
        .route("/playback/reset", post(handlers::reset))
        .route("/playback/volume", post(handlers::volume))
        .route("/playback/mute", post(handlers::mute))
        .route("/playback/upcoming", post(handlers::upcoming))
        .route("/playback/role", post(handlers::role))
        .route("/events", get(sse::event_stream))
        .route("/search", get(handlers::search))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Bind and serve until the shutdown future resolves.
pub async fn serve(
    bind_addr: &str,
    state: AppState,
    shutdown: impl std::future::Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    let app = create_router(state);
    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    info!("HTTP server listening on {}", bind_addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;
    Ok(())
}

/// Maps crate errors onto HTTP responses.
pub struct ApiError(pub Error);

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            Error::BadRequest(_) => StatusCode::BAD_REQUEST,
            Error::InvalidState(_) => StatusCode::CONFLICT,
            Error::Search(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}
