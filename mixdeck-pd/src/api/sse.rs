//! Server-Sent Events stream
//!
//! Forwards the director's event bus to connected clients. Lagged receivers
//! lose events silently; the snapshot endpoint exists for resynchronization.

use crate::api::AppState;
use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::{Stream, StreamExt};
use mixdeck_common::PartyEvent;
use std::convert::Infallible;
use std::time::Duration;
use tokio_stream::wrappers::BroadcastStream;
use tracing::{debug, warn};

/// GET /events - SSE event stream
pub async fn event_stream(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    debug!("new SSE client connected");
    let rx = state.director.subscribe();

    let stream = BroadcastStream::new(rx).filter_map(|result| async move {
        match result {
            Ok(event) => match serde_json::to_string(&event) {
                Ok(json) => Some(Ok(Event::default().event(event_type(&event)).data(json))),
                Err(e) => {
                    warn!("failed to serialize event: {}", e);
                    None
                }
            },
            Err(e) => {
                warn!("SSE stream error: {:?}", e);
                None
            }
        }
    });

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

fn event_type(event: &PartyEvent) -> &'static str {
    match event {
        PartyEvent::StateChanged { .. } => "StateChanged",
        PartyEvent::TrackLoaded { .. } => "TrackLoaded",
        PartyEvent::TrackEnded { .. } => "TrackEnded",
        PartyEvent::PositionUpdate { .. } => "PositionUpdate",
        PartyEvent::CrossfadeStarted { .. } => "CrossfadeStarted",
        PartyEvent::CrossfadeCompleted { .. } => "CrossfadeCompleted",
        PartyEvent::DriftCorrected { .. } => "DriftCorrected",
        PartyEvent::VolumeChanged { .. } => "VolumeChanged",
        PartyEvent::RoleChanged { .. } => "RoleChanged",
        PartyEvent::PlaybackError { .. } => "PlaybackError",
    }
}
