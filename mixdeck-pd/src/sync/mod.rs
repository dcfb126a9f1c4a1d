//! Session sync protocol
//!
//! The authority device publishes a whole-document `SessionToken` after every
//! state-affecting change and once per broadcast tick. Followers subscribe to
//! the store, apply tokens idempotently, and estimate the authority's current
//! position from the token's epoch timestamp without any clock exchange.
//! The epoch is shifted back by the position at publish time, so the
//! expected position is simply the age of the epoch:
//!
//! ```text
//! expected = (now_ms - epoch_ms) / 1000
//! ```
//!
//! Delivery is at-least-once and the store echoes a device's own writes back
//! to it, so consumers must fence out echoes, duplicates, and reordered
//! tokens (see the dispatcher's token handling).

pub mod memory;

pub use memory::MemoryStore;

use crate::error::Result;
use async_trait::async_trait;
use mixdeck_common::Track;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Whole-document playback session state, as published to the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionToken {
    /// Regenerated on every state-affecting change; never reused
    pub session_id: Uuid,
    /// Device currently acting as the playback authority
    pub playback_device_id: String,
    /// Device currently holding DJ control
    pub dj_id: String,
    /// Track the authority is playing, if any
    pub current_track: Option<Track>,
    /// Whether the authority is actually playing (Xfading counts)
    pub is_playing: bool,
    /// Authority's playback position at `epoch_ms`, in seconds
    pub position_at_epoch: f64,
    /// Wall-clock milliseconds when `position_at_epoch` was sampled,
    /// shifted so that `epoch_ms = now_ms - position * 1000`
    pub epoch_ms: i64,
    /// Wall-clock milliseconds of the publish itself. Strictly increasing
    /// per device; lets consumers drop reordered deliveries (`epoch_ms` is
    /// nearly constant during continuous playback and cannot order tokens).
    pub published_at_ms: i64,
}

impl SessionToken {
    /// Position the publishing device should be at right now, assuming
    /// uninterrupted playback since the token was sampled.
    ///
    /// `epoch_ms` already encodes the sampled position (it is the publish
    /// instant shifted back by `position * 1000`), so the expected position
    /// is the epoch's age alone. Adding `position_at_epoch` on top would
    /// count the position twice.
    pub fn expected_position(&self, now_ms: i64) -> f64 {
        (now_ms - self.epoch_ms) as f64 / 1000.0
    }
}

/// Distribution channel for session tokens.
///
/// Publish replaces the whole session document. Subscribe yields every
/// published token at least once, including the subscriber's own writes.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn publish(&self, token: SessionToken) -> Result<()>;

    fn subscribe(&self) -> broadcast::Receiver<SessionToken>;
}
