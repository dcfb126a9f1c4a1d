//! Event types and event bus for mixdeck
//!
//! Every observable side effect of the Play Director is announced as a
//! `PartyEvent` on the `EventBus`. UI layers (HTTP/SSE, local renderers)
//! subscribe here; nothing subscribes by registering raw callbacks, so a
//! dropped receiver can never leak across room lifecycles.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::types::PlaybackState;

/// Which of the two player slots an event refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlayerSlot {
    A,
    B,
}

impl PlayerSlot {
    /// The opposite slot.
    pub fn other(self) -> Self {
        match self {
            PlayerSlot::A => PlayerSlot::B,
            PlayerSlot::B => PlayerSlot::A,
        }
    }
}

impl std::fmt::Display for PlayerSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlayerSlot::A => f.write_str("A"),
            PlayerSlot::B => f.write_str("B"),
        }
    }
}

/// Events broadcast by the Play Director.
///
/// Serializable so the SSE layer can forward them to connected views
/// without translation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum PartyEvent {
    /// Playback state machine transitioned
    StateChanged {
        old_state: PlaybackState,
        new_state: PlaybackState,
        timestamp: DateTime<Utc>,
    },

    /// A track was loaded into a player slot
    TrackLoaded {
        runtime_id: Uuid,
        track_id: String,
        title: String,
        slot: PlayerSlot,
        resume_at: f64,
        timestamp: DateTime<Utc>,
    },

    /// The current track finished (natural end, completed crossfade, or
    /// skip). The queue layer reacts by feeding the next candidates.
    TrackEnded {
        runtime_id: Uuid,
        /// False for natural completion, true when a skip/error cut it short
        skipped: bool,
        timestamp: DateTime<Utc>,
    },

    /// Periodic position report from the authority device
    PositionUpdate {
        runtime_id: Uuid,
        position: f64,
        duration: f64,
        timestamp: DateTime<Utc>,
    },

    /// Volume ramp between the two slots started
    CrossfadeStarted {
        from_slot: PlayerSlot,
        to_slot: PlayerSlot,
        duration: f64,
        timestamp: DateTime<Utc>,
    },

    /// Volume ramp completed and the active slot flipped
    CrossfadeCompleted {
        active_slot: PlayerSlot,
        timestamp: DateTime<Utc>,
    },

    /// Follower corrected local position against the published signal
    DriftCorrected {
        drift: f64,
        corrected_to: f64,
        timestamp: DateTime<Utc>,
    },

    /// Volume or mute changed
    VolumeChanged {
        level: u8,
        muted: bool,
        timestamp: DateTime<Utc>,
    },

    /// Authority role assigned to or removed from this device
    RoleChanged {
        is_authority: bool,
        timestamp: DateTime<Utc>,
    },

    /// A playback error surfaced to the caller
    PlaybackError {
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        code: Option<u32>,
        timestamp: DateTime<Utc>,
    },
}

/// One-to-many event broadcasting for mixdeck components.
///
/// Thin wrapper over `tokio::sync::broadcast`; emitting with no subscribers
/// is not an error.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<PartyEvent>,
}

impl EventBus {
    /// Create a bus buffering up to `capacity` events per subscriber.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Subscribe to all future events.
    pub fn subscribe(&self) -> broadcast::Receiver<PartyEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers. No receivers is OK.
    pub fn emit(&self, event: PartyEvent) {
        let _ = self.tx.send(event);
    }

    /// Number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_emit_without_subscribers_is_ok() {
        let bus = EventBus::new(16);
        bus.emit(PartyEvent::VolumeChanged {
            level: 80,
            muted: false,
            timestamp: Utc::now(),
        });
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_subscriber_receives_event() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();

        bus.emit(PartyEvent::RoleChanged {
            is_authority: true,
            timestamp: Utc::now(),
        });

        match rx.recv().await.unwrap() {
            PartyEvent::RoleChanged { is_authority, .. } => assert!(is_authority),
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_event_serializes_with_type_tag() {
        let event = PartyEvent::StateChanged {
            old_state: PlaybackState::Idle,
            new_state: PlaybackState::Preparing,
            timestamp: Utc::now(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "StateChanged");
        assert_eq!(json["new_state"], "PREPARING");
    }

    #[test]
    fn test_slot_other() {
        assert_eq!(PlayerSlot::A.other(), PlayerSlot::B);
        assert_eq!(PlayerSlot::B.other(), PlayerSlot::A);
    }
}
