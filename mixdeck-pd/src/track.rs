//! Track runtime bookkeeping
//!
//! A `TrackRuntime` pairs a queued track with the metadata of one playback
//! instance. The runtime id is freshly generated on every (re)load, never
//! reused across replays of the same track, so stale timers and player
//! events referencing an old instance can be detected and dropped.

use chrono::{DateTime, Utc};
use mixdeck_common::Track;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One playback instance of a track.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackRuntime {
    /// The queued track being played
    pub track: Track,
    /// Unique token for this playback instance
    pub runtime_id: Uuid,
    /// Start offset in seconds (0 for fresh plays)
    pub resume_at: f64,
    /// Last position observed on the active handle
    pub last_known_position: f64,
    /// When playback of this instance started
    pub started_at: DateTime<Utc>,
    /// When this instance was loaded into a handle
    pub loaded_at: DateTime<Utc>,
}

impl TrackRuntime {
    /// Create a runtime for a fresh or resumed play.
    pub fn new(track: Track, start_at: f64) -> Self {
        let now = Utc::now();
        Self {
            track,
            runtime_id: Uuid::new_v4(),
            resume_at: start_at,
            last_known_position: start_at,
            started_at: now,
            loaded_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track() -> Track {
        Track::new("vid-1", "Test Song", 180.0)
    }

    #[test]
    fn test_new_runtime_starts_at_offset() {
        let runtime = TrackRuntime::new(track(), 37.5);
        assert_eq!(runtime.resume_at, 37.5);
        assert_eq!(runtime.last_known_position, 37.5);
    }

    #[test]
    fn test_replay_of_same_track_gets_new_id() {
        let first = TrackRuntime::new(track(), 0.0);
        let replay = TrackRuntime::new(first.track.clone(), 0.0);
        assert_ne!(first.runtime_id, replay.runtime_id);
    }
}
