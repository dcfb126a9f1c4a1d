//! Core value types shared across mixdeck modules.

use serde::{Deserialize, Serialize};

/// Playback state of a Play Director instance.
///
/// Exactly one authority instance holds this state per playback device.
/// `Error` is recoverable: a new load intent re-enters `Preparing`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PlaybackState {
    /// No track loaded, waiting
    Idle,
    /// Loading a track, setting up the player handle
    Preparing,
    /// Active playback in progress
    Playing,
    /// Crossfade transition in progress
    Xfading,
    /// Paused by user action
    Paused,
    /// Error state, requires a fresh load to recover
    Error,
}

impl std::fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PlaybackState::Idle => "IDLE",
            PlaybackState::Preparing => "PREPARING",
            PlaybackState::Playing => "PLAYING",
            PlaybackState::Xfading => "XFADING",
            PlaybackState::Paused => "PAUSED",
            PlaybackState::Error => "ERROR",
        };
        f.write_str(s)
    }
}

/// A queued track as the queue layer hands it to the playback core.
///
/// Immutable once enqueued; vote counters and queue ordering live outside
/// this crate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    /// Provider-scoped track/video id
    pub id: String,
    /// Display title
    pub title: String,
    /// Artist or channel name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artist: Option<String>,
    /// Thumbnail URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
    /// Duration in seconds (0 = unknown)
    #[serde(default)]
    pub duration: f64,
    /// Who added the track
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub added_by: Option<String>,
}

impl Track {
    /// Minimal constructor for a track with a known duration.
    pub fn new(id: impl Into<String>, title: impl Into<String>, duration: f64) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            artist: None,
            thumbnail_url: None,
            duration,
            added_by: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_playback_state_serde_round_trip() {
        let json = serde_json::to_string(&PlaybackState::Xfading).unwrap();
        assert_eq!(json, "\"XFADING\"");
        let back: PlaybackState = serde_json::from_str(&json).unwrap();
        assert_eq!(back, PlaybackState::Xfading);
    }

    #[test]
    fn test_track_optional_fields_default() {
        let track: Track = serde_json::from_str(r#"{"id":"abc123","title":"Song"}"#).unwrap();
        assert_eq!(track.duration, 0.0);
        assert!(track.artist.is_none());
    }
}
