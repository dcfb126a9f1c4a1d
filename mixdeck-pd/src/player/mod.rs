//! Player handle capability
//!
//! The Play Director treats "the player" as an opaque remote media object:
//! two instances (slots A and B) exist at all times, exclusively owned by
//! the director. This module defines the capability surface the video-embed
//! collaborator must provide, the asynchronous events it delivers, and the
//! classification of its numeric error codes.

pub mod simulated;

use crate::error::{Error, Result};
use mixdeck_common::events::PlayerSlot;
use serde::{Deserialize, Serialize};

pub use simulated::SimulatedPlayer;

/// Remote player states as reported by the embed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlayerState {
    Unstarted,
    Ended,
    Playing,
    Paused,
    Buffering,
    Cued,
}

/// Asynchronous notifications from one player slot.
///
/// Delivered on the per-slot event channel the director owns; the director
/// is the only consumer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayerEvent {
    /// Player state changed (Ended signals end-of-track)
    StateChange(PlayerState),
    /// Player reported an error with a provider-specific numeric code
    Error(u32),
}

/// What a numeric player error code means for playback policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerErrorKind {
    /// Malformed or unknown track id: skip immediately, no retry
    InvalidTrackId,
    /// Transient playback failure: retry a bounded number of times
    Recoverable,
    /// Track unavailable or embedding blocked: skip immediately, no retry
    Unavailable,
    /// Unclassified code: log only, may be transient
    Unknown,
}

/// Classify a provider error code into playback policy.
///
/// Codes follow the embed's published meanings: 2 (invalid parameter) and
/// 100 (not found) are permanent id problems, 5 is a recoverable HTML5
/// playback error, 101/150 mean embedding is disabled for the track.
pub fn classify_error_code(code: u32) -> PlayerErrorKind {
    match code {
        2 | 100 => PlayerErrorKind::InvalidTrackId,
        5 => PlayerErrorKind::Recoverable,
        101 | 150 => PlayerErrorKind::Unavailable,
        _ => PlayerErrorKind::Unknown,
    }
}

/// Opaque remote media object.
///
/// All mutating calls are fire-and-continue: completion and failures are
/// observed through [`PlayerEvent`]s, never by polling inside a call. A
/// returned `Err` means the handle itself rejected the operation (e.g. not
/// initialized), which the dispatcher treats as an internal error.
///
/// `Sync` is required because the dispatcher task reads handles across
/// await points while running on the multi-threaded runtime.
pub trait PlayerHandle: Send + Sync {
    /// Load a track and begin buffering at `start_seconds`.
    fn load(&mut self, track_id: &str, start_seconds: f64) -> Result<()>;

    /// Begin or resume playback.
    fn play(&mut self) -> Result<()>;

    /// Pause playback, keeping position.
    fn pause(&mut self) -> Result<()>;

    /// Stop playback and release the loaded track (best effort).
    fn stop(&mut self) -> Result<()>;

    /// Seek to an absolute position in seconds.
    fn seek_to(&mut self, seconds: f64, allow_seek_ahead: bool) -> Result<()>;

    /// Set output volume, 0-100.
    fn set_volume(&mut self, volume: u8) -> Result<()>;

    /// Mute audio output without changing the stored volume.
    fn mute(&mut self) -> Result<()>;

    /// Restore audio output at the stored volume.
    fn unmute(&mut self) -> Result<()>;

    /// Current playback position in seconds.
    fn current_time(&self) -> f64;

    /// Duration of the loaded track in seconds (0 = unknown).
    fn duration(&self) -> f64;

    /// Current remote player state.
    fn player_state(&self) -> PlayerState;
}

/// The pair of player handles owned by a director, indexed by slot.
pub struct PlayerPair {
    a: Box<dyn PlayerHandle>,
    b: Box<dyn PlayerHandle>,
}

impl PlayerPair {
    pub fn new(a: Box<dyn PlayerHandle>, b: Box<dyn PlayerHandle>) -> Self {
        Self { a, b }
    }

    /// Mutable access to one slot's handle.
    pub fn slot_mut(&mut self, slot: PlayerSlot) -> &mut dyn PlayerHandle {
        match slot {
            PlayerSlot::A => self.a.as_mut(),
            PlayerSlot::B => self.b.as_mut(),
        }
    }

    /// Shared access to one slot's handle.
    pub fn slot(&self, slot: PlayerSlot) -> &dyn PlayerHandle {
        match slot {
            PlayerSlot::A => self.a.as_ref(),
            PlayerSlot::B => self.b.as_ref(),
        }
    }
}

impl std::fmt::Debug for PlayerPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlayerPair")
            .field("a_state", &self.a.player_state())
            .field("b_state", &self.b.player_state())
            .finish()
    }
}

/// Convenience constructor for player rejection errors.
pub(crate) fn player_err(message: impl Into<String>) -> Error {
    Error::Player(message.into())
}
