//! Deterministic in-process player
//!
//! Stands in for the remote video embed when mixdeck runs without one:
//! position advances on the wall clock while playing, and a controller
//! handle lets tests script load failures, provider error codes, and
//! end-of-track signals, and inspect every call the director made.

use std::sync::{Arc, Mutex};
use std::time::Instant;

use tokio::sync::mpsc;
use tracing::debug;

use super::{player_err, PlayerEvent, PlayerHandle, PlayerState};
use crate::error::Result;

/// One recorded call against a simulated player.
#[derive(Debug, Clone, PartialEq)]
pub enum PlayerCall {
    Load { track_id: String, start_seconds: f64 },
    Play,
    Pause,
    Stop,
    Seek { seconds: f64 },
    SetVolume { volume: u8 },
    Mute,
    Unmute,
}

#[derive(Debug)]
struct Inner {
    label: String,
    state: PlayerState,
    loaded_track: Option<String>,
    duration: f64,
    default_duration: f64,
    /// Position at the last play/seek/pause boundary
    position_base: f64,
    /// Set while state == Playing
    playing_since: Option<Instant>,
    volume: u8,
    muted: bool,
    fail_next_load: Option<String>,
    error_every_load: Option<u32>,
    calls: Vec<PlayerCall>,
}

impl Inner {
    fn position(&self) -> f64 {
        let elapsed = self
            .playing_since
            .map(|since| since.elapsed().as_secs_f64())
            .unwrap_or(0.0);
        let position = self.position_base + elapsed;
        if self.duration > 0.0 {
            position.min(self.duration)
        } else {
            position
        }
    }

    fn freeze_position(&mut self) {
        self.position_base = self.position();
        self.playing_since = None;
    }
}

/// In-process [`PlayerHandle`] implementation.
pub struct SimulatedPlayer {
    inner: Arc<Mutex<Inner>>,
    events: mpsc::UnboundedSender<PlayerEvent>,
}

/// Test/control handle paired with a [`SimulatedPlayer`].
#[derive(Clone)]
pub struct SimulatedPlayerController {
    inner: Arc<Mutex<Inner>>,
    events: mpsc::UnboundedSender<PlayerEvent>,
}

impl SimulatedPlayer {
    /// Create a player, its event stream, and its controller.
    pub fn new(
        label: impl Into<String>,
    ) -> (
        Self,
        mpsc::UnboundedReceiver<PlayerEvent>,
        SimulatedPlayerController,
    ) {
        let (tx, rx) = mpsc::unbounded_channel();
        let inner = Arc::new(Mutex::new(Inner {
            label: label.into(),
            state: PlayerState::Unstarted,
            loaded_track: None,
            duration: 0.0,
            default_duration: 300.0,
            position_base: 0.0,
            playing_since: None,
            volume: 100,
            muted: false,
            fail_next_load: None,
            error_every_load: None,
            calls: Vec::new(),
        }));
        let controller = SimulatedPlayerController {
            inner: Arc::clone(&inner),
            events: tx.clone(),
        };
        (
            Self {
                inner,
                events: tx,
            },
            rx,
            controller,
        )
    }

    fn emit(&self, event: PlayerEvent) {
        // Receiver gone means the director shut down; nothing to notify.
        let _ = self.events.send(event);
    }
}

impl PlayerHandle for SimulatedPlayer {
    fn load(&mut self, track_id: &str, start_seconds: f64) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.calls.push(PlayerCall::Load {
            track_id: track_id.to_string(),
            start_seconds,
        });

        if let Some(reason) = inner.fail_next_load.take() {
            return Err(player_err(format!(
                "load rejected by player {}: {}",
                inner.label, reason
            )));
        }

        // The provider accepted the load but the track itself is scripted
        // to be broken: the error event arrives instead of Cued.
        if let Some(code) = inner.error_every_load {
            debug!(player = %inner.label, track_id, code, "simulated load error");
            drop(inner);
            self.emit(PlayerEvent::Error(code));
            return Ok(());
        }

        inner.loaded_track = Some(track_id.to_string());
        inner.duration = inner.default_duration;
        inner.position_base = start_seconds;
        inner.playing_since = None;
        inner.state = PlayerState::Cued;
        debug!(player = %inner.label, track_id, start_seconds, "simulated load");
        drop(inner);

        self.emit(PlayerEvent::StateChange(PlayerState::Cued));
        Ok(())
    }

    fn play(&mut self) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.calls.push(PlayerCall::Play);
        if inner.loaded_track.is_none() {
            return Err(player_err(format!("player {} has no track", inner.label)));
        }
        if inner.state != PlayerState::Playing {
            inner.playing_since = Some(Instant::now());
            inner.state = PlayerState::Playing;
            drop(inner);
            self.emit(PlayerEvent::StateChange(PlayerState::Playing));
        }
        Ok(())
    }

    fn pause(&mut self) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.calls.push(PlayerCall::Pause);
        if inner.state == PlayerState::Playing {
            inner.freeze_position();
            inner.state = PlayerState::Paused;
            drop(inner);
            self.emit(PlayerEvent::StateChange(PlayerState::Paused));
        }
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.calls.push(PlayerCall::Stop);
        inner.freeze_position();
        inner.loaded_track = None;
        inner.position_base = 0.0;
        inner.state = PlayerState::Unstarted;
        Ok(())
    }

    fn seek_to(&mut self, seconds: f64, _allow_seek_ahead: bool) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.calls.push(PlayerCall::Seek { seconds });
        inner.position_base = seconds.max(0.0);
        if inner.state == PlayerState::Playing {
            inner.playing_since = Some(Instant::now());
        }
        Ok(())
    }

    fn set_volume(&mut self, volume: u8) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.calls.push(PlayerCall::SetVolume {
            volume: volume.min(100),
        });
        inner.volume = volume.min(100);
        Ok(())
    }

    fn mute(&mut self) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.calls.push(PlayerCall::Mute);
        inner.muted = true;
        Ok(())
    }

    fn unmute(&mut self) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.calls.push(PlayerCall::Unmute);
        inner.muted = false;
        Ok(())
    }

    fn current_time(&self) -> f64 {
        self.inner.lock().unwrap().position()
    }

    fn duration(&self) -> f64 {
        self.inner.lock().unwrap().duration
    }

    fn player_state(&self) -> PlayerState {
        self.inner.lock().unwrap().state
    }
}

impl SimulatedPlayerController {
    /// Duration reported for every subsequently loaded track.
    pub fn set_default_duration(&self, seconds: f64) {
        self.inner.lock().unwrap().default_duration = seconds;
    }

    /// Make the next `load` call return an error.
    pub fn fail_next_load(&self, reason: impl Into<String>) {
        self.inner.lock().unwrap().fail_next_load = Some(reason.into());
    }

    /// Script every subsequent `load` to raise the given provider error
    /// code instead of cueing the track.
    pub fn error_on_every_load(&self, code: u32) {
        self.inner.lock().unwrap().error_every_load = Some(code);
    }

    /// Emit a provider error event immediately.
    pub fn emit_error(&self, code: u32) {
        let _ = self.events.send(PlayerEvent::Error(code));
    }

    /// Simulate the loaded track reaching its end.
    pub fn finish_track(&self) {
        {
            let mut inner = self.inner.lock().unwrap();
            inner.freeze_position();
            if inner.duration > 0.0 {
                inner.position_base = inner.duration;
            }
            inner.state = PlayerState::Ended;
        }
        let _ = self.events.send(PlayerEvent::StateChange(PlayerState::Ended));
    }

    /// Jump the simulated position without going through the handle.
    pub fn set_position(&self, seconds: f64) {
        let mut inner = self.inner.lock().unwrap();
        inner.position_base = seconds;
        if inner.state == PlayerState::Playing {
            inner.playing_since = Some(Instant::now());
        }
    }

    /// Every call the director has made against this handle so far.
    pub fn calls(&self) -> Vec<PlayerCall> {
        self.inner.lock().unwrap().calls.clone()
    }

    /// Most recently applied volume, 0-100.
    pub fn volume(&self) -> u8 {
        self.inner.lock().unwrap().volume
    }

    /// Whether the handle is muted.
    pub fn muted(&self) -> bool {
        self.inner.lock().unwrap().muted
    }

    /// Current simulated position in seconds.
    pub fn position(&self) -> f64 {
        self.inner.lock().unwrap().position()
    }

    /// Current simulated state.
    pub fn state(&self) -> PlayerState {
        self.inner.lock().unwrap().state
    }

    /// Track id currently loaded, if any.
    pub fn loaded_track(&self) -> Option<String> {
        self.inner.lock().unwrap().loaded_track.clone()
    }
}
