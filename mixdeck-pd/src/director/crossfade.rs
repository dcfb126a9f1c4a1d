//! Transition engine
//!
//! Crossfades are linear volume ramps between the two player slots, driven
//! by a 50 ms tick. At most one ramp exists at a time; the active slot flips
//! exactly once, on the final tick (or immediately for a hard cut). A ramp
//! never survives a seek, a skip, or a transition into Idle/Preparing/Error.

use crate::director::core::DirectorCore;
use crate::director::Command;
use crate::error::{Error, Result};
use crate::track::TrackRuntime;
use chrono::Utc;
use mixdeck_common::events::PlayerSlot;
use mixdeck_common::{PartyEvent, PlaybackState, Track};
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Tick period of the volume ramp.
pub(crate) const RAMP_STEP_MS: u64 = 50;

/// Linear ramp volumes at `step` of `steps` toward `target`:
/// outgoing `max(0, V*(1-p))`, incoming `min(V, V*p)`.
pub(crate) fn ramp_volumes(target: u8, step: u32, steps: u32) -> (u8, u8) {
    let progress = step as f64 / steps as f64;
    let t = target as f64;
    let outgoing = (t * (1.0 - progress)).max(0.0).round() as u8;
    let incoming = (t * progress).min(t).round() as u8;
    (outgoing, incoming)
}

/// State of the single in-flight crossfade ramp.
#[derive(Debug)]
pub(crate) struct RampState {
    /// Tags the ticks of this ramp; ticks with another id are stale
    pub(crate) ramp_id: u64,
    pub(crate) step: u32,
    pub(crate) steps: u32,
    /// Slot the new track is ramping up on
    pub(crate) incoming_slot: PlayerSlot,
    /// True when a manual skip started the ramp (reported on TrackEnded)
    pub(crate) manual: bool,
}

impl DirectorCore {
    /// Begin a crossfade to `track` over `duration` seconds.
    ///
    /// Duration 0 (or less) degrades to a hard cut. A second crossfade while
    /// one is running is rejected; callers that must preempt (manual skip)
    /// abort the ramp first.
    pub(crate) async fn start_crossfade(
        &mut self,
        track: Track,
        duration: f64,
        manual: bool,
    ) -> Result<()> {
        if duration <= 0.0 {
            return self.hard_cut(track, 0.0, manual).await;
        }
        if self.ramp.is_some() {
            return Err(Error::InvalidState(
                "crossfade already in progress".to_string(),
            ));
        }

        let incoming_slot = self.active_slot.other();
        let runtime = TrackRuntime::new(track, 0.0);

        let loaded = {
            let handle = self.players.slot_mut(incoming_slot);
            handle
                .load(&runtime.track.id, 0.0)
                .and_then(|_| handle.set_volume(0))
                .and_then(|_| handle.play())
        };
        if let Err(e) = loaded {
            // The outgoing track is untouched; report and keep playing,
            // the same policy as an incoming handle failing mid-ramp.
            warn!(track = %runtime.track.id, error = %e, "incoming load failed, crossfade cancelled");
            self.events.emit(PartyEvent::PlaybackError {
                message: format!("crossfade load of {} failed: {}", runtime.track.id, e),
                code: None,
                timestamp: Utc::now(),
            });
            return Ok(());
        }

        self.events.emit(PartyEvent::TrackLoaded {
            runtime_id: runtime.runtime_id,
            track_id: runtime.track.id.clone(),
            title: runtime.track.title.clone(),
            slot: incoming_slot,
            resume_at: 0.0,
            timestamp: Utc::now(),
        });
        self.incoming = Some(runtime);

        let steps = ((duration * 1000.0) / RAMP_STEP_MS as f64).round().max(1.0) as u32;
        self.next_ramp_id += 1;
        let ramp_id = self.next_ramp_id;
        self.ramp = Some(RampState {
            ramp_id,
            step: 0,
            steps,
            incoming_slot,
            manual,
        });

        let tx = self.tx.clone();
        self.timers.clear_ramp();
        self.timers.ramp = Some(tokio::spawn(async move {
            let mut ticker = interval(Duration::from_millis(RAMP_STEP_MS));
            ticker.set_missed_tick_behavior(MissedTickBehavior::Burst);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                if tx.send(Command::RampTick { ramp_id }).is_err() {
                    break;
                }
            }
        }));

        info!(
            from = %self.active_slot,
            to = %incoming_slot,
            duration,
            steps,
            "crossfade started"
        );
        self.events.emit(PartyEvent::CrossfadeStarted {
            from_slot: self.active_slot,
            to_slot: incoming_slot,
            duration,
            timestamp: Utc::now(),
        });
        self.transition_to(PlaybackState::Xfading);
        self.regenerate_session().await;
        Ok(())
    }

    /// Replace the current track instantly: stop the active handle, load the
    /// new track into the other slot, and flip.
    pub(crate) async fn hard_cut(
        &mut self,
        track: Track,
        resume_at: f64,
        skipped: bool,
    ) -> Result<()> {
        if self.ramp.is_some() {
            self.abort_ramp();
        }

        let target = self.active_slot.other();

        {
            let outgoing = self.players.slot_mut(self.active_slot);
            // Best effort; the handle may already be stopped or unloaded.
            if let Err(e) = outgoing.pause().and_then(|_| outgoing.stop()) {
                debug!(error = %e, "outgoing handle stop failed");
            }
        }

        if let Some(old) = self.current.take() {
            self.previous_track = Some(old.track.clone());
            self.events.emit(PartyEvent::TrackEnded {
                runtime_id: old.runtime_id,
                skipped,
                timestamp: Utc::now(),
            });
        }

        let runtime = TrackRuntime::new(track, resume_at);
        let loaded = {
            let handle = self.players.slot_mut(target);
            handle
                .load(&runtime.track.id, resume_at)
                .and_then(|_| handle.set_volume(self.volume))
        };
        if let Err(e) = loaded {
            // The outgoing track is already stopped and reported ended;
            // there is nothing to fall back to.
            return self
                .fail_playback(format!("load of {} failed: {}", runtime.track.id, e))
                .await;
        }

        info!(track = %runtime.track.id, slot = %target, "hard cut");
        self.events.emit(PartyEvent::TrackLoaded {
            runtime_id: runtime.runtime_id,
            track_id: runtime.track.id.clone(),
            title: runtime.track.title.clone(),
            slot: target,
            resume_at,
            timestamp: Utc::now(),
        });

        self.active_slot = target;
        self.current = Some(runtime);
        self.retry_count = 0;
        self.transition_to(PlaybackState::Preparing);
        self.regenerate_session().await;
        Ok(())
    }

    /// Advance the ramp by one step. Ticks from a cancelled ramp carry a
    /// stale id and are dropped.
    pub(crate) async fn handle_ramp_tick(&mut self, ramp_id: u64) -> Result<()> {
        let Some(ramp) = self.ramp.as_mut() else {
            return Ok(());
        };
        if ramp.ramp_id != ramp_id {
            debug!(ramp_id, current = ramp.ramp_id, "stale ramp tick dropped");
            return Ok(());
        }

        ramp.step += 1;
        let (outgoing_vol, incoming_vol) = ramp_volumes(self.volume, ramp.step, ramp.steps);
        let incoming_slot = ramp.incoming_slot;
        let outgoing_slot = incoming_slot.other();
        let finished = ramp.step >= ramp.steps;
        let manual = ramp.manual;

        self.players
            .slot_mut(outgoing_slot)
            .set_volume(outgoing_vol)?;
        self.players
            .slot_mut(incoming_slot)
            .set_volume(incoming_vol)?;

        if !finished {
            return Ok(());
        }

        // Final tick: force exact volumes, silence and stop the outgoing
        // handle, then flip the active slot. The only other flip site is
        // hard_cut.
        self.timers.clear_ramp();
        self.ramp = None;

        {
            let outgoing = self.players.slot_mut(outgoing_slot);
            outgoing.set_volume(0)?;
            if let Err(e) = outgoing.pause().and_then(|_| outgoing.stop()) {
                debug!(error = %e, "outgoing handle stop failed");
            }
        }
        self.players.slot_mut(incoming_slot).set_volume(self.volume)?;

        if let Some(old) = self.current.take() {
            self.previous_track = Some(old.track.clone());
            self.events.emit(PartyEvent::TrackEnded {
                runtime_id: old.runtime_id,
                skipped: manual,
                timestamp: Utc::now(),
            });
        }
        self.current = self.incoming.take();
        self.active_slot = incoming_slot;

        info!(active = %incoming_slot, "crossfade completed");
        self.events.emit(PartyEvent::CrossfadeCompleted {
            active_slot: incoming_slot,
            timestamp: Utc::now(),
        });
        self.transition_to(PlaybackState::Playing);
        self.regenerate_session().await;
        Ok(())
    }

    /// Cancel an in-flight ramp: stop the incoming handle, restore the
    /// outgoing (still active) handle to full volume, and fall back to
    /// Playing. The active slot does not flip.
    pub(crate) fn abort_ramp(&mut self) {
        let Some(ramp) = self.ramp.take() else {
            return;
        };
        self.timers.clear_ramp();

        let incoming_slot = ramp.incoming_slot;
        {
            let handle = self.players.slot_mut(incoming_slot);
            if let Err(e) = handle.pause().and_then(|_| handle.stop()) {
                debug!(error = %e, "incoming handle stop failed");
            }
            let _ = handle.set_volume(0);
        }
        if let Err(e) = self.players.slot_mut(self.active_slot).set_volume(self.volume) {
            warn!(error = %e, "volume restore failed after ramp abort");
        }
        self.incoming = None;

        info!("crossfade aborted");
        if self.state == PlaybackState::Xfading {
            self.transition_to(PlaybackState::Playing);
        }
    }
}
