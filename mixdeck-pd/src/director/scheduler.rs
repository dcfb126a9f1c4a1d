//! Periodic work: position broadcast and drift correction
//!
//! The authority runs the broadcast tick, which does three things in one
//! pass: report the current position on the event bus, republish the session
//! document, and run the auto-crossfade check. Followers run the drift tick
//! instead, comparing the local position against the expected position
//! derived from the latest token's epoch. Both ticks carry the timer era
//! they were spawned under; ticks from a cleared timer are dropped.

use crate::director::core::DirectorCore;
use crate::error::Result;
use crate::sync::SessionToken;
use chrono::Utc;
use mixdeck_common::{PartyEvent, PlaybackState};
use std::time::Instant;
use tracing::{debug, info, warn};

impl DirectorCore {
    pub(crate) async fn handle_broadcast_tick(&mut self, era: u64) -> Result<()> {
        if era != self.timer_era {
            debug!(era, current = self.timer_era, "stale broadcast tick dropped");
            return Ok(());
        }
        if !self.is_authority {
            return Ok(());
        }
        // The timer keeps running through Paused; only actual playback
        // publishes.
        if !matches!(self.state, PlaybackState::Playing | PlaybackState::Xfading) {
            return Ok(());
        }
        let Some(runtime_id) = self.current.as_ref().map(|r| r.runtime_id) else {
            return Ok(());
        };

        let handle = self.players.slot(self.active_slot);
        let position = handle.current_time();
        let duration = handle.duration();
        if let Some(cur) = self.current.as_mut() {
            cur.last_known_position = position;
        }

        self.events.emit(PartyEvent::PositionUpdate {
            runtime_id,
            position,
            duration,
            timestamp: Utc::now(),
        });
        self.publish_token().await;

        self.maybe_auto_crossfade(position, duration).await
    }

    /// The single auto-crossfade trigger: fire when the remaining time of
    /// the active track falls inside the configured fade window.
    async fn maybe_auto_crossfade(&mut self, position: f64, duration: f64) -> Result<()> {
        if self.state != PlaybackState::Playing
            || self.ramp.is_some()
            || !self.config.autoplay
            || self.config.crossfade_duration <= 0.0
            || duration <= 0.0
        {
            return Ok(());
        }
        let remaining = duration - position;
        if remaining <= 0.0 || remaining > self.config.crossfade_duration {
            return Ok(());
        }
        if self.next_track.is_none() {
            return Ok(());
        }

        info!(remaining, "auto crossfade window reached");
        self.crossfade_to_next().await
    }

    pub(crate) async fn handle_drift_tick(&mut self, era: u64) -> Result<()> {
        if era != self.timer_era {
            debug!(era, current = self.timer_era, "stale drift tick dropped");
            return Ok(());
        }
        if self.is_authority || self.state != PlaybackState::Playing {
            return Ok(());
        }
        let Some(token) = self.latest_token.as_ref() else {
            return Ok(());
        };
        if !token.is_playing {
            return Ok(());
        }

        let now_ms = Utc::now().timestamp_millis();
        let expected = token.expected_position(now_ms).max(0.0);
        let local = self.active_position();
        let drift = (local - expected).abs();
        if drift <= self.config.drift_threshold {
            return Ok(());
        }

        let cooldown_over = self
            .last_drift_correction
            .map(|at| at.elapsed().as_millis() as u64 >= self.config.drift_cooldown_ms)
            .unwrap_or(true);
        if !cooldown_over {
            debug!(drift, "drift over threshold but inside cooldown");
            return Ok(());
        }

        info!(drift, corrected_to = expected, "correcting playback drift");
        self.players
            .slot_mut(self.active_slot)
            .seek_to(expected, true)?;
        if let Some(cur) = self.current.as_mut() {
            cur.last_known_position = expected;
        }
        self.last_drift_correction = Some(Instant::now());
        self.events.emit(PartyEvent::DriftCorrected {
            drift,
            corrected_to: expected,
            timestamp: Utc::now(),
        });
        Ok(())
    }

    /// Apply a session token from the store.
    ///
    /// Fencing, in order: own-device echoes are inert; tokens published
    /// before the newest applied one are reordered deliveries and dropped;
    /// already-applied session ids only refresh the position epoch.
    pub(crate) async fn handle_sync_token(&mut self, token: SessionToken) -> Result<()> {
        if token.playback_device_id == self.config.device_id {
            return Ok(());
        }
        if self.is_authority {
            debug!(session = %token.session_id, "token ignored while authority");
            return Ok(());
        }
        if token.published_at_ms < self.last_applied_publish_ms {
            warn!(
                session = %token.session_id,
                published_at_ms = token.published_at_ms,
                newest = self.last_applied_publish_ms,
                "reordered token dropped"
            );
            return Ok(());
        }

        if self.applied_session == Some(token.session_id) {
            // Duplicate delivery or routine broadcast under the same
            // session: keep the freshest epoch for drift math, change
            // nothing else.
            self.last_applied_publish_ms = token.published_at_ms;
            self.latest_token = Some(token);
            return Ok(());
        }

        debug!(session = %token.session_id, "applying session token");
        self.applied_session = Some(token.session_id);
        self.last_applied_publish_ms = token.published_at_ms;

        let same_track = match (&self.current, &token.current_track) {
            (Some(cur), Some(t)) => cur.track.id == t.id,
            (None, None) => true,
            _ => false,
        };

        if !same_track {
            match token.current_track.clone() {
                Some(track) => {
                    let now_ms = Utc::now().timestamp_millis();
                    let start_at = if token.is_playing {
                        token.expected_position(now_ms).max(0.0)
                    } else {
                        token.position_at_epoch.max(0.0)
                    };
                    let is_playing = token.is_playing;
                    self.load_song(track, start_at).await?;
                    self.pending_play = Some(is_playing);
                }
                None => {
                    // Authority went idle.
                    let outgoing = self.players.slot_mut(self.active_slot);
                    if let Err(e) = outgoing.pause().and_then(|_| outgoing.stop()) {
                        debug!(error = %e, "handle stop failed");
                    }
                    if let Some(old) = self.current.take() {
                        self.events.emit(PartyEvent::TrackEnded {
                            runtime_id: old.runtime_id,
                            skipped: true,
                            timestamp: Utc::now(),
                        });
                    }
                    self.transition_to(PlaybackState::Idle);
                }
            }
        } else if token.is_playing && self.state == PlaybackState::Paused {
            self.players.slot_mut(self.active_slot).play()?;
        } else if !token.is_playing && self.state == PlaybackState::Playing {
            self.players.slot_mut(self.active_slot).pause()?;
        }

        self.latest_token = Some(token);
        Ok(())
    }
}
