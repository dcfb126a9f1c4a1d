//! Intent and player-event handling
//!
//! Every user-visible operation arrives here as a `PlaybackIntent`. Handlers
//! validate against the current state, drive the player handles, and leave
//! the actual state transition to the events the handles emit back, so the
//! machine only advances on confirmed renderer behavior.

use crate::director::core::DirectorCore;
use crate::director::{Command, PlaybackIntent};
use crate::error::{Error, Result};
use crate::player::{classify_error_code, PlayerErrorKind, PlayerEvent, PlayerState};
use crate::track::TrackRuntime;
use chrono::Utc;
use mixdeck_common::events::PlayerSlot;
use mixdeck_common::{PartyEvent, PlaybackState, Track};
use tokio::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Recoverable player errors are retried this many times before skipping.
pub(crate) const MAX_LOAD_RETRIES: u32 = 3;

impl DirectorCore {
    pub(crate) async fn handle_intent(&mut self, intent: PlaybackIntent) -> Result<()> {
        debug!(?intent, state = %self.state, "intent");
        match intent {
            PlaybackIntent::LoadSong { track, resume_at } => {
                self.load_song(track, resume_at).await
            }
            PlaybackIntent::Play => self.play(),
            PlaybackIntent::Pause => self.pause(),
            PlaybackIntent::SkipNext { use_crossfade } => self.skip_next(use_crossfade).await,
            PlaybackIntent::SkipPrevious { use_crossfade } => {
                self.skip_previous(use_crossfade).await
            }
            PlaybackIntent::CrossfadeToNext => self.crossfade_to_next().await,
            PlaybackIntent::Seek { position } => self.seek(position).await,
            PlaybackIntent::ResetTrack => self.reset_track().await,
            PlaybackIntent::SetVolume { level } => self.set_volume(level),
            PlaybackIntent::Mute { muted } => self.set_muted(muted),
            PlaybackIntent::SetUpcoming { next, previous } => {
                self.next_track = next;
                self.previous_track = previous;
                Ok(())
            }
            PlaybackIntent::SetRole { authority } => self.set_role(authority).await,
            PlaybackIntent::Error { message, code } => self.report_error(message, code).await,
        }
    }

    /// Load a track into the active slot. Replaces whatever is there; the
    /// replaced runtime is reported as skipped.
    pub(crate) async fn load_song(&mut self, track: Track, resume_at: f64) -> Result<()> {
        if self.ramp.is_some() {
            self.abort_ramp();
        }
        self.pending_play = None;
        if let Some(old) = self.current.take() {
            self.previous_track = Some(old.track.clone());
            self.events.emit(PartyEvent::TrackEnded {
                runtime_id: old.runtime_id,
                skipped: true,
                timestamp: Utc::now(),
            });
        }

        let runtime = TrackRuntime::new(track, resume_at.max(0.0));
        let loaded = {
            let handle = self.players.slot_mut(self.active_slot);
            handle
                .load(&runtime.track.id, runtime.resume_at)
                .and_then(|_| handle.set_volume(self.volume))
        };
        if let Err(e) = loaded {
            return self
                .fail_playback(format!("load of {} failed: {}", runtime.track.id, e))
                .await;
        }

        info!(track = %runtime.track.id, slot = %self.active_slot, resume_at, "track loaded");
        self.events.emit(PartyEvent::TrackLoaded {
            runtime_id: runtime.runtime_id,
            track_id: runtime.track.id.clone(),
            title: runtime.track.title.clone(),
            slot: self.active_slot,
            resume_at: runtime.resume_at,
            timestamp: Utc::now(),
        });
        self.current = Some(runtime);
        self.retry_count = 0;
        self.transition_to(PlaybackState::Preparing);
        self.regenerate_session().await;
        Ok(())
    }

    pub(crate) fn play(&mut self) -> Result<()> {
        match self.state {
            PlaybackState::Playing | PlaybackState::Xfading => {
                debug!("duplicate play ignored");
                Ok(())
            }
            PlaybackState::Paused | PlaybackState::Preparing => {
                self.players.slot_mut(self.active_slot).play()
            }
            _ => Err(Error::InvalidState(format!(
                "cannot play from {}",
                self.state
            ))),
        }
    }

    pub(crate) fn pause(&mut self) -> Result<()> {
        match self.state {
            PlaybackState::Paused => {
                debug!("duplicate pause ignored");
                Ok(())
            }
            PlaybackState::Playing => self.players.slot_mut(self.active_slot).pause(),
            PlaybackState::Xfading => {
                warn!("pause ignored during crossfade");
                Ok(())
            }
            _ => Err(Error::InvalidState(format!(
                "cannot pause from {}",
                self.state
            ))),
        }
    }

    pub(crate) async fn skip_next(&mut self, use_crossfade: bool) -> Result<()> {
        let Some(track) = self.next_track.take() else {
            warn!("skip next with no queued candidate");
            return Ok(());
        };
        self.skip_to(track, use_crossfade).await
    }

    pub(crate) async fn skip_previous(&mut self, use_crossfade: bool) -> Result<()> {
        let Some(track) = self.previous_track.take() else {
            warn!("skip previous with no candidate");
            return Ok(());
        };
        self.skip_to(track, use_crossfade).await
    }

    /// Shared skip path. A manual skip preempts any in-flight auto
    /// crossfade before starting its own transition.
    async fn skip_to(&mut self, track: Track, use_crossfade: bool) -> Result<()> {
        if self.ramp.is_some() {
            self.abort_ramp();
        }
        let duration = self.config.manual_skip_crossfade;
        if use_crossfade && self.state == PlaybackState::Playing && duration > 0.0 {
            self.start_crossfade(track, duration, true).await
        } else {
            self.hard_cut(track, 0.0, true).await
        }
    }

    /// The end-of-track transition: fade to the queued next track over the
    /// full configured duration.
    pub(crate) async fn crossfade_to_next(&mut self) -> Result<()> {
        if self.state != PlaybackState::Playing {
            return Err(Error::InvalidState(format!(
                "cannot crossfade from {}",
                self.state
            )));
        }
        let Some(track) = self.next_track.take() else {
            return Err(Error::InvalidState("no next track queued".to_string()));
        };
        let duration = self.config.crossfade_duration;
        self.start_crossfade(track, duration, false).await
    }

    pub(crate) async fn seek(&mut self, position: f64) -> Result<()> {
        if self.current.is_none() {
            return Err(Error::InvalidState("no track to seek".to_string()));
        }
        if self.ramp.is_some() {
            self.abort_ramp();
        }
        let position = position.max(0.0);
        self.players
            .slot_mut(self.active_slot)
            .seek_to(position, true)?;
        if let Some(cur) = self.current.as_mut() {
            cur.last_known_position = position;
        }
        debug!(position, "seek");
        self.regenerate_session().await;
        Ok(())
    }

    /// Replay the current track from the top under a fresh runtime identity.
    pub(crate) async fn reset_track(&mut self) -> Result<()> {
        let Some(cur) = self.current.as_ref() else {
            return Err(Error::InvalidState("no track to reset".to_string()));
        };
        let track = cur.track.clone();
        self.load_song(track, 0.0).await
    }

    pub(crate) fn set_volume(&mut self, level: u8) -> Result<()> {
        let level = level.min(100);
        self.volume = level;
        // An active ramp picks the new target up on its next step.
        if self.ramp.is_none() {
            self.players.slot_mut(self.active_slot).set_volume(level)?;
        }
        self.events.emit(PartyEvent::VolumeChanged {
            level,
            muted: self.muted,
            timestamp: Utc::now(),
        });
        Ok(())
    }

    pub(crate) fn set_muted(&mut self, muted: bool) -> Result<()> {
        self.muted = muted;
        for slot in [PlayerSlot::A, PlayerSlot::B] {
            let handle = self.players.slot_mut(slot);
            if muted {
                handle.mute()?;
            } else {
                handle.unmute()?;
            }
        }
        self.events.emit(PartyEvent::VolumeChanged {
            level: self.volume,
            muted,
            timestamp: Utc::now(),
        });
        Ok(())
    }

    /// Reassign the authority role for this device. Role timers restart in
    /// full; the sync fencing state is reset so a returning follower does
    /// not reject the first fresh token.
    pub(crate) async fn set_role(&mut self, authority: bool) -> Result<()> {
        if authority == self.is_authority {
            debug!(authority, "role unchanged");
            return Ok(());
        }
        self.is_authority = authority;
        self.latest_token = None;
        self.last_drift_correction = None;
        self.start_role_timers();
        self.regenerate_session().await;

        info!(authority, "role changed");
        self.events.emit(PartyEvent::RoleChanged {
            is_authority: authority,
            timestamp: Utc::now(),
        });
        Ok(())
    }

    /// Externally reported playback failure.
    pub(crate) async fn report_error(
        &mut self,
        message: String,
        code: Option<u32>,
    ) -> Result<()> {
        warn!(message, ?code, "playback error reported");
        self.events.emit(PartyEvent::PlaybackError {
            message,
            code,
            timestamp: Utc::now(),
        });
        match code {
            Some(code) => self.handle_error_code(code).await,
            None => {
                self.transition_to(PlaybackState::Error);
                self.regenerate_session().await;
                Ok(())
            }
        }
    }

    // ---- player events -------------------------------------------------

    pub(crate) async fn handle_player_event(
        &mut self,
        slot: PlayerSlot,
        event: PlayerEvent,
    ) -> Result<()> {
        match event {
            PlayerEvent::Error(code) => self.handle_player_error(slot, code).await,
            PlayerEvent::StateChange(ps) => self.handle_player_state(slot, ps).await,
        }
    }

    async fn handle_player_state(&mut self, slot: PlayerSlot, ps: PlayerState) -> Result<()> {
        debug!(%slot, ?ps, "player event");
        // The incoming slot's events during a crossfade carry no state
        // machine meaning; the ramp owns that handle until the flip.
        if slot != self.active_slot {
            return Ok(());
        }

        match ps {
            PlayerState::Cued => {
                if self.state == PlaybackState::Preparing {
                    let should_play = self.pending_play.take().unwrap_or(self.config.autoplay);
                    if should_play {
                        self.players.slot_mut(self.active_slot).play()?;
                    } else {
                        self.transition_to(PlaybackState::Paused);
                        self.regenerate_session().await;
                    }
                }
                Ok(())
            }
            PlayerState::Playing => {
                if matches!(self.state, PlaybackState::Preparing | PlaybackState::Paused) {
                    self.retry_count = 0;
                    self.timers.clear_retry();
                    self.transition_to(PlaybackState::Playing);
                    self.regenerate_session().await;
                }
                Ok(())
            }
            PlayerState::Paused => {
                if self.state == PlaybackState::Playing {
                    self.transition_to(PlaybackState::Paused);
                    self.regenerate_session().await;
                }
                Ok(())
            }
            PlayerState::Ended => self.handle_track_ended().await,
            PlayerState::Buffering | PlayerState::Unstarted => Ok(()),
        }
    }

    /// Natural end of the active track. Normally the auto crossfade fires
    /// before this; it still happens for tracks with unknown duration or a
    /// zero crossfade setting.
    async fn handle_track_ended(&mut self) -> Result<()> {
        if self.state != PlaybackState::Playing {
            return Ok(());
        }
        if self.config.autoplay {
            if let Some(track) = self.next_track.take() {
                return self.hard_cut(track, 0.0, false).await;
            }
        }
        if let Some(old) = self.current.take() {
            self.previous_track = Some(old.track.clone());
            self.events.emit(PartyEvent::TrackEnded {
                runtime_id: old.runtime_id,
                skipped: false,
                timestamp: Utc::now(),
            });
        }
        info!("playback finished, queue exhausted");
        self.transition_to(PlaybackState::Idle);
        self.regenerate_session().await;
        Ok(())
    }

    async fn handle_player_error(&mut self, slot: PlayerSlot, code: u32) -> Result<()> {
        if slot != self.active_slot {
            // An incoming handle failing mid-ramp cancels the crossfade and
            // leaves the outgoing track playing.
            if self
                .ramp
                .as_ref()
                .map(|r| r.incoming_slot == slot)
                .unwrap_or(false)
            {
                warn!(%slot, code, "incoming handle failed, crossfade aborted");
                self.abort_ramp();
                self.events.emit(PartyEvent::PlaybackError {
                    message: format!("incoming player failed with code {code}"),
                    code: Some(code),
                    timestamp: Utc::now(),
                });
            }
            return Ok(());
        }

        self.events.emit(PartyEvent::PlaybackError {
            message: format!("player error code {code}"),
            code: Some(code),
            timestamp: Utc::now(),
        });
        self.handle_error_code(code).await
    }

    async fn handle_error_code(&mut self, code: u32) -> Result<()> {
        match classify_error_code(code) {
            PlayerErrorKind::InvalidTrackId | PlayerErrorKind::Unavailable => {
                warn!(code, "track unplayable, skipping");
                self.skip_or_fail().await
            }
            PlayerErrorKind::Recoverable => {
                if self.retry_count < MAX_LOAD_RETRIES {
                    self.retry_count += 1;
                    self.schedule_retry();
                    Ok(())
                } else {
                    warn!(code, retries = self.retry_count, "retries exhausted, skipping");
                    self.skip_or_fail().await
                }
            }
            PlayerErrorKind::Unknown => {
                warn!(code, "unclassified player error, continuing");
                Ok(())
            }
        }
    }

    /// Advance to the next track if one is queued, otherwise enter Error.
    async fn skip_or_fail(&mut self) -> Result<()> {
        if let Some(track) = self.next_track.take() {
            self.hard_cut(track, 0.0, true).await
        } else {
            self.transition_to(PlaybackState::Error);
            self.regenerate_session().await;
            Ok(())
        }
    }

    fn schedule_retry(&mut self) {
        let Some(cur) = self.current.as_ref() else {
            return;
        };
        let runtime_id = cur.runtime_id;
        let attempt = self.retry_count;
        let delay = Duration::from_millis(self.config.retry_delay_ms);
        info!(track = %cur.track.id, attempt, "retrying load in {:?}", delay);

        let tx = self.tx.clone();
        self.timers.clear_retry();
        self.timers.retry = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(Command::RetryLoad { runtime_id });
        }));
    }

    /// Reload the current track after a recoverable error. The runtime id
    /// in the command fences reloads of a track that has since changed.
    pub(crate) async fn handle_retry_load(&mut self, runtime_id: Uuid) -> Result<()> {
        let Some(cur) = self.current.as_ref() else {
            return Ok(());
        };
        if cur.runtime_id != runtime_id {
            debug!(%runtime_id, "stale retry dropped");
            return Ok(());
        }
        let track = cur.track.clone();
        let resume_at = cur.last_known_position;
        let retries = self.retry_count;
        self.load_song(track, resume_at).await?;
        // load_song resets the count; a retry chain keeps it.
        self.retry_count = retries;
        Ok(())
    }
}
