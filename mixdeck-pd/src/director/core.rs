//! Dispatcher core
//!
//! `DirectorCore` owns every piece of mutable playback state and runs as a
//! single task draining the command channel. Intent handling lives in
//! `intents`, the volume-ramp engine in `crossfade`, and the periodic
//! broadcast/drift work in `scheduler`; this module holds the state struct,
//! the timer set, and the transition rules they all share.

use crate::config::DirectorConfig;
use crate::director::crossfade::RampState;
use crate::director::{Command, DirectorSnapshot};
use crate::error::Result;
use crate::player::PlayerPair;
use crate::sync::{SessionStore, SessionToken};
use crate::track::TrackRuntime;
use chrono::Utc;
use mixdeck_common::events::PlayerSlot;
use mixdeck_common::{EventBus, PartyEvent, PlaybackState, Track};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{mpsc, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Handles to the director's spawned timer tasks.
///
/// Owned exclusively by the dispatcher. Timers are aborted on clear; ticks
/// already queued in the command channel are filtered by era/ramp id.
#[derive(Default)]
pub(crate) struct TimerSet {
    pub(crate) broadcast: Option<JoinHandle<()>>,
    pub(crate) drift: Option<JoinHandle<()>>,
    pub(crate) ramp: Option<JoinHandle<()>>,
    pub(crate) retry: Option<JoinHandle<()>>,
}

impl TimerSet {
    pub(crate) fn clear_all(&mut self) {
        self.clear_role();
        self.clear_ramp();
        self.clear_retry();
    }

    pub(crate) fn clear_role(&mut self) {
        if let Some(h) = self.broadcast.take() {
            h.abort();
        }
        if let Some(h) = self.drift.take() {
            h.abort();
        }
    }

    pub(crate) fn clear_ramp(&mut self) {
        if let Some(h) = self.ramp.take() {
            h.abort();
        }
    }

    pub(crate) fn clear_retry(&mut self) {
        if let Some(h) = self.retry.take() {
            h.abort();
        }
    }

    /// Whether the timer belonging to the given role is running.
    pub(crate) fn role_running(&self, is_authority: bool) -> bool {
        if is_authority {
            self.broadcast.is_some()
        } else {
            self.drift.is_some()
        }
    }
}

impl Drop for TimerSet {
    fn drop(&mut self) {
        self.clear_all();
    }
}

pub(crate) struct DirectorCore {
    pub(crate) config: DirectorConfig,
    pub(crate) players: PlayerPair,

    pub(crate) state: PlaybackState,
    pub(crate) active_slot: PlayerSlot,
    /// Track playing (or paused) on the active slot
    pub(crate) current: Option<TrackRuntime>,
    /// Track ramping up on the inactive slot during a crossfade
    pub(crate) incoming: Option<TrackRuntime>,

    /// Skip candidates, fed by the room controller
    pub(crate) next_track: Option<Track>,
    pub(crate) previous_track: Option<Track>,

    pub(crate) volume: u8,
    pub(crate) muted: bool,

    pub(crate) is_authority: bool,
    pub(crate) session_id: Option<Uuid>,
    /// Most recently applied (or self-published) session id. Older ids are
    /// already rejected by the publish-time fence, so one suffices.
    pub(crate) applied_session: Option<Uuid>,
    /// Publish time of the newest applied token; anything older is a
    /// reordered delivery
    pub(crate) last_applied_publish_ms: i64,
    /// Most recent token, kept for drift estimation between sync ticks
    pub(crate) latest_token: Option<SessionToken>,
    pub(crate) last_drift_correction: Option<Instant>,
    /// Overrides autoplay for the next Cued event (follower token apply)
    pub(crate) pending_play: Option<bool>,

    pub(crate) retry_count: u32,
    pub(crate) ramp: Option<RampState>,
    pub(crate) next_ramp_id: u64,

    pub(crate) timers: TimerSet,
    pub(crate) timer_era: u64,

    pub(crate) tx: mpsc::UnboundedSender<Command>,
    pub(crate) snapshot: Arc<RwLock<DirectorSnapshot>>,
    pub(crate) events: EventBus,
    pub(crate) store: Arc<dyn SessionStore>,
}

impl DirectorCore {
    pub(crate) fn new(
        config: DirectorConfig,
        players: PlayerPair,
        store: Arc<dyn SessionStore>,
        tx: mpsc::UnboundedSender<Command>,
        snapshot: Arc<RwLock<DirectorSnapshot>>,
        events: EventBus,
    ) -> Self {
        let is_authority = config.is_playback_device;
        Self {
            config,
            players,
            state: PlaybackState::Idle,
            active_slot: PlayerSlot::A,
            current: None,
            incoming: None,
            next_track: None,
            previous_track: None,
            volume: 100,
            muted: false,
            is_authority,
            session_id: None,
            applied_session: None,
            last_applied_publish_ms: 0,
            latest_token: None,
            last_drift_correction: None,
            pending_play: None,
            retry_count: 0,
            ramp: None,
            next_ramp_id: 0,
            timers: TimerSet::default(),
            timer_era: 0,
            tx,
            snapshot,
            events,
            store,
        }
    }

    pub(crate) async fn run(mut self, mut rx: mpsc::UnboundedReceiver<Command>) {
        info!(
            device = %self.config.device_id,
            authority = self.is_authority,
            "play director started"
        );

        while let Some(command) = rx.recv().await {
            let shutdown = matches!(command, Command::Shutdown);
            if let Err(e) = self.handle(command).await {
                warn!(error = %e, "command failed");
            }
            self.refresh_snapshot().await;
            if shutdown {
                break;
            }
        }

        self.timers.clear_all();
        info!("play director stopped");
    }

    async fn handle(&mut self, command: Command) -> Result<()> {
        match command {
            Command::Intent(intent) => self.handle_intent(intent).await,
            Command::Player { slot, event } => self.handle_player_event(slot, event).await,
            Command::RampTick { ramp_id } => self.handle_ramp_tick(ramp_id).await,
            Command::BroadcastTick { era } => self.handle_broadcast_tick(era).await,
            Command::DriftTick { era } => self.handle_drift_tick(era).await,
            Command::RetryLoad { runtime_id } => self.handle_retry_load(runtime_id).await,
            Command::SyncToken(token) => self.handle_sync_token(token).await,
            Command::Shutdown => Ok(()),
        }
    }

    /// Apply a state transition and its timer side effects.
    ///
    /// Idle, Preparing, and Error clear every timer unconditionally. Playing
    /// (re)starts the role timer if it is not already running. Paused and
    /// Xfading leave timers alone.
    pub(crate) fn transition_to(&mut self, next: PlaybackState) {
        if self.state == next {
            return;
        }
        let old = self.state;
        self.state = next;

        match next {
            PlaybackState::Idle | PlaybackState::Preparing | PlaybackState::Error => {
                self.timers.clear_all();
                self.timer_era += 1;
                self.ramp = None;
            }
            PlaybackState::Playing => {
                if !self.timers.role_running(self.is_authority) {
                    self.start_role_timers();
                }
            }
            PlaybackState::Xfading | PlaybackState::Paused => {}
        }

        debug!(from = %old, to = %next, "state transition");
        self.events.emit(PartyEvent::StateChanged {
            old_state: old,
            new_state: next,
            timestamp: Utc::now(),
        });
    }

    /// Restart the periodic timer matching the current role. Authorities run
    /// the broadcast tick, followers the drift tick; never both.
    pub(crate) fn start_role_timers(&mut self) {
        self.timers.clear_role();
        self.timer_era += 1;
        let era = self.timer_era;
        let tx = self.tx.clone();

        if self.is_authority {
            let period = Duration::from_millis(self.config.broadcast_interval_ms);
            self.timers.broadcast = Some(tokio::spawn(async move {
                let mut ticker = interval(period);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
                ticker.tick().await;
                loop {
                    ticker.tick().await;
                    if tx.send(Command::BroadcastTick { era }).is_err() {
                        break;
                    }
                }
            }));
        } else {
            let period = Duration::from_millis(self.config.sync_interval_ms);
            self.timers.drift = Some(tokio::spawn(async move {
                let mut ticker = interval(period);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
                ticker.tick().await;
                loop {
                    ticker.tick().await;
                    if tx.send(Command::DriftTick { era }).is_err() {
                        break;
                    }
                }
            }));
        }
    }

    /// A handle operation failed out from under the machine: surface the
    /// failure on the event bus and drive the state to Error, which clears
    /// every timer. Recovery is a fresh load intent.
    pub(crate) async fn fail_playback(&mut self, message: String) -> Result<()> {
        warn!(message, "playback failed");
        self.events.emit(PartyEvent::PlaybackError {
            message,
            code: None,
            timestamp: Utc::now(),
        });
        self.transition_to(PlaybackState::Error);
        self.regenerate_session().await;
        Ok(())
    }

    /// Mint a fresh session id and publish it. Called after every
    /// state-affecting change on the authority; a no-op on followers.
    pub(crate) async fn regenerate_session(&mut self) {
        if !self.is_authority {
            return;
        }
        let id = Uuid::new_v4();
        self.session_id = Some(id);
        // Own publishes are echoed back; pre-marking keeps them inert.
        self.applied_session = Some(id);
        self.publish_token().await;
    }

    /// Publish the current session document under the existing session id.
    pub(crate) async fn publish_token(&mut self) {
        let Some(session_id) = self.session_id else {
            return;
        };
        let position = self.active_position();
        let now_ms = Utc::now().timestamp_millis();
        let token = SessionToken {
            session_id,
            playback_device_id: self.config.device_id.clone(),
            dj_id: self.config.dj_id.clone(),
            current_track: self.current.as_ref().map(|r| r.track.clone()),
            is_playing: matches!(self.state, PlaybackState::Playing | PlaybackState::Xfading),
            position_at_epoch: position,
            epoch_ms: now_ms - (position * 1000.0) as i64,
            published_at_ms: now_ms,
        };
        // Swallowed: the next tick republishes the whole document anyway.
        if let Err(e) = self.store.publish(token).await {
            warn!(error = %e, "session publish failed");
        }
    }

    /// Position of the active handle, or 0 when nothing is loaded.
    pub(crate) fn active_position(&self) -> f64 {
        if self.current.is_some() {
            self.players.slot(self.active_slot).current_time()
        } else {
            0.0
        }
    }

    pub(crate) async fn refresh_snapshot(&self) {
        let (position, duration) = if self.current.is_some() {
            let handle = self.players.slot(self.active_slot);
            (handle.current_time(), handle.duration())
        } else {
            (0.0, 0.0)
        };
        let mut snap = self.snapshot.write().await;
        *snap = DirectorSnapshot {
            state: self.state,
            track: self.current.as_ref().map(|r| r.track.clone()),
            runtime_id: self.current.as_ref().map(|r| r.runtime_id),
            position,
            duration,
            volume: self.volume,
            muted: self.muted,
            is_authority: self.is_authority,
            session_id: self.session_id,
            active_slot: self.active_slot,
        };
    }
}
