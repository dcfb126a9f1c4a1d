//! Play Director
//!
//! The director is the single owner of all playback state. One dispatcher
//! task receives every input over an mpsc channel and applies it in arrival
//! order: user intents, player events, and timer ticks all flow through the
//! same queue, so no handler ever observes state mid-mutation.
//!
//! Timer tasks never touch playback state directly. They only send tick
//! commands back into the channel, tagged with the timer era (or ramp id)
//! that spawned them, so ticks queued before a timer was cancelled are
//! recognized as stale and dropped.

pub mod core;
pub mod crossfade;
pub mod intents;
pub mod scheduler;

use crate::config::DirectorConfig;
use crate::error::{Error, Result};
use crate::player::{PlayerEvent, PlayerPair};
use crate::sync::{SessionStore, SessionToken};
use mixdeck_common::events::PlayerSlot;
use mixdeck_common::{EventBus, PartyEvent, PlaybackState, Track};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, RwLock};
use uuid::Uuid;

/// User-facing playback intents, the only sanctioned way to request a
/// state change.
#[derive(Debug, Clone)]
pub enum PlaybackIntent {
    /// Load a track into the active slot, optionally resuming mid-track
    LoadSong { track: Track, resume_at: f64 },
    Play,
    Pause,
    /// Advance to the queued next track; crossfade or hard cut
    SkipNext { use_crossfade: bool },
    /// Return to the previously played track
    SkipPrevious { use_crossfade: bool },
    /// Start the automatic end-of-track crossfade explicitly
    CrossfadeToNext,
    Seek { position: f64 },
    /// Replay the current track from 0:00 under a fresh runtime identity
    ResetTrack,
    SetVolume { level: u8 },
    Mute { muted: bool },
    /// Room controller feeds the skip candidates; the director holds no queue
    SetUpcoming {
        next: Option<Track>,
        previous: Option<Track>,
    },
    /// Reassign the playback-authority role for this device
    SetRole { authority: bool },
    /// Externally observed playback failure (renderer-side errors)
    Error { message: String, code: Option<u32> },
}

/// Everything the dispatcher task reacts to.
#[derive(Debug)]
pub enum Command {
    Intent(PlaybackIntent),
    Player { slot: PlayerSlot, event: PlayerEvent },
    RampTick { ramp_id: u64 },
    BroadcastTick { era: u64 },
    DriftTick { era: u64 },
    RetryLoad { runtime_id: Uuid },
    SyncToken(SessionToken),
    Shutdown,
}

/// Read-only view of the director's state, refreshed after every command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectorSnapshot {
    pub state: PlaybackState,
    pub track: Option<Track>,
    pub runtime_id: Option<Uuid>,
    pub position: f64,
    pub duration: f64,
    pub volume: u8,
    pub muted: bool,
    pub is_authority: bool,
    pub session_id: Option<Uuid>,
    pub active_slot: PlayerSlot,
}

impl Default for DirectorSnapshot {
    fn default() -> Self {
        Self {
            state: PlaybackState::Idle,
            track: None,
            runtime_id: None,
            position: 0.0,
            duration: 0.0,
            volume: 100,
            muted: false,
            is_authority: false,
            session_id: None,
            active_slot: PlayerSlot::A,
        }
    }
}

/// Cheap cloneable handle to a running director task.
#[derive(Clone)]
pub struct Director {
    tx: mpsc::UnboundedSender<Command>,
    snapshot: Arc<RwLock<DirectorSnapshot>>,
    events: EventBus,
}

impl Director {
    /// Spawn the dispatcher task and the channel-forwarding tasks for the
    /// two player event streams and the session store subscription.
    pub fn spawn(
        config: DirectorConfig,
        players: PlayerPair,
        player_rx_a: mpsc::UnboundedReceiver<PlayerEvent>,
        player_rx_b: mpsc::UnboundedReceiver<PlayerEvent>,
        store: Arc<dyn SessionStore>,
    ) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let snapshot = Arc::new(RwLock::new(DirectorSnapshot {
            is_authority: config.is_playback_device,
            ..DirectorSnapshot::default()
        }));
        let events = EventBus::default();

        forward_player_events(PlayerSlot::A, player_rx_a, tx.clone());
        forward_player_events(PlayerSlot::B, player_rx_b, tx.clone());
        forward_sync_tokens(store.subscribe(), tx.clone());

        let core = core::DirectorCore::new(
            config,
            players,
            store,
            tx.clone(),
            snapshot.clone(),
            events.clone(),
        );
        tokio::spawn(core.run(rx));

        Self {
            tx,
            snapshot,
            events,
        }
    }

    /// Queue an intent for the dispatcher.
    pub fn dispatch(&self, intent: PlaybackIntent) -> Result<()> {
        self.command(Command::Intent(intent))
    }

    /// Queue a raw command. Intents should go through [`dispatch`].
    ///
    /// [`dispatch`]: Director::dispatch
    pub fn command(&self, command: Command) -> Result<()> {
        self.tx
            .send(command)
            .map_err(|_| Error::Dispatch("director task has stopped".to_string()))
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PartyEvent> {
        self.events.subscribe()
    }

    pub async fn snapshot(&self) -> DirectorSnapshot {
        self.snapshot.read().await.clone()
    }

    pub fn shutdown(&self) {
        let _ = self.tx.send(Command::Shutdown);
    }
}

fn forward_player_events(
    slot: PlayerSlot,
    mut rx: mpsc::UnboundedReceiver<PlayerEvent>,
    tx: mpsc::UnboundedSender<Command>,
) {
    tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            if tx.send(Command::Player { slot, event }).is_err() {
                break;
            }
        }
    });
}

fn forward_sync_tokens(
    mut rx: broadcast::Receiver<SessionToken>,
    tx: mpsc::UnboundedSender<Command>,
) {
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(token) => {
                    if tx.send(Command::SyncToken(token)).is_err() {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    // Whole-document tokens supersede each other; only the
                    // newest matters after a lag.
                    tracing::warn!(skipped, "sync token subscription lagged");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });
}
