//! Test helpers for Play Director integration tests
//!
//! Spawns a full director over the simulated players and the in-memory
//! session store, with intervals shortened so ramps and ticks complete in
//! tens of milliseconds.

// Not every test binary uses every helper.
#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use mixdeck_common::{PartyEvent, PlaybackState, Track};
use mixdeck_pd::config::DirectorConfig;
use mixdeck_pd::director::{Director, DirectorSnapshot};
use mixdeck_pd::player::simulated::{SimulatedPlayer, SimulatedPlayerController};
use mixdeck_pd::player::PlayerPair;
use mixdeck_pd::sync::MemoryStore;
use tokio::sync::broadcast;

pub struct TestRig {
    pub director: Director,
    pub ctl_a: SimulatedPlayerController,
    pub ctl_b: SimulatedPlayerController,
    pub store: Arc<MemoryStore>,
    pub events: broadcast::Receiver<PartyEvent>,
}

/// Authority config with sub-second intervals: a crossfade finishes in
/// ~200 ms and ticks fire every 50 ms.
pub fn fast_config() -> DirectorConfig {
    DirectorConfig {
        is_playback_device: true,
        crossfade_duration: 0.2,
        manual_skip_crossfade: 0.2,
        broadcast_interval_ms: 50,
        sync_interval_ms: 50,
        drift_cooldown_ms: 500,
        retry_delay_ms: 50,
        ..DirectorConfig::default()
    }
}

pub fn spawn_rig(config: DirectorConfig) -> TestRig {
    let (player_a, rx_a, ctl_a) = SimulatedPlayer::new("A");
    let (player_b, rx_b, ctl_b) = SimulatedPlayer::new("B");
    let players = PlayerPair::new(Box::new(player_a), Box::new(player_b));
    let store = Arc::new(MemoryStore::default());
    let director = Director::spawn(config, players, rx_a, rx_b, store.clone());
    let events = director.subscribe();
    TestRig {
        director,
        ctl_a,
        ctl_b,
        store,
        events,
    }
}

pub fn track(id: &str) -> Track {
    Track::new(id, format!("Track {id}"), 300.0)
}

/// Poll the snapshot until the predicate holds; panics after `timeout_ms`.
pub async fn wait_until(
    director: &Director,
    timeout_ms: u64,
    what: &str,
    predicate: impl Fn(&DirectorSnapshot) -> bool,
) -> DirectorSnapshot {
    let deadline = tokio::time::Instant::now() + Duration::from_millis(timeout_ms);
    loop {
        let snap = director.snapshot().await;
        if predicate(&snap) {
            return snap;
        }
        if tokio::time::Instant::now() >= deadline {
            panic!("timed out waiting for {what}; last snapshot: {snap:?}");
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

pub async fn wait_for_state(
    director: &Director,
    want: PlaybackState,
    timeout_ms: u64,
) -> DirectorSnapshot {
    wait_until(director, timeout_ms, &format!("state {want}"), |s| {
        s.state == want
    })
    .await
}

/// Drain every event already delivered to the receiver.
pub fn drain_events(rx: &mut broadcast::Receiver<PartyEvent>) -> Vec<PartyEvent> {
    let mut out = Vec::new();
    while let Ok(event) = rx.try_recv() {
        out.push(event);
    }
    out
}

pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(80)).await;
}
