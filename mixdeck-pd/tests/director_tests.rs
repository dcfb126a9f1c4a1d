//! Integration tests for the Play Director state machine
//!
//! Each test spawns a full director over the simulated players and drives
//! it through real (shortened) timers, asserting on snapshots, emitted
//! events, and the call-visible behavior of the two player slots.

mod helpers;

use helpers::{drain_events, fast_config, settle, spawn_rig, track, wait_for_state, wait_until};
use mixdeck_common::events::PlayerSlot;
use mixdeck_common::{PartyEvent, PlaybackState};
use mixdeck_pd::director::PlaybackIntent;
use std::time::Duration;

#[tokio::test]
async fn test_load_and_autoplay_reaches_playing() {
    let rig = spawn_rig(fast_config());
    rig.director
        .dispatch(PlaybackIntent::LoadSong {
            track: track("t1"),
            resume_at: 0.0,
        })
        .unwrap();

    let snap = wait_for_state(&rig.director, PlaybackState::Playing, 1000).await;
    assert_eq!(snap.track.as_ref().unwrap().id, "t1");
    assert_eq!(snap.active_slot, PlayerSlot::A);
    assert_eq!(rig.ctl_a.loaded_track().as_deref(), Some("t1"));
    assert_eq!(rig.ctl_a.volume(), 100);
}

#[tokio::test]
async fn test_load_resumes_at_offset() {
    let rig = spawn_rig(fast_config());
    rig.director
        .dispatch(PlaybackIntent::LoadSong {
            track: track("t1"),
            resume_at: 42.0,
        })
        .unwrap();

    wait_for_state(&rig.director, PlaybackState::Playing, 1000).await;
    assert!(rig.ctl_a.position() >= 42.0);
}

#[tokio::test]
async fn test_duplicate_play_and_pause_are_noops() {
    let rig = spawn_rig(fast_config());
    rig.director
        .dispatch(PlaybackIntent::LoadSong {
            track: track("t1"),
            resume_at: 0.0,
        })
        .unwrap();
    wait_for_state(&rig.director, PlaybackState::Playing, 1000).await;

    rig.director.dispatch(PlaybackIntent::Play).unwrap();
    settle().await;
    assert_eq!(
        rig.director.snapshot().await.state,
        PlaybackState::Playing
    );

    rig.director.dispatch(PlaybackIntent::Pause).unwrap();
    wait_for_state(&rig.director, PlaybackState::Paused, 1000).await;
    rig.director.dispatch(PlaybackIntent::Pause).unwrap();
    settle().await;
    assert_eq!(rig.director.snapshot().await.state, PlaybackState::Paused);

    rig.director.dispatch(PlaybackIntent::Play).unwrap();
    wait_for_state(&rig.director, PlaybackState::Playing, 1000).await;
}

#[tokio::test]
async fn test_pause_does_not_flip_slot() {
    let rig = spawn_rig(fast_config());
    rig.director
        .dispatch(PlaybackIntent::LoadSong {
            track: track("t1"),
            resume_at: 0.0,
        })
        .unwrap();
    wait_for_state(&rig.director, PlaybackState::Playing, 1000).await;

    rig.director.dispatch(PlaybackIntent::Pause).unwrap();
    let snap = wait_for_state(&rig.director, PlaybackState::Paused, 1000).await;
    assert_eq!(snap.active_slot, PlayerSlot::A);

    rig.director
        .dispatch(PlaybackIntent::Seek { position: 10.0 })
        .unwrap();
    settle().await;
    assert_eq!(rig.director.snapshot().await.active_slot, PlayerSlot::A);
}

#[tokio::test]
async fn test_hard_skip_flips_slot_once() {
    let mut rig = spawn_rig(fast_config());
    rig.director
        .dispatch(PlaybackIntent::LoadSong {
            track: track("t1"),
            resume_at: 0.0,
        })
        .unwrap();
    wait_for_state(&rig.director, PlaybackState::Playing, 1000).await;
    drain_events(&mut rig.events);

    rig.director
        .dispatch(PlaybackIntent::SetUpcoming {
            next: Some(track("t2")),
            previous: None,
        })
        .unwrap();
    rig.director
        .dispatch(PlaybackIntent::SkipNext {
            use_crossfade: false,
        })
        .unwrap();

    let snap = wait_until(&rig.director, 1000, "t2 playing", |s| {
        s.state == PlaybackState::Playing && s.track.as_ref().map(|t| t.id.as_str()) == Some("t2")
    })
    .await;
    assert_eq!(snap.active_slot, PlayerSlot::B);
    assert_eq!(rig.ctl_b.loaded_track().as_deref(), Some("t2"));

    let events = drain_events(&mut rig.events);
    let ended: Vec<_> = events
        .iter()
        .filter(|e| matches!(e, PartyEvent::TrackEnded { skipped: true, .. }))
        .collect();
    assert_eq!(ended.len(), 1, "hard skip reports exactly one skipped track");
    assert!(
        !events
            .iter()
            .any(|e| matches!(e, PartyEvent::CrossfadeStarted { .. })),
        "hard cut must not start a ramp"
    );
}

#[tokio::test]
async fn test_crossfade_flips_slot_and_restores_volumes() {
    let mut rig = spawn_rig(fast_config());
    rig.director
        .dispatch(PlaybackIntent::LoadSong {
            track: track("t1"),
            resume_at: 0.0,
        })
        .unwrap();
    wait_for_state(&rig.director, PlaybackState::Playing, 1000).await;
    drain_events(&mut rig.events);

    rig.director
        .dispatch(PlaybackIntent::SetUpcoming {
            next: Some(track("t2")),
            previous: None,
        })
        .unwrap();
    rig.director
        .dispatch(PlaybackIntent::CrossfadeToNext)
        .unwrap();

    wait_for_state(&rig.director, PlaybackState::Xfading, 1000).await;
    let snap = wait_until(&rig.director, 2000, "crossfade completion", |s| {
        s.state == PlaybackState::Playing && s.track.as_ref().map(|t| t.id.as_str()) == Some("t2")
    })
    .await;

    assert_eq!(snap.active_slot, PlayerSlot::B);
    assert_eq!(rig.ctl_b.volume(), 100, "incoming ends at full volume");
    assert_eq!(rig.ctl_a.volume(), 0, "outgoing ends silent");

    let events = drain_events(&mut rig.events);
    let completed = events
        .iter()
        .filter(|e| matches!(e, PartyEvent::CrossfadeCompleted { .. }))
        .count();
    assert_eq!(completed, 1, "the slot flips exactly once");
}

#[tokio::test]
async fn test_crossfade_passes_through_midpoint_volumes() {
    let mut config = fast_config();
    config.crossfade_duration = 1.0; // 20 steps
    let rig = spawn_rig(config);

    rig.director
        .dispatch(PlaybackIntent::LoadSong {
            track: track("t1"),
            resume_at: 0.0,
        })
        .unwrap();
    wait_for_state(&rig.director, PlaybackState::Playing, 1000).await;
    rig.director
        .dispatch(PlaybackIntent::SetUpcoming {
            next: Some(track("t2")),
            previous: None,
        })
        .unwrap();
    rig.director
        .dispatch(PlaybackIntent::CrossfadeToNext)
        .unwrap();
    wait_for_state(&rig.director, PlaybackState::Xfading, 1000).await;

    // Sample the two handles while the ramp runs; a linear fade must pass
    // through a region where both sides sit near 50.
    let mut saw_midpoint = false;
    for _ in 0..120 {
        let out = rig.ctl_a.volume() as i32;
        let inc = rig.ctl_b.volume() as i32;
        if (out - 50).abs() <= 20 && (inc - 50).abs() <= 20 {
            saw_midpoint = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(saw_midpoint, "ramp never passed through the midpoint region");

    wait_until(&rig.director, 3000, "crossfade completion", |s| {
        s.state == PlaybackState::Playing
    })
    .await;
}

#[tokio::test]
async fn test_second_crossfade_is_rejected_while_ramping() {
    let mut rig = spawn_rig(fast_config());
    rig.director
        .dispatch(PlaybackIntent::LoadSong {
            track: track("t1"),
            resume_at: 0.0,
        })
        .unwrap();
    wait_for_state(&rig.director, PlaybackState::Playing, 1000).await;
    drain_events(&mut rig.events);

    rig.director
        .dispatch(PlaybackIntent::SetUpcoming {
            next: Some(track("t2")),
            previous: None,
        })
        .unwrap();
    rig.director
        .dispatch(PlaybackIntent::CrossfadeToNext)
        .unwrap();
    wait_for_state(&rig.director, PlaybackState::Xfading, 1000).await;

    // Queue a second fade mid-ramp: it must be rejected, not stacked.
    rig.director
        .dispatch(PlaybackIntent::SetUpcoming {
            next: Some(track("t3")),
            previous: None,
        })
        .unwrap();
    rig.director
        .dispatch(PlaybackIntent::CrossfadeToNext)
        .unwrap();

    let snap = wait_until(&rig.director, 2000, "first fade to win", |s| {
        s.state == PlaybackState::Playing
    })
    .await;
    assert_eq!(snap.track.as_ref().unwrap().id, "t2");

    let events = drain_events(&mut rig.events);
    let started = events
        .iter()
        .filter(|e| matches!(e, PartyEvent::CrossfadeStarted { .. }))
        .count();
    assert_eq!(started, 1);
}

#[tokio::test]
async fn test_seek_aborts_ramp_without_flipping() {
    let rig = spawn_rig(fast_config());
    rig.director
        .dispatch(PlaybackIntent::LoadSong {
            track: track("t1"),
            resume_at: 0.0,
        })
        .unwrap();
    wait_for_state(&rig.director, PlaybackState::Playing, 1000).await;

    rig.director
        .dispatch(PlaybackIntent::SetUpcoming {
            next: Some(track("t2")),
            previous: None,
        })
        .unwrap();
    rig.director
        .dispatch(PlaybackIntent::CrossfadeToNext)
        .unwrap();
    wait_for_state(&rig.director, PlaybackState::Xfading, 1000).await;

    rig.director
        .dispatch(PlaybackIntent::Seek { position: 30.0 })
        .unwrap();
    let snap = wait_for_state(&rig.director, PlaybackState::Playing, 1000).await;

    assert_eq!(snap.track.as_ref().unwrap().id, "t1", "no track change");
    assert_eq!(snap.active_slot, PlayerSlot::A, "no flip on seek");
    assert_eq!(rig.ctl_a.volume(), 100, "outgoing volume restored");
    assert!(rig.ctl_a.position() >= 30.0);
}

#[tokio::test]
async fn test_hard_skip_preempts_running_crossfade() {
    let mut rig = spawn_rig(fast_config());
    rig.director
        .dispatch(PlaybackIntent::LoadSong {
            track: track("t1"),
            resume_at: 0.0,
        })
        .unwrap();
    wait_for_state(&rig.director, PlaybackState::Playing, 1000).await;
    drain_events(&mut rig.events);

    rig.director
        .dispatch(PlaybackIntent::SetUpcoming {
            next: Some(track("t2")),
            previous: None,
        })
        .unwrap();
    rig.director
        .dispatch(PlaybackIntent::CrossfadeToNext)
        .unwrap();
    wait_for_state(&rig.director, PlaybackState::Xfading, 1000).await;

    rig.director
        .dispatch(PlaybackIntent::SetUpcoming {
            next: Some(track("t3")),
            previous: None,
        })
        .unwrap();
    rig.director
        .dispatch(PlaybackIntent::SkipNext {
            use_crossfade: false,
        })
        .unwrap();

    let snap = wait_until(&rig.director, 1000, "t3 playing", |s| {
        s.state == PlaybackState::Playing && s.track.as_ref().map(|t| t.id.as_str()) == Some("t3")
    })
    .await;
    assert_eq!(snap.active_slot, PlayerSlot::B);

    let events = drain_events(&mut rig.events);
    assert!(
        !events
            .iter()
            .any(|e| matches!(e, PartyEvent::CrossfadeCompleted { .. })),
        "the aborted ramp must never complete"
    );
}

#[tokio::test]
async fn test_reset_track_gets_fresh_runtime_identity() {
    let rig = spawn_rig(fast_config());
    rig.director
        .dispatch(PlaybackIntent::LoadSong {
            track: track("t1"),
            resume_at: 60.0,
        })
        .unwrap();
    let before = wait_for_state(&rig.director, PlaybackState::Playing, 1000).await;
    let old_runtime = before.runtime_id.unwrap();

    rig.director.dispatch(PlaybackIntent::ResetTrack).unwrap();
    let after = wait_until(&rig.director, 1000, "reset to replay", |s| {
        s.state == PlaybackState::Playing && s.runtime_id != Some(old_runtime)
    })
    .await;

    assert_eq!(after.track.as_ref().unwrap().id, "t1");
    assert!(after.position < 5.0, "replay starts from the top");
}

#[tokio::test]
async fn test_skip_previous_returns_to_prior_track() {
    let rig = spawn_rig(fast_config());
    rig.director
        .dispatch(PlaybackIntent::LoadSong {
            track: track("t1"),
            resume_at: 0.0,
        })
        .unwrap();
    wait_for_state(&rig.director, PlaybackState::Playing, 1000).await;

    rig.director
        .dispatch(PlaybackIntent::SetUpcoming {
            next: Some(track("t2")),
            previous: None,
        })
        .unwrap();
    rig.director
        .dispatch(PlaybackIntent::SkipNext {
            use_crossfade: false,
        })
        .unwrap();
    wait_until(&rig.director, 1000, "t2 playing", |s| {
        s.state == PlaybackState::Playing && s.track.as_ref().map(|t| t.id.as_str()) == Some("t2")
    })
    .await;

    // The skip recorded t1 as the previous candidate.
    rig.director
        .dispatch(PlaybackIntent::SkipPrevious {
            use_crossfade: false,
        })
        .unwrap();
    let snap = wait_until(&rig.director, 1000, "t1 playing again", |s| {
        s.state == PlaybackState::Playing && s.track.as_ref().map(|t| t.id.as_str()) == Some("t1")
    })
    .await;
    assert_eq!(snap.active_slot, PlayerSlot::A, "two hard cuts, two flips");
}

#[tokio::test]
async fn test_skip_with_no_candidate_is_a_noop() {
    let rig = spawn_rig(fast_config());
    rig.director
        .dispatch(PlaybackIntent::LoadSong {
            track: track("t1"),
            resume_at: 0.0,
        })
        .unwrap();
    wait_for_state(&rig.director, PlaybackState::Playing, 1000).await;

    rig.director
        .dispatch(PlaybackIntent::SkipNext {
            use_crossfade: false,
        })
        .unwrap();
    settle().await;

    let snap = rig.director.snapshot().await;
    assert_eq!(snap.state, PlaybackState::Playing);
    assert_eq!(snap.track.as_ref().unwrap().id, "t1");
}

#[tokio::test]
async fn test_volume_and_mute() {
    let mut rig = spawn_rig(fast_config());
    rig.director
        .dispatch(PlaybackIntent::LoadSong {
            track: track("t1"),
            resume_at: 0.0,
        })
        .unwrap();
    wait_for_state(&rig.director, PlaybackState::Playing, 1000).await;
    drain_events(&mut rig.events);

    rig.director
        .dispatch(PlaybackIntent::SetVolume { level: 40 })
        .unwrap();
    rig.director
        .dispatch(PlaybackIntent::Mute { muted: true })
        .unwrap();
    settle().await;

    assert_eq!(rig.ctl_a.volume(), 40);
    assert!(rig.ctl_a.muted());
    assert!(rig.ctl_b.muted());

    let events = drain_events(&mut rig.events);
    let volume_events = events
        .iter()
        .filter(|e| matches!(e, PartyEvent::VolumeChanged { .. }))
        .count();
    assert_eq!(volume_events, 2);
}

#[tokio::test]
async fn test_unplayable_track_skips_to_next() {
    let rig = spawn_rig(fast_config());
    rig.director
        .dispatch(PlaybackIntent::LoadSong {
            track: track("t1"),
            resume_at: 0.0,
        })
        .unwrap();
    wait_for_state(&rig.director, PlaybackState::Playing, 1000).await;

    rig.director
        .dispatch(PlaybackIntent::SetUpcoming {
            next: Some(track("t2")),
            previous: None,
        })
        .unwrap();
    // 150: embedding blocked, skip immediately.
    rig.ctl_a.emit_error(150);

    let snap = wait_until(&rig.director, 1000, "skip to t2", |s| {
        s.state == PlaybackState::Playing && s.track.as_ref().map(|t| t.id.as_str()) == Some("t2")
    })
    .await;
    assert_eq!(snap.active_slot, PlayerSlot::B);
}

#[tokio::test]
async fn test_unplayable_track_with_empty_queue_enters_error() {
    let rig = spawn_rig(fast_config());
    rig.director
        .dispatch(PlaybackIntent::LoadSong {
            track: track("t1"),
            resume_at: 0.0,
        })
        .unwrap();
    wait_for_state(&rig.director, PlaybackState::Playing, 1000).await;

    // 2: invalid track id.
    rig.ctl_a.emit_error(2);
    wait_for_state(&rig.director, PlaybackState::Error, 1000).await;
}

#[tokio::test]
async fn test_unknown_error_code_is_log_only() {
    let rig = spawn_rig(fast_config());
    rig.director
        .dispatch(PlaybackIntent::LoadSong {
            track: track("t1"),
            resume_at: 0.0,
        })
        .unwrap();
    wait_for_state(&rig.director, PlaybackState::Playing, 1000).await;

    rig.ctl_a.emit_error(42);
    settle().await;
    assert_eq!(rig.director.snapshot().await.state, PlaybackState::Playing);
}

#[tokio::test]
async fn test_rejected_load_enters_error_state() {
    let mut rig = spawn_rig(fast_config());
    rig.ctl_a.fail_next_load("provider rejected the embed");

    rig.director
        .dispatch(PlaybackIntent::LoadSong {
            track: track("t1"),
            resume_at: 0.0,
        })
        .unwrap();

    let snap = wait_for_state(&rig.director, PlaybackState::Error, 1000).await;
    assert!(snap.track.is_none(), "the failed track is not retained");

    let events = drain_events(&mut rig.events);
    assert!(
        events
            .iter()
            .any(|e| matches!(e, PartyEvent::PlaybackError { .. })),
        "a rejected load must be reported on the event bus"
    );
}

#[tokio::test]
async fn test_rejected_load_during_hard_skip_enters_error_state() {
    let mut rig = spawn_rig(fast_config());
    rig.director
        .dispatch(PlaybackIntent::LoadSong {
            track: track("t1"),
            resume_at: 0.0,
        })
        .unwrap();
    wait_for_state(&rig.director, PlaybackState::Playing, 1000).await;
    drain_events(&mut rig.events);

    // The outgoing track is stopped before the incoming load, so there is
    // nothing left to fall back to when that load is rejected.
    rig.ctl_b.fail_next_load("provider rejected the embed");
    rig.director
        .dispatch(PlaybackIntent::SetUpcoming {
            next: Some(track("t2")),
            previous: None,
        })
        .unwrap();
    rig.director
        .dispatch(PlaybackIntent::SkipNext {
            use_crossfade: false,
        })
        .unwrap();

    wait_for_state(&rig.director, PlaybackState::Error, 1000).await;
    let events = drain_events(&mut rig.events);
    assert!(events
        .iter()
        .any(|e| matches!(e, PartyEvent::PlaybackError { .. })));
}

#[tokio::test]
async fn test_rejected_incoming_load_cancels_crossfade() {
    let mut rig = spawn_rig(fast_config());
    rig.director
        .dispatch(PlaybackIntent::LoadSong {
            track: track("t1"),
            resume_at: 0.0,
        })
        .unwrap();
    wait_for_state(&rig.director, PlaybackState::Playing, 1000).await;
    drain_events(&mut rig.events);

    rig.ctl_b.fail_next_load("provider rejected the embed");
    rig.director
        .dispatch(PlaybackIntent::SetUpcoming {
            next: Some(track("t2")),
            previous: None,
        })
        .unwrap();
    rig.director
        .dispatch(PlaybackIntent::CrossfadeToNext)
        .unwrap();
    settle().await;

    // The outgoing track was never touched, so playback continues on it.
    let snap = rig.director.snapshot().await;
    assert_eq!(snap.state, PlaybackState::Playing);
    assert_eq!(snap.track.as_ref().unwrap().id, "t1");
    assert_eq!(snap.active_slot, PlayerSlot::A);

    let events = drain_events(&mut rig.events);
    assert!(events
        .iter()
        .any(|e| matches!(e, PartyEvent::PlaybackError { .. })));
    assert!(
        !events
            .iter()
            .any(|e| matches!(e, PartyEvent::CrossfadeStarted { .. })),
        "a cancelled fade must never announce itself"
    );
}

#[tokio::test]
async fn test_recoverable_error_retries_then_skips() {
    let rig = spawn_rig(fast_config());
    rig.director
        .dispatch(PlaybackIntent::SetUpcoming {
            next: Some(track("t2")),
            previous: None,
        })
        .unwrap();

    // 5: HTML5 player error, worth retrying. Every load of t1 raises it.
    rig.ctl_a.error_on_every_load(5);
    rig.director
        .dispatch(PlaybackIntent::LoadSong {
            track: track("t1"),
            resume_at: 0.0,
        })
        .unwrap();

    let snap = wait_until(&rig.director, 3000, "skip to t2 after retries", |s| {
        s.state == PlaybackState::Playing && s.track.as_ref().map(|t| t.id.as_str()) == Some("t2")
    })
    .await;
    assert_eq!(snap.active_slot, PlayerSlot::B);

    use mixdeck_pd::player::simulated::PlayerCall;
    let attempts = rig
        .ctl_a
        .calls()
        .iter()
        .filter(|c| matches!(c, PlayerCall::Load { track_id, .. } if track_id == "t1"))
        .count();
    assert_eq!(attempts, 4, "initial load plus three retries");
}

#[tokio::test]
async fn test_natural_end_advances_to_next() {
    let rig = spawn_rig(fast_config());
    rig.director
        .dispatch(PlaybackIntent::LoadSong {
            track: track("t1"),
            resume_at: 0.0,
        })
        .unwrap();
    wait_for_state(&rig.director, PlaybackState::Playing, 1000).await;

    rig.director
        .dispatch(PlaybackIntent::SetUpcoming {
            next: Some(track("t2")),
            previous: None,
        })
        .unwrap();
    rig.ctl_a.finish_track();

    wait_until(&rig.director, 1000, "t2 playing", |s| {
        s.state == PlaybackState::Playing && s.track.as_ref().map(|t| t.id.as_str()) == Some("t2")
    })
    .await;
}

#[tokio::test]
async fn test_natural_end_with_empty_queue_goes_idle() {
    let mut rig = spawn_rig(fast_config());
    rig.director
        .dispatch(PlaybackIntent::LoadSong {
            track: track("t1"),
            resume_at: 0.0,
        })
        .unwrap();
    wait_for_state(&rig.director, PlaybackState::Playing, 1000).await;
    drain_events(&mut rig.events);

    rig.ctl_a.finish_track();
    let snap = wait_for_state(&rig.director, PlaybackState::Idle, 1000).await;
    assert!(snap.track.is_none());

    let events = drain_events(&mut rig.events);
    assert!(events
        .iter()
        .any(|e| matches!(e, PartyEvent::TrackEnded { skipped: false, .. })));
}

#[tokio::test]
async fn test_auto_crossfade_fires_inside_fade_window() {
    let mut config = fast_config();
    config.crossfade_duration = 0.3;
    let rig = spawn_rig(config);

    rig.ctl_a.set_default_duration(60.0);
    rig.director
        .dispatch(PlaybackIntent::LoadSong {
            track: track("t1"),
            resume_at: 0.0,
        })
        .unwrap();
    wait_for_state(&rig.director, PlaybackState::Playing, 1000).await;

    rig.director
        .dispatch(PlaybackIntent::SetUpcoming {
            next: Some(track("t2")),
            previous: None,
        })
        .unwrap();
    settle().await;
    assert_eq!(
        rig.director.snapshot().await.state,
        PlaybackState::Playing,
        "no fade while remaining time is outside the window"
    );

    // Jump near the end: remaining 0.1 s < fade window 0.3 s.
    rig.ctl_a.set_position(59.9);

    wait_until(&rig.director, 2000, "auto crossfade to t2", |s| {
        s.state == PlaybackState::Playing && s.track.as_ref().map(|t| t.id.as_str()) == Some("t2")
    })
    .await;
}

#[tokio::test]
async fn test_paused_device_stops_broadcasting_position() {
    let mut rig = spawn_rig(fast_config());
    rig.director
        .dispatch(PlaybackIntent::LoadSong {
            track: track("t1"),
            resume_at: 0.0,
        })
        .unwrap();
    wait_for_state(&rig.director, PlaybackState::Playing, 1000).await;

    // Playing: position updates must arrive.
    tokio::time::sleep(Duration::from_millis(150)).await;
    let playing_updates = drain_events(&mut rig.events)
        .iter()
        .filter(|e| matches!(e, PartyEvent::PositionUpdate { .. }))
        .count();
    assert!(playing_updates > 0);

    rig.director.dispatch(PlaybackIntent::Pause).unwrap();
    wait_for_state(&rig.director, PlaybackState::Paused, 1000).await;
    drain_events(&mut rig.events);

    tokio::time::sleep(Duration::from_millis(200)).await;
    let paused_updates = drain_events(&mut rig.events)
        .iter()
        .filter(|e| matches!(e, PartyEvent::PositionUpdate { .. }))
        .count();
    assert_eq!(paused_updates, 0, "paused devices publish nothing");
}
