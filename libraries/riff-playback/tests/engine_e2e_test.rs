//! End-to-end tests for PlaybackEngine
//!
//! Drives the synchronous engine directly, standing in for the player task:
//! - Track selection and session handoff
//! - Stale load and end-of-track callbacks
//! - Repeat and queue boundaries
//! - Shuffle anchoring
//! - Volume, mute and seek forwarding

mod common;

use common::{create_track, loaded_session, Call, SessionProbe};
use riff_playback::{
    LoadCompletion, LoadRequest, LoadResolution, PlaybackConfig, PlaybackEngine, PlaybackEvent,
    PlaybackStatus, RepeatMode, Track,
};

// ============================================================================
// Test Infrastructure
// ============================================================================

fn engine() -> PlaybackEngine {
    PlaybackEngine::new(&PlaybackConfig {
        shuffle_seed: Some(1234),
        ..PlaybackConfig::default()
    })
}

fn engine_with(ids: &[(&str, f64)]) -> PlaybackEngine {
    let mut engine = engine();
    engine.add_to_queue(ids.iter().map(|(id, d)| create_track(id, *d)).collect());
    engine
}

/// Complete a load successfully, returning the new session's probe
fn finish_load(engine: &mut PlaybackEngine, request: &LoadRequest, duration: f64) -> SessionProbe {
    let (loaded, probe) = loaded_session(request.source.as_str(), duration);
    let resolution = engine.complete_load(LoadCompletion {
        generation: request.generation,
        result: Ok(loaded),
    });
    assert_eq!(resolution, LoadResolution::Started);
    probe
}

fn current_id(engine: &PlaybackEngine) -> String {
    engine.current_track().unwrap().id.to_string()
}

// ============================================================================
// Playback Flow
// ============================================================================

#[test]
fn two_track_queue_plays_through_and_ends() {
    let mut engine = engine_with(&[("t1", 10.0), ("t2", 20.0)]);

    // Play T1
    let request = engine.play_track(create_track("t1", 10.0)).unwrap();
    let t1 = finish_load(&mut engine, &request, 10.0);
    assert_eq!(engine.status(), PlaybackStatus::Playing);
    assert_eq!(engine.current_time(), 0.0);
    assert_eq!(current_id(&engine), "t1");

    // T1 ends, T2 starts
    let request = engine.track_ended(request.generation).unwrap();
    assert!(t1.is_stopped());
    assert_eq!(request.track_id.as_str(), "t2");
    let t2 = finish_load(&mut engine, &request, 20.0);
    assert_eq!(engine.status(), PlaybackStatus::Playing);
    assert_eq!(engine.current_time(), 0.0);
    assert_eq!(engine.duration(), 20.0);

    // T2 ends, queue is exhausted
    assert!(engine.track_ended(request.generation).is_none());
    assert!(t2.is_stopped());
    assert_eq!(engine.status(), PlaybackStatus::Ended);
    assert_eq!(current_id(&engine), "t2");
    assert_eq!(engine.queue().position(), Some(1));
    assert_eq!(engine.current_time(), 0.0);
    assert!(!engine.has_live_session());
}

#[test]
fn resume_after_ended_replays_current_track() {
    let mut engine = engine_with(&[("t1", 10.0)]);
    let request = engine.resume().unwrap();
    finish_load(&mut engine, &request, 10.0);
    engine.track_ended(request.generation);
    assert_eq!(engine.status(), PlaybackStatus::Ended);

    let request = engine.resume().unwrap();
    assert_eq!(request.track_id.as_str(), "t1");
    assert_eq!(engine.status(), PlaybackStatus::Loading);
}

#[test]
fn play_track_not_in_queue_appends_it() {
    let mut engine = engine_with(&[("a", 10.0), ("b", 10.0)]);

    let request = engine.play_track(create_track("z", 30.0)).unwrap();

    assert_eq!(request.track_id.as_str(), "z");
    assert_eq!(engine.queue().len(), 3);
    assert_eq!(engine.queue().position(), Some(2));
    assert_eq!(engine.duration(), 30.0);
}

#[test]
fn play_track_already_queued_does_not_duplicate() {
    let mut engine = engine_with(&[("a", 10.0), ("b", 10.0)]);

    engine.play_track(create_track("b", 10.0));

    assert_eq!(engine.queue().len(), 2);
    assert_eq!(engine.queue().position(), Some(1));
}

#[test]
fn generation_increases_on_every_selection() {
    let mut engine = engine_with(&[("a", 10.0), ("b", 10.0)]);
    let g0 = engine.generation();

    let r1 = engine.play_track(create_track("a", 10.0)).unwrap();
    let r2 = engine.next_track().unwrap();
    let r3 = engine.previous_track().unwrap();

    assert!(g0 < r1.generation);
    assert!(r1.generation < r2.generation);
    assert!(r2.generation < r3.generation);
    assert_eq!(engine.generation(), r3.generation);
}

#[test]
fn switching_tracks_stops_previous_session() {
    let mut engine = engine_with(&[("a", 10.0), ("b", 10.0)]);
    let request = engine.play_track(create_track("a", 10.0)).unwrap();
    let a = finish_load(&mut engine, &request, 10.0);

    engine.play_track(create_track("b", 10.0));

    assert_eq!(a.last(), Some(Call::Stop));
    assert!(!engine.has_live_session());
    assert_eq!(engine.status(), PlaybackStatus::Loading);
}

// ============================================================================
// Stale Callbacks
// ============================================================================

#[test]
fn late_load_for_superseded_track_is_discarded() {
    let mut engine = engine_with(&[("a", 10.0), ("b", 15.0)]);

    let a = engine.play_track(create_track("a", 10.0)).unwrap();
    let b = engine.play_track(create_track("b", 15.0)).unwrap();

    // B resolves first, then A straggles in
    let b_probe = finish_load(&mut engine, &b, 15.0);
    let (late, a_probe) = loaded_session("a", 10.0);
    let resolution = engine.complete_load(LoadCompletion {
        generation: a.generation,
        result: Ok(late),
    });

    assert_eq!(resolution, LoadResolution::Stale);
    assert_eq!(a_probe.calls(), vec![Call::Stop]);
    assert_eq!(current_id(&engine), "b");
    assert_eq!(engine.status(), PlaybackStatus::Playing);
    assert_eq!(engine.duration(), 15.0);
    assert!(b_probe.is_playing());
}

#[test]
fn late_failure_for_superseded_track_is_ignored() {
    let mut engine = engine_with(&[("a", 10.0), ("b", 15.0)]);

    let a = engine.play_track(create_track("a", 10.0)).unwrap();
    let b = engine.play_track(create_track("b", 15.0)).unwrap();
    finish_load(&mut engine, &b, 15.0);

    let resolution = engine.complete_load(LoadCompletion {
        generation: a.generation,
        result: Err(riff_playback::PlaybackError::audio_load("a", "gone")),
    });

    assert_eq!(resolution, LoadResolution::Stale);
    assert_eq!(engine.status(), PlaybackStatus::Playing);
}

#[test]
fn load_resolving_after_clear_is_stopped() {
    let mut engine = engine_with(&[("a", 10.0)]);
    let request = engine.play_track(create_track("a", 10.0)).unwrap();

    engine.clear_queue();

    let (loaded, probe) = loaded_session("a", 10.0);
    let resolution = engine.complete_load(LoadCompletion {
        generation: request.generation,
        result: Ok(loaded),
    });
    assert_eq!(resolution, LoadResolution::Stale);
    assert!(probe.is_stopped());
    assert_eq!(engine.status(), PlaybackStatus::Idle);
    assert!(!engine.has_live_session());
}

#[test]
fn end_signal_from_old_session_does_not_advance() {
    let mut engine = engine_with(&[("a", 10.0), ("b", 10.0), ("c", 10.0)]);
    let a = engine.play_track(create_track("a", 10.0)).unwrap();
    finish_load(&mut engine, &a, 10.0);
    let b = engine.next_track().unwrap();
    finish_load(&mut engine, &b, 10.0);

    assert!(engine.track_ended(a.generation).is_none());
    assert_eq!(current_id(&engine), "b");
    assert_eq!(engine.status(), PlaybackStatus::Playing);
}

#[test]
fn load_after_stop_at_boundary_is_stale() {
    let mut engine = engine_with(&[("a", 10.0)]);
    let request = engine.play_track(create_track("a", 10.0)).unwrap();

    // Skip past the end while still loading
    assert!(engine.next_track().is_none());
    assert_eq!(engine.status(), PlaybackStatus::Ended);

    let (loaded, probe) = loaded_session("a", 10.0);
    let resolution = engine.complete_load(LoadCompletion {
        generation: request.generation,
        result: Ok(loaded),
    });
    assert_eq!(resolution, LoadResolution::Stale);
    assert!(probe.is_stopped());
    assert_eq!(engine.status(), PlaybackStatus::Ended);
}

// ============================================================================
// Repeat & Boundaries
// ============================================================================

#[test]
fn next_on_last_slot_without_repeat_ends() {
    let mut engine = engine_with(&[("a", 10.0), ("b", 10.0)]);
    engine.play_track(create_track("b", 10.0));

    assert!(engine.next_track().is_none());
    assert_eq!(engine.status(), PlaybackStatus::Ended);
    assert_eq!(engine.queue().position(), Some(1));
}

#[test]
fn next_on_last_slot_with_repeat_all_wraps() {
    let mut engine = engine_with(&[("a", 10.0), ("b", 10.0)]);
    engine.set_repeat(RepeatMode::All);
    engine.play_track(create_track("b", 10.0));

    let request = engine.next_track().unwrap();
    assert_eq!(request.track_id.as_str(), "a");
    assert_eq!(engine.queue().position(), Some(0));
}

#[test]
fn previous_on_first_slot_with_repeat_all_wraps() {
    let mut engine = engine_with(&[("a", 10.0), ("b", 10.0), ("c", 10.0)]);
    engine.set_repeat(RepeatMode::All);
    engine.resume();

    let request = engine.previous_track().unwrap();
    assert_eq!(request.track_id.as_str(), "c");
    assert_eq!(engine.queue().position(), Some(2));
}

#[test]
fn previous_on_first_slot_without_repeat_stops() {
    let mut engine = engine_with(&[("a", 10.0), ("b", 10.0)]);
    engine.resume();

    assert!(engine.previous_track().is_none());
    assert_eq!(engine.status(), PlaybackStatus::Ended);
    assert_eq!(engine.queue().position(), Some(0));
}

#[test]
fn repeat_one_restarts_current_slot() {
    let mut engine = engine_with(&[("a", 10.0), ("b", 10.0)]);
    engine.set_repeat(RepeatMode::One);
    let first = engine.resume().unwrap();
    let probe = finish_load(&mut engine, &first, 10.0);

    let again = engine.track_ended(first.generation).unwrap();
    assert_eq!(again.track_id.as_str(), "a");
    assert!(again.generation > first.generation);
    assert!(probe.is_stopped());

    let prev = engine.previous_track().unwrap();
    assert_eq!(prev.track_id.as_str(), "a");
}

#[test]
fn single_track_repeat_all_loops() {
    let mut engine = engine_with(&[("solo", 5.0)]);
    engine.set_repeat(RepeatMode::All);

    let request = engine.resume().unwrap();
    finish_load(&mut engine, &request, 5.0);
    let request = engine.track_ended(request.generation).unwrap();

    assert_eq!(request.track_id.as_str(), "solo");
    assert_eq!(engine.status(), PlaybackStatus::Loading);
}

#[test]
fn toggle_repeat_cycles() {
    let mut engine = engine();
    assert_eq!(engine.toggle_repeat(), RepeatMode::One);
    assert_eq!(engine.toggle_repeat(), RepeatMode::All);
    assert_eq!(engine.toggle_repeat(), RepeatMode::None);
}

// ============================================================================
// Shuffle
// ============================================================================

#[test]
fn shuffle_keeps_current_track_and_playback() {
    let ids: Vec<(String, f64)> = (0..12).map(|i| (format!("t{i}"), 10.0)).collect();
    let mut engine = engine();
    engine.add_to_queue(ids.iter().map(|(id, d)| create_track(id, *d)).collect());
    let request = engine.play_track(create_track("t5", 10.0)).unwrap();
    let probe = finish_load(&mut engine, &request, 10.0);
    let generation = engine.generation();

    engine.toggle_shuffle();

    assert!(engine.shuffle_enabled());
    assert_eq!(current_id(&engine), "t5");
    assert_eq!(engine.status(), PlaybackStatus::Playing);
    assert_eq!(engine.generation(), generation);
    assert!(!probe.is_stopped());

    engine.toggle_shuffle();
    let order: Vec<String> = engine.queue().iter().map(|t| t.id.to_string()).collect();
    let expected: Vec<String> = ids.iter().map(|(id, _)| id.clone()).collect();
    assert_eq!(order, expected);
    assert_eq!(engine.queue().position(), Some(5));
}

#[test]
fn tracks_added_while_shuffled_play_last() {
    let mut engine = engine_with(&[("a", 1.0), ("b", 1.0), ("c", 1.0), ("d", 1.0)]);
    engine.set_shuffle(true);

    engine.add_to_queue(vec![create_track("late", 1.0)]);

    let last = engine.queue().iter().last().unwrap();
    assert_eq!(last.id.as_str(), "late");
}

#[test]
fn shuffled_next_follows_play_order() {
    let mut engine = engine_with(&[("a", 1.0), ("b", 1.0), ("c", 1.0), ("d", 1.0), ("e", 1.0)]);
    engine.set_shuffle(true);
    let order: Vec<String> = engine.queue().iter().map(|t| t.id.to_string()).collect();

    let first = engine.queue().get(0).cloned().unwrap();
    engine.play_track(first);
    let mut visited = vec![current_id(&engine)];
    while engine.next_track().is_some() {
        visited.push(current_id(&engine));
    }

    assert_eq!(visited, order);
    assert_eq!(engine.status(), PlaybackStatus::Ended);
}

#[test]
fn initial_shuffle_plays_whole_queue_from_first_slot() {
    let enqueued: Vec<String> = (0..10).map(|i| format!("t{i}")).collect();

    for seed in 0..8 {
        let config = PlaybackConfig {
            shuffle: true,
            shuffle_seed: Some(seed),
            ..PlaybackConfig::default()
        };
        let tracks = enqueued.iter().map(|id| create_track(id, 10.0)).collect();
        let mut engine = PlaybackEngine::with_queue(&config, tracks);

        assert_eq!(engine.queue().position(), Some(0), "seed {seed}");
        let order: Vec<String> = engine.queue().iter().map(|t| t.id.to_string()).collect();

        let mut visited = Vec::new();
        let mut request = engine.resume();
        while let Some(load) = request {
            finish_load(&mut engine, &load, 10.0);
            visited.push(current_id(&engine));
            request = engine.next_track();
        }

        assert_eq!(engine.status(), PlaybackStatus::Ended, "seed {seed}");
        assert_eq!(visited, order, "seed {seed}");
    }
}

#[test]
fn toggling_shuffle_before_playback_keeps_current_track() {
    let mut engine = engine_with(&[("a", 1.0), ("b", 1.0), ("c", 1.0), ("d", 1.0)]);

    engine.toggle_shuffle();

    assert_eq!(current_id(&engine), "a");
}

// ============================================================================
// Volume & Seek
// ============================================================================

#[test]
fn volume_during_loading_applies_to_new_session() {
    let mut engine = engine_with(&[("a", 10.0)]);
    let request = engine.resume().unwrap();

    engine.set_volume(0.3);
    engine.seek_to(4.0);
    assert_eq!(engine.current_time(), 4.0);

    let probe = finish_load(&mut engine, &request, 10.0);
    assert_eq!(probe.calls(), vec![Call::Volume(0.3), Call::Play]);
    assert_eq!(engine.current_time(), 0.0);
}

#[test]
fn muted_session_starts_silent() {
    let mut engine = engine_with(&[("a", 10.0)]);
    engine.mute();

    let request = engine.resume().unwrap();
    let probe = finish_load(&mut engine, &request, 10.0);

    assert_eq!(probe.calls()[0], Call::Volume(0.0));
    assert!(engine.is_muted());
    assert_eq!(engine.volume(), 0.8);

    engine.toggle_mute();
    assert_eq!(probe.last(), Some(Call::Volume(0.8)));
}

#[test]
fn seek_forwards_clamped_position() {
    let mut engine = engine_with(&[("a", 10.0)]);
    let request = engine.resume().unwrap();
    let probe = finish_load(&mut engine, &request, 12.0);

    engine.seek_to(99.0);
    assert_eq!(probe.last(), Some(Call::Seek(12.0)));
    assert_eq!(engine.current_time(), 12.0);

    engine.seek_to_percent(0.25);
    assert_eq!(probe.last(), Some(Call::Seek(3.0)));
}

#[test]
fn sync_position_only_while_playing() {
    let mut engine = engine_with(&[("a", 10.0)]);
    let request = engine.resume().unwrap();
    let probe = finish_load(&mut engine, &request, 10.0);

    probe.set_position(3.5);
    assert!(engine.sync_position());
    assert_eq!(engine.current_time(), 3.5);

    // Unchanged position is not a change
    assert!(!engine.sync_position());

    engine.pause();
    probe.set_position(7.0);
    assert!(!engine.sync_position());
    assert_eq!(engine.current_time(), 3.5);

    // Decoder overshoot is clamped
    engine.resume();
    probe.set_position(11.0);
    assert!(engine.sync_position());
    assert_eq!(engine.current_time(), 10.0);
}

// ============================================================================
// Metadata-only tracks
// ============================================================================

#[test]
fn metadata_only_tracks_advance_without_loads() {
    let mut engine = engine();
    engine.add_to_queue(vec![
        Track::metadata_only("m1", "Preview 1", 30.0),
        Track::metadata_only("m2", "Preview 2", 30.0),
    ]);

    assert!(engine.resume().is_none());
    assert_eq!(engine.status(), PlaybackStatus::Playing);

    assert!(engine.next_track().is_none());
    assert_eq!(current_id(&engine), "m2");
    assert_eq!(engine.status(), PlaybackStatus::Playing);

    engine.seek_to(12.0);
    assert_eq!(engine.current_time(), 12.0);
    assert!(!engine.sync_position());
}

#[test]
fn end_signal_for_metadata_track_is_ignored() {
    let mut engine = engine();
    engine.add_to_queue(vec![Track::metadata_only("m1", "Preview", 30.0)]);
    engine.resume();

    assert!(engine.track_ended(engine.generation()).is_none());
    assert_eq!(engine.status(), PlaybackStatus::Playing);
}

// ============================================================================
// Queue & Events
// ============================================================================

#[test]
fn clear_queue_resets_to_idle_baseline() {
    let mut engine = engine_with(&[("a", 10.0), ("b", 10.0)]);
    engine.set_shuffle(true);
    engine.set_volume(0.4);
    let request = engine.resume().unwrap();
    finish_load(&mut engine, &request, 10.0);
    engine.seek_to(5.0);

    engine.clear_queue();

    let snapshot = engine.snapshot();
    assert_eq!(snapshot.status, PlaybackStatus::Idle);
    assert!(snapshot.current_track.is_none());
    assert_eq!(snapshot.current_time, 0.0);
    assert_eq!(snapshot.duration, 0.0);
    assert_eq!(snapshot.position, None);
    assert_eq!(snapshot.queue_length, 0);
    assert_eq!(snapshot.volume, 0.4);
    assert!(snapshot.shuffle_enabled);

    // Intents are no-ops now
    assert!(engine.next_track().is_none());
    assert!(engine.resume().is_none());
    assert_eq!(engine.status(), PlaybackStatus::Idle);
}

#[test]
fn duplicate_tracks_are_skipped() {
    let mut engine = engine_with(&[("a", 10.0)]);
    engine.add_to_queue(vec![create_track("a", 99.0), create_track("b", 10.0)]);

    assert_eq!(engine.queue().len(), 2);
    assert_eq!(engine.queue().tracks()[0].duration, 10.0);
}

#[test]
fn first_enqueue_selects_first_track() {
    let mut engine = engine();
    engine.add_to_queue(vec![create_track("a", 42.0)]);

    let snapshot = engine.snapshot();
    assert_eq!(snapshot.status, PlaybackStatus::Idle);
    assert_eq!(snapshot.current_track.unwrap().id.as_str(), "a");
    assert_eq!(snapshot.duration, 42.0);
    assert_eq!(snapshot.position, Some(0));
}

#[test]
fn events_describe_a_track_start() {
    let mut engine = engine_with(&[("a", 10.0), ("b", 10.0)]);
    engine.drain_events();

    let request = engine.next_track().unwrap();
    finish_load(&mut engine, &request, 10.0);
    let events = engine.drain_events();

    assert!(events.contains(&PlaybackEvent::TrackChanged {
        track_id: Some(riff_playback::TrackId::new("b")),
        previous_track_id: Some(riff_playback::TrackId::new("a")),
    }));
    assert!(events.contains(&PlaybackEvent::StatusChanged {
        status: PlaybackStatus::Loading
    }));
    assert!(events.contains(&PlaybackEvent::StatusChanged {
        status: PlaybackStatus::Playing
    }));
    assert!(!engine.has_pending_events());
}

#[test]
fn failed_load_keeps_track_and_allows_retry() {
    let mut engine = engine_with(&[("a", 10.0)]);
    let request = engine.resume().unwrap();

    let resolution = engine.complete_load(LoadCompletion {
        generation: request.generation,
        result: Err(riff_playback::PlaybackError::audio_load("/music/a.mp3", "404")),
    });
    assert!(matches!(resolution, LoadResolution::Failed(_)));
    assert_eq!(engine.status(), PlaybackStatus::Idle);
    assert_eq!(current_id(&engine), "a");

    let retry = engine.resume().unwrap();
    assert!(retry.generation > request.generation);
}

#[test]
fn shutdown_stops_session() {
    let mut engine = engine_with(&[("a", 10.0)]);
    let request = engine.resume().unwrap();
    let probe = finish_load(&mut engine, &request, 10.0);

    engine.shutdown();

    assert!(probe.is_stopped());
    assert_eq!(engine.status(), PlaybackStatus::Idle);
    assert!(engine.generation() > request.generation);
}
