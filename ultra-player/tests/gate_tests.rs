//! Playback gate behavior against a recording engine
//!
//! Covers stop gating, attempt accounting, window management, the completion
//! handler and the session state machine.

mod helpers;

use helpers::{EngineCall, MockEngine, MockHandle};
use ultra_player::engine::{FinishedNotifier, MediaSource};
use ultra_player::error::Error;
use ultra_player::gate::{GateState, PlaybackGate, StopOutcome, TimeWindow, WindowId};
use uuid::Uuid;

fn loaded_gate() -> (PlaybackGate<MockEngine>, MockHandle) {
    let (engine, handle) = MockEngine::new();
    let mut gate = PlaybackGate::new(engine);
    gate.load_and_prepare(MediaSource::parse("/music/ultra_soul.mp3"))
        .expect("mock load succeeds");
    (gate, handle)
}

/// Gate loaded and playing with the default limit and one 4.3s-5.0s window
fn alarm_gate() -> (PlaybackGate<MockEngine>, MockHandle, WindowId) {
    let (mut gate, handle) = loaded_gate();
    let id = gate.add_window(4300, 5000);
    gate.start();
    handle.clear_calls();
    (gate, handle, id)
}

// ============================================================================
// Gated stop
// ============================================================================

/// **Given:** limit 1, window [4300,5000], playing at 4600
/// **When:** stop is requested twice
/// **Then:** the first pauses, the second does nothing
#[test]
fn test_stop_inside_window_pauses_once_per_loop() {
    let (mut gate, handle, id) = alarm_gate();
    handle.set_position(4600);

    assert_eq!(
        gate.request_stop(),
        StopOutcome::Paused {
            window: id,
            position_ms: 4600
        }
    );
    assert!(!handle.is_playing());
    assert_eq!(gate.attempt_count(), 1);

    gate.start();
    handle.clear_calls();

    assert_eq!(gate.request_stop(), StopOutcome::LimitExceeded);
    assert_eq!(gate.attempt_count(), 2);
    assert!(handle.is_playing());
    assert!(handle.calls().is_empty(), "limit overflow must not touch the engine");
}

/// **Given:** limit 1, window [4300,5000], playing at 6000
/// **When:** stop is requested
/// **Then:** the counter increments and playback continues
#[test]
fn test_stop_outside_window_consumes_attempt() {
    let (mut gate, handle, _) = alarm_gate();
    handle.set_position(6000);

    assert_eq!(
        gate.request_stop(),
        StopOutcome::OutsideWindows { position_ms: 6000 }
    );
    assert_eq!(gate.attempt_count(), 1);
    assert!(handle.is_playing());
    assert_eq!(handle.count(&EngineCall::Pause), 0);

    // The wasted attempt is not refunded once the playhead enters the window
    handle.set_position(4600);
    assert_eq!(gate.request_stop(), StopOutcome::LimitExceeded);
    assert!(handle.is_playing());
}

/// **Given:** a window [4300,5000]
/// **When:** stop is requested exactly on each boundary
/// **Then:** both boundaries pause
#[test]
fn test_window_boundaries_are_inclusive() {
    for position in [4300, 5000] {
        let (mut gate, handle, _) = alarm_gate();
        handle.set_position(position);
        assert!(gate.request_stop().paused(), "boundary {}", position);
    }

    for position in [4299, 5001] {
        let (mut gate, handle, _) = alarm_gate();
        handle.set_position(position);
        assert!(!gate.request_stop().paused(), "outside {}", position);
    }
}

/// **Given:** overlapping windows [(1000,2000), (1500,1800)]
/// **When:** stop is requested at 1600
/// **Then:** the first window in insertion order matches and one pause is issued
#[test]
fn test_first_matching_window_wins() {
    let (mut gate, handle) = loaded_gate();
    let first = gate.add_window(1000, 2000);
    let _second = gate.add_window(1500, 1800);
    gate.start();
    handle.clear_calls();
    handle.set_position(1600);

    assert_eq!(
        gate.request_stop(),
        StopOutcome::Paused {
            window: first,
            position_ms: 1600
        }
    );
    assert_eq!(handle.calls(), vec![EngineCall::Pause]);
}

/// **Given:** limit 3 and no windows
/// **When:** stop is requested four times
/// **Then:** three attempts are evaluated, the fourth is over the limit
#[test]
fn test_limit_counts_every_attempt() {
    let (mut gate, handle) = loaded_gate();
    assert_eq!(gate.set_attempt_limit(3), 3);
    gate.start();

    for attempt in 1..=3 {
        assert!(matches!(
            gate.request_stop(),
            StopOutcome::OutsideWindows { .. }
        ));
        assert_eq!(gate.attempt_count(), attempt);
    }
    assert_eq!(gate.request_stop(), StopOutcome::LimitExceeded);
    assert_eq!(gate.attempt_count(), 4);
    assert!(handle.is_playing());
}

/// **Given:** a limit of 0 or a negative limit
/// **When:** it is stored
/// **Then:** it becomes 1, so one attempt per loop is always honored
#[test]
fn test_attempt_limit_is_at_least_one() {
    let (mut gate, handle, _) = alarm_gate();
    assert_eq!(gate.set_attempt_limit(0), 1);
    assert_eq!(gate.set_attempt_limit(-5), 1);
    assert_eq!(gate.attempt_limit(), 1);

    handle.set_position(4500);
    assert!(gate.request_stop().paused());
}

// ============================================================================
// Forced stop, seek and completion
// ============================================================================

/// **Given:** the attempt budget is exhausted
/// **When:** absolute stop is requested
/// **Then:** playback pauses and the counter is untouched
#[test]
fn test_absolute_stop_bypasses_gate() {
    let (mut gate, handle, _) = alarm_gate();
    handle.set_position(9000);
    gate.request_stop();
    gate.request_stop();
    assert_eq!(gate.attempt_count(), 2);

    assert!(gate.absolute_stop());
    assert!(!handle.is_playing());
    assert_eq!(gate.attempt_count(), 2);

    // Already paused: nothing to do
    assert!(!gate.absolute_stop());
    assert_eq!(handle.count(&EngineCall::Pause), 1);
}

/// **Given:** exhausted attempts
/// **When:** seeking to 0
/// **Then:** the counter resets and the next stop is evaluated fresh
#[test]
fn test_seek_resets_attempts() {
    let (mut gate, handle, _) = alarm_gate();
    handle.set_position(100);
    gate.request_stop();
    assert_eq!(gate.request_stop(), StopOutcome::LimitExceeded);

    assert!(gate.seek(0));
    assert_eq!(gate.attempt_count(), 0);
    assert!(matches!(
        gate.request_stop(),
        StopOutcome::OutsideWindows { position_ms: 0 }
    ));

    assert!(gate.seek(4400));
    assert!(gate.request_stop().paused());
}

/// **Given:** a paused gate
/// **When:** seeking
/// **Then:** the engine seeks but stays paused
#[test]
fn test_seek_keeps_play_state() {
    let (mut gate, handle) = loaded_gate();
    handle.clear_calls();

    gate.seek(2500);
    assert_eq!(handle.calls(), vec![EngineCall::Seek(2500)]);
    assert!(!handle.is_playing());
}

/// **Given:** a played-out loop with spent attempts
/// **When:** the engine reports completion
/// **Then:** playback restarts from 0 and the counter resets
#[test]
fn test_engine_finished_restarts_loop() {
    let (mut gate, handle, _) = alarm_gate();
    handle.set_position(8000);
    gate.request_stop();
    handle.finish();

    assert!(gate.on_engine_finished());

    assert_eq!(handle.calls(), vec![EngineCall::Seek(0), EngineCall::Start]);
    assert_eq!(handle.position_ms(), 0);
    assert!(handle.is_playing());
    assert_eq!(gate.attempt_count(), 0);
}

// ============================================================================
// Window management
// ============================================================================

/// **Given:** windows added with reversed bounds and duplicates
/// **When:** listing them
/// **Then:** bounds are normalized and insertion order is kept
#[test]
fn test_windows_keep_insertion_order() {
    let (engine, _handle) = MockEngine::new();
    let mut gate = PlaybackGate::new(engine);
    let a = gate.add_window(5000, 4300);
    let b = gate.add_window(1000, 2000);
    let c = gate.add_window(1000, 2000);

    let listed: Vec<(WindowId, TimeWindow)> =
        gate.windows().iter().map(|e| (e.id, e.window)).collect();
    assert_eq!(
        listed,
        vec![
            (a, TimeWindow::new(4300, 5000)),
            (b, TimeWindow::new(1000, 2000)),
            (c, TimeWindow::new(1000, 2000)),
        ]
    );
    assert_ne!(b, c);
}

/// **Given:** three windows
/// **When:** removing by index, including index == len
/// **Then:** valid indices remove, out-of-range fails with the list unchanged
#[test]
fn test_remove_window_at() {
    let (mut gate, _handle) = loaded_gate();
    gate.add_window(0, 100);
    let middle = gate.add_window(200, 300);
    gate.add_window(400, 500);

    match gate.remove_window_at(3) {
        Err(Error::IndexOutOfRange { index, len }) => {
            assert_eq!(index, 3);
            assert_eq!(len, 3);
        }
        other => panic!("expected IndexOutOfRange, got {:?}", other),
    }
    assert_eq!(gate.windows().len(), 3);

    let removed = gate.remove_window_at(1).unwrap();
    assert_eq!(removed.id, middle);
    assert_eq!(removed.window, TimeWindow::new(200, 300));
    assert_eq!(gate.windows().len(), 2);
}

/// **Given:** several windows
/// **When:** removing one by handle
/// **Then:** the other handles stay valid; unknown handles fail
#[test]
fn test_remove_window_by_handle() {
    let (mut gate, _handle) = loaded_gate();
    let first = gate.add_window(0, 100);
    let second = gate.add_window(200, 300);

    assert_eq!(gate.remove_window(first).unwrap(), TimeWindow::new(0, 100));
    assert!(matches!(
        gate.remove_window(first),
        Err(Error::UnknownWindow(_))
    ));

    let stranger = WindowId::from(Uuid::new_v4());
    assert!(matches!(
        gate.remove_window(stranger),
        Err(Error::UnknownWindow(id)) if id == stranger.as_uuid()
    ));

    assert_eq!(gate.remove_window(second).unwrap(), TimeWindow::new(200, 300));
    assert!(gate.windows().is_empty());
}

/// **Given:** a window removed while the playhead sits inside it
/// **When:** stop is requested
/// **Then:** nothing pauses
#[test]
fn test_removed_window_no_longer_stops() {
    let (mut gate, handle, id) = alarm_gate();
    gate.remove_window(id).unwrap();
    handle.set_position(4600);

    assert_eq!(
        gate.request_stop(),
        StopOutcome::OutsideWindows { position_ms: 4600 }
    );
}

// ============================================================================
// State machine
// ============================================================================

/// **Given:** a gate with nothing loaded
/// **When:** engine-touching operations are called
/// **Then:** they are no-ops that never reach the engine
#[test]
fn test_unloaded_gate_is_inert() {
    let (engine, handle) = MockEngine::new();
    let mut gate = PlaybackGate::new(engine);
    gate.add_window(0, 10_000);

    assert!(!gate.start());
    assert_eq!(gate.request_stop(), StopOutcome::Inactive);
    assert!(!gate.absolute_stop());
    assert!(!gate.seek(500));
    assert!(!gate.on_engine_finished());

    assert_eq!(gate.state(), GateState::Unloaded);
    assert_eq!(gate.attempt_count(), 0);
    assert_eq!(gate.position_ms(), 0);
    assert!(handle.calls().is_empty());
}

/// **Given:** an engine that cannot open the source
/// **When:** loading
/// **Then:** SourceError carries the engine message and the gate stays inert
#[test]
fn test_failed_load_surfaces_engine_message() {
    let (engine, handle) = MockEngine::new();
    let mut gate = PlaybackGate::new(engine);
    handle.fail_next_load("No such file or directory");

    let err = gate
        .load_and_prepare(MediaSource::parse("/missing.mp3"))
        .unwrap_err();
    match err {
        Error::Source {
            source_name,
            message,
        } => {
            assert_eq!(source_name, "/missing.mp3");
            assert_eq!(message, "No such file or directory");
        }
        other => panic!("expected Source error, got {:?}", other),
    }

    assert_eq!(gate.state(), GateState::Unloaded);
    assert!(gate.source().is_none());
    assert_eq!(gate.request_stop(), StopOutcome::Inactive);
    assert!(!gate.start());
}

/// **Given:** a playing gate
/// **When:** a reload fails and the engine keeps the old track running
/// **Then:** the gate pauses it, so nothing plays while unloaded
#[test]
fn test_failed_reload_while_playing_pauses_engine() {
    let (mut gate, handle, _) = alarm_gate();
    handle.fail_next_load("corrupt");

    assert!(gate.load_and_prepare(MediaSource::parse("/bad.mp3")).is_err());

    assert_eq!(gate.state(), GateState::Unloaded);
    assert!(!handle.is_playing());
    assert_eq!(
        handle.calls(),
        vec![EngineCall::Load("/bad.mp3".to_string()), EngineCall::Pause]
    );
}

/// **Given:** an unloaded gate whose engine reports playing
/// **When:** force-stopped, then torn down
/// **Then:** both still reach the engine
#[test]
fn test_force_stop_and_teardown_work_while_unloaded() {
    let (mut gate, handle, _) = alarm_gate();
    handle.fail_next_load("corrupt");
    let _ = gate.load_and_prepare(MediaSource::parse("/bad.mp3"));
    handle.clear_calls();

    handle.set_playing(true);
    assert!(gate.absolute_stop());
    assert!(!handle.is_playing());

    handle.set_playing(true);
    gate.teardown();
    assert_eq!(
        handle.calls(),
        vec![EngineCall::Pause, EngineCall::Stop, EngineCall::Release]
    );
    assert!(!gate.absolute_stop(), "released gate ignores force stop");
}

/// **Given:** an end-of-track signal still queued
/// **When:** a new source is loaded, or the user seeks, before it is handled
/// **Then:** the signal is dropped and nothing restarts
#[test]
fn test_stale_finished_signal_is_dropped() {
    let (engine, handle) = MockEngine::new();
    let mut gate = PlaybackGate::new(engine);
    let (notifier, mut finished_rx) = FinishedNotifier::channel();
    gate.attach_finished_notifier(notifier);
    gate.load_and_prepare(MediaSource::parse("/a.mp3")).unwrap();
    gate.start();

    assert!(handle.finish());
    let before_reload = finished_rx.try_recv().unwrap();
    gate.load_and_prepare(MediaSource::parse("/b.mp3")).unwrap();
    handle.clear_calls();

    assert!(!gate.on_finished_signal(before_reload));
    assert!(handle.calls().is_empty());
    assert!(!handle.is_playing());

    gate.start();
    assert!(handle.finish());
    let before_seek = finished_rx.try_recv().unwrap();
    gate.seek(4600);
    handle.clear_calls();

    assert!(!gate.on_finished_signal(before_seek));
    assert_eq!(handle.position_ms(), 4600);
    assert!(handle.calls().is_empty());

    assert!(handle.finish());
    let current = finished_rx.try_recv().unwrap();
    assert!(gate.on_finished_signal(current));
    assert_eq!(handle.calls(), vec![EngineCall::Seek(0), EngineCall::Start]);
}

/// **Given:** a playing gate with spent attempts
/// **When:** a different source is loaded
/// **Then:** the source is replaced and the counter resets
#[test]
fn test_reload_replaces_source_and_resets_counter() {
    let (mut gate, handle, _) = alarm_gate();
    handle.set_position(100);
    gate.request_stop();
    assert_eq!(gate.attempt_count(), 1);

    gate.load_and_prepare(MediaSource::parse("file:///music/other.flac"))
        .unwrap();

    assert_eq!(gate.state(), GateState::Ready);
    assert_eq!(gate.attempt_count(), 0);
    assert_eq!(
        gate.source(),
        Some(&MediaSource::Uri("file:///music/other.flac".to_string()))
    );
    assert_eq!(gate.windows().len(), 1, "windows survive a reload");
}

/// **Given:** a playing gate
/// **When:** torn down twice
/// **Then:** the engine is stopped and released exactly once, later loads fail
#[test]
fn test_teardown_is_idempotent() {
    let (mut gate, handle, _) = alarm_gate();

    gate.teardown();
    gate.teardown();

    assert_eq!(gate.state(), GateState::Released);
    assert_eq!(handle.calls(), vec![EngineCall::Stop, EngineCall::Release]);
    assert!(handle.released());

    assert!(matches!(
        gate.load_and_prepare(MediaSource::parse("/music/again.mp3")),
        Err(Error::AlreadyReleased)
    ));
    assert_eq!(gate.request_stop(), StopOutcome::Inactive);
    assert!(!gate.on_engine_finished());

    // Configuration is still accepted
    gate.add_window(0, 1);
    assert_eq!(gate.set_attempt_limit(2), 2);
}

/// **Given:** a paused gate
/// **When:** torn down
/// **Then:** release happens without a redundant stop
#[test]
fn test_teardown_paused_skips_stop() {
    let (mut gate, handle) = loaded_gate();
    handle.clear_calls();

    gate.teardown();
    assert_eq!(handle.calls(), vec![EngineCall::Release]);
}

/// **Given:** a loaded gate
/// **When:** it is dropped without teardown
/// **Then:** the engine is still released
#[test]
fn test_drop_releases_engine() {
    let (gate, handle) = loaded_gate();
    drop(gate);
    assert!(handle.released());
}
