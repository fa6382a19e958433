//! Alarm session: shared gate, loop-restart listener and event stream
//!
//! All gate operations, including the completion handler driven by the
//! engine's finished notifications, go through one `tokio::sync::Mutex`, so
//! the attempt counter is never touched by two callers at once.

use crate::engine::{FinishedNotifier, FinishedReceiver, MediaSource, PlaybackEngine};
use crate::error::{Error, Result};
use crate::gate::{GateState, PlaybackGate, StopOutcome, TimeWindow, WindowEntry, WindowId};
use serde::Serialize;
use std::sync::{Arc, PoisonError};
use std::time::Duration;
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info};
use ultra_common::events::AlarmEvent;

/// Buffered events per subscriber before the slowest one starts lagging
const EVENT_CHANNEL_CAPACITY: usize = 100;

/// Read-only snapshot of a session
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GateStatus {
    pub state: GateState,
    pub source: Option<String>,
    pub playing: bool,
    pub position_ms: i64,
    pub duration_ms: i64,
    pub attempt_count: u32,
    pub attempt_limit: u32,
    pub windows: Vec<WindowEntry>,
}

/// Shared, event-emitting wrapper around a [`PlaybackGate`]
///
/// Must be created inside a tokio runtime.
pub struct AlarmSession<E: PlaybackEngine + 'static> {
    gate: Arc<Mutex<PlaybackGate<E>>>,
    event_tx: broadcast::Sender<AlarmEvent>,
    tasks: std::sync::Mutex<Vec<JoinHandle<()>>>,
}

impl<E: PlaybackEngine + 'static> AlarmSession<E> {
    /// Wrap `engine` in an unloaded gate and start the completion listener
    pub fn new(engine: E) -> Self {
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let (notifier, finished_rx) = FinishedNotifier::channel();

        let mut gate = PlaybackGate::new(engine);
        gate.attach_finished_notifier(notifier);
        let gate = Arc::new(Mutex::new(gate));

        let listener = tokio::spawn(run_finished_listener(
            Arc::clone(&gate),
            finished_rx,
            event_tx.clone(),
        ));

        Self {
            gate,
            event_tx,
            tasks: std::sync::Mutex::new(vec![listener]),
        }
    }

    /// Subscribe to session events
    pub fn subscribe(&self) -> broadcast::Receiver<AlarmEvent> {
        self.event_tx.subscribe()
    }

    fn broadcast_event(&self, event: AlarmEvent) {
        // No receivers is fine
        let _ = self.event_tx.send(event);
    }

    /// Load a source on the blocking pool.
    ///
    /// Decoding can take a while; the gate stays locked for the duration, but
    /// no runtime worker is held up.
    pub async fn load(&self, source: MediaSource) -> Result<()> {
        let name = source.to_string();
        let gate = Arc::clone(&self.gate);
        let loaded = tokio::task::spawn_blocking(move || {
            let mut gate = gate.blocking_lock();
            gate.load_and_prepare(source).map(|()| gate.duration_ms())
        })
        .await
        .unwrap_or_else(|e| {
            Err(Error::Source {
                source_name: name.clone(),
                message: format!("load task failed: {}", e),
            })
        });

        match loaded {
            Ok(duration_ms) => {
                self.broadcast_event(AlarmEvent::SourceLoaded {
                    source: name,
                    duration_ms,
                    timestamp: chrono::Utc::now(),
                });
                Ok(())
            }
            Err(e) => {
                self.broadcast_event(AlarmEvent::SourceFailed {
                    source: name,
                    message: e.to_string(),
                    timestamp: chrono::Utc::now(),
                });
                Err(e)
            }
        }
    }

    pub async fn start(&self) -> bool {
        let mut gate = self.gate.lock().await;
        let started = gate.start();
        if started {
            self.broadcast_event(AlarmEvent::PlaybackStarted {
                position_ms: gate.position_ms(),
                timestamp: chrono::Utc::now(),
            });
        }
        started
    }

    /// Gated stop; see [`PlaybackGate::request_stop`]
    pub async fn request_stop(&self) -> StopOutcome {
        let mut gate = self.gate.lock().await;
        let outcome = gate.request_stop();
        self.broadcast_event(AlarmEvent::StopAttempted {
            attempt: gate.attempt_count(),
            attempt_limit: gate.attempt_limit(),
            outcome: outcome.kind(),
            timestamp: chrono::Utc::now(),
        });
        outcome
    }

    pub async fn absolute_stop(&self) -> bool {
        let paused = self.gate.lock().await.absolute_stop();
        self.broadcast_event(AlarmEvent::ForcedStop {
            paused,
            timestamp: chrono::Utc::now(),
        });
        paused
    }

    pub async fn seek(&self, position_ms: i64) -> bool {
        let mut gate = self.gate.lock().await;
        let seeked = gate.seek(position_ms);
        if seeked {
            self.broadcast_event(AlarmEvent::Seeked {
                position_ms: gate.position_ms(),
                timestamp: chrono::Utc::now(),
            });
        }
        seeked
    }

    pub async fn add_window(&self, start_ms: i64, end_ms: i64) -> WindowId {
        let mut gate = self.gate.lock().await;
        let id = gate.add_window(start_ms, end_ms);
        let window = TimeWindow::new(start_ms, end_ms);
        self.broadcast_event(AlarmEvent::WindowAdded {
            window_id: id.as_uuid(),
            start_ms: window.start_ms(),
            end_ms: window.end_ms(),
            timestamp: chrono::Utc::now(),
        });
        id
    }

    pub async fn remove_window(&self, id: WindowId) -> Result<TimeWindow> {
        let window = self.gate.lock().await.remove_window(id)?;
        self.broadcast_window_removed(id, window);
        Ok(window)
    }

    pub async fn remove_window_at(&self, index: usize) -> Result<WindowEntry> {
        let entry = self.gate.lock().await.remove_window_at(index)?;
        self.broadcast_window_removed(entry.id, entry.window);
        Ok(entry)
    }

    fn broadcast_window_removed(&self, id: WindowId, window: TimeWindow) {
        self.broadcast_event(AlarmEvent::WindowRemoved {
            window_id: id.as_uuid(),
            start_ms: window.start_ms(),
            end_ms: window.end_ms(),
            timestamp: chrono::Utc::now(),
        });
    }

    /// Returns the stored limit (at least 1)
    pub async fn set_attempt_limit(&self, limit: i64) -> u32 {
        let stored = self.gate.lock().await.set_attempt_limit(limit);
        self.broadcast_event(AlarmEvent::AttemptLimitChanged {
            attempt_limit: stored,
            timestamp: chrono::Utc::now(),
        });
        stored
    }

    pub async fn status(&self) -> GateStatus {
        let gate = self.gate.lock().await;
        GateStatus {
            state: gate.state(),
            source: gate.source().map(ToString::to_string),
            playing: gate.is_playing(),
            position_ms: gate.position_ms(),
            duration_ms: gate.duration_ms(),
            attempt_count: gate.attempt_count(),
            attempt_limit: gate.attempt_limit(),
            windows: gate.windows().to_vec(),
        }
    }

    /// Periodically broadcast `PlaybackPosition` until the session is released.
    ///
    /// Only reads the gate.
    pub fn spawn_position_monitor(&self, interval: Duration) {
        let gate = Arc::clone(&self.gate);
        let event_tx = self.event_tx.clone();

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                let event = {
                    let gate = gate.lock().await;
                    if gate.state() == GateState::Released {
                        break;
                    }
                    AlarmEvent::PlaybackPosition {
                        position_ms: gate.position_ms(),
                        duration_ms: gate.duration_ms(),
                        playing: gate.is_playing(),
                        attempt_count: gate.attempt_count(),
                        timestamp: chrono::Utc::now(),
                    }
                };
                let _ = event_tx.send(event);
            }
            debug!("Position monitor stopped");
        });

        self.tasks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(handle);
    }

    /// Tear down the gate and stop background tasks. Safe to call repeatedly.
    pub async fn teardown(&self) {
        {
            let mut gate = self.gate.lock().await;
            if gate.state() != GateState::Released {
                gate.teardown();
                self.broadcast_event(AlarmEvent::SessionReleased {
                    timestamp: chrono::Utc::now(),
                });
                info!("Alarm session released");
            }
        }
        self.abort_tasks();
    }

    fn abort_tasks(&self) {
        let mut tasks = self.tasks.lock().unwrap_or_else(PoisonError::into_inner);
        for task in tasks.drain(..) {
            task.abort();
        }
    }
}

impl<E: PlaybackEngine + 'static> Drop for AlarmSession<E> {
    fn drop(&mut self) {
        self.abort_tasks();
    }
}

/// Serialize engine completions through the gate lock
async fn run_finished_listener<E: PlaybackEngine>(
    gate: Arc<Mutex<PlaybackGate<E>>>,
    mut finished_rx: FinishedReceiver,
    event_tx: broadcast::Sender<AlarmEvent>,
) {
    while let Some(signal) = finished_rx.recv().await {
        let restarted = gate.lock().await.on_finished_signal(signal);
        if restarted {
            let _ = event_tx.send(AlarmEvent::LoopRestarted {
                timestamp: chrono::Utc::now(),
            });
        }
    }
    debug!("Finished listener stopped");
}
