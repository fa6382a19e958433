//! Playback gate: stop requests that only succeed inside stoppable windows
//!
//! The gate owns the window list and the attempt counters and drives an
//! injected [`PlaybackEngine`]. Every operation is synchronous; callers that
//! share a gate across threads serialize access behind one mutex (see
//! [`crate::session::AlarmSession`]).
//!
//! Session lifecycle:
//!
//! ```text
//! Unloaded --load_and_prepare--> Ready --teardown--> Released
//!    |  ^                          |
//!    |  +---- failed reload -------+
//!    +------------teardown-----------------------------> Released
//! ```
//!
//! Engine-touching operations are no-ops outside `Ready`, except that
//! `absolute_stop` and `teardown` still pause an engine that reports playing.
//! Window and limit configuration is in-memory only and accepted in every
//! state.
//!
//! Loading and seeking advance the finished-notifier generation, so an
//! end-of-track signal queued before either is dropped instead of restarting
//! the new position.

use crate::engine::{FinishedNotifier, FinishedSignal, MediaSource, PlaybackEngine};
use crate::error::{Error, Result};
use crate::gate::window::{TimeWindow, WindowEntry, WindowId};
use serde::Serialize;
use std::fmt;
use tracing::{debug, info, warn};
use ultra_common::events::StopOutcomeKind;

/// Attempts honored per loop unless configured otherwise
pub const DEFAULT_ATTEMPT_LIMIT: u32 = 1;

/// Session state of a gate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GateState {
    /// No source loaded (initial, or after a failed load)
    Unloaded,
    /// Source loaded; engine may be playing or paused
    Ready,
    /// Engine released; terminal
    Released,
}

impl fmt::Display for GateState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GateState::Unloaded => write!(f, "unloaded"),
            GateState::Ready => write!(f, "ready"),
            GateState::Released => write!(f, "released"),
        }
    }
}

/// What a gated stop request did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    /// Position fell inside `window`; the engine was paused
    Paused { window: WindowId, position_ms: i64 },
    /// Position matched no window; the attempt is still spent
    OutsideWindows { position_ms: i64 },
    /// Attempt count went past the limit; silently ignored
    LimitExceeded,
    /// Gate not ready; nothing happened and nothing was counted
    Inactive,
}

impl StopOutcome {
    pub fn kind(&self) -> StopOutcomeKind {
        match self {
            StopOutcome::Paused { .. } => StopOutcomeKind::Paused,
            StopOutcome::OutsideWindows { .. } => StopOutcomeKind::OutsideWindows,
            StopOutcome::LimitExceeded => StopOutcomeKind::LimitExceeded,
            StopOutcome::Inactive => StopOutcomeKind::Inactive,
        }
    }

    pub fn paused(&self) -> bool {
        matches!(self, StopOutcome::Paused { .. })
    }
}

/// Gated playback controller
pub struct PlaybackGate<E: PlaybackEngine> {
    engine: E,
    state: GateState,
    source: Option<MediaSource>,
    finished: Option<FinishedNotifier>,
    windows: Vec<WindowEntry>,
    attempt_count: u32,
    attempt_limit: u32,
}

impl<E: PlaybackEngine> PlaybackGate<E> {
    /// Create an unloaded gate around `engine` with the default attempt limit
    pub fn new(engine: E) -> Self {
        Self {
            engine,
            state: GateState::Unloaded,
            source: None,
            finished: None,
            windows: Vec::new(),
            attempt_count: 0,
            attempt_limit: DEFAULT_ATTEMPT_LIMIT,
        }
    }

    /// Register the engine's finished-notification channel
    pub fn attach_finished_notifier(&mut self, notifier: FinishedNotifier) {
        if self.state == GateState::Released {
            warn!("Ignoring finished notifier for released gate");
            return;
        }
        self.finished = Some(notifier.clone());
        self.engine.set_finished_notifier(notifier);
    }

    fn invalidate_finished_signals(&self) {
        if let Some(notifier) = &self.finished {
            notifier.advance();
        }
    }

    /// Set the source and prepare it for playback.
    ///
    /// # Errors
    /// - `Error::AlreadyReleased` after teardown
    /// - `Error::Source` when the engine cannot open or decode the source;
    ///   the gate is left `Unloaded`
    pub fn load_and_prepare(&mut self, source: MediaSource) -> Result<()> {
        if self.state == GateState::Released {
            return Err(Error::AlreadyReleased);
        }

        let loaded = self.engine.load(&source);
        self.invalidate_finished_signals();

        if let Err(e) = loaded {
            warn!("Failed to load {}: {}", source, e);
            if self.engine.is_playing() {
                self.engine.pause();
            }
            self.state = GateState::Unloaded;
            self.source = None;
            self.attempt_count = 0;
            return Err(match e {
                Error::Source { .. } => e,
                other => Error::Source {
                    source_name: source.to_string(),
                    message: other.to_string(),
                },
            });
        }

        info!("Loaded {} ({} ms)", source, self.engine.duration_ms());
        self.state = GateState::Ready;
        self.source = Some(source);
        self.attempt_count = 0;
        Ok(())
    }

    /// Start or resume playback. Never gated.
    ///
    /// Returns false when no source is loaded.
    pub fn start(&mut self) -> bool {
        if self.state != GateState::Ready {
            debug!("start ignored: gate is {}", self.state);
            return false;
        }
        self.engine.start();
        true
    }

    /// Gated stop request.
    ///
    /// Every call while ready spends one attempt. Attempts beyond the limit
    /// are ignored until a seek or loop completion refreshes the budget.
    /// Otherwise the first window in insertion order that contains the
    /// current position pauses the engine.
    pub fn request_stop(&mut self) -> StopOutcome {
        if self.state != GateState::Ready {
            debug!("request_stop ignored: gate is {}", self.state);
            return StopOutcome::Inactive;
        }

        self.attempt_count = self.attempt_count.saturating_add(1);
        if self.attempt_count > self.attempt_limit {
            debug!(
                "Stop attempt {} exceeds limit {}, ignored",
                self.attempt_count, self.attempt_limit
            );
            return StopOutcome::LimitExceeded;
        }

        let position_ms = self.engine.position_ms();
        match self.windows.iter().find(|entry| entry.window.contains(position_ms)) {
            Some(entry) => {
                debug!(
                    "Stop attempt {}/{} at {} ms inside {}, pausing",
                    self.attempt_count, self.attempt_limit, position_ms, entry.window
                );
                self.engine.pause();
                StopOutcome::Paused {
                    window: entry.id,
                    position_ms,
                }
            }
            None => {
                debug!(
                    "Stop attempt {}/{} at {} ms outside all windows",
                    self.attempt_count, self.attempt_limit, position_ms
                );
                StopOutcome::OutsideWindows { position_ms }
            }
        }
    }

    /// Pause unconditionally when playing. Bypasses windows and counters.
    ///
    /// Returns true when a pause was issued.
    pub fn absolute_stop(&mut self) -> bool {
        if self.state == GateState::Released || !self.engine.is_playing() {
            return false;
        }
        self.engine.pause();
        true
    }

    /// Refresh the attempt budget and move the playhead.
    ///
    /// Play/pause state is unchanged.
    pub fn seek(&mut self, position_ms: i64) -> bool {
        if self.state != GateState::Ready {
            debug!("seek ignored: gate is {}", self.state);
            return false;
        }
        self.attempt_count = 0;
        self.engine.seek(position_ms);
        self.invalidate_finished_signals();
        true
    }

    /// Append a stoppable window. Duplicates and overlaps are allowed.
    pub fn add_window(&mut self, start_ms: i64, end_ms: i64) -> WindowId {
        let entry = WindowEntry {
            id: WindowId::new(),
            window: TimeWindow::new(start_ms, end_ms),
        };
        debug!("Added window {} as {}", entry.window, entry.id);
        self.windows.push(entry);
        entry.id
    }

    /// Remove a window by handle
    pub fn remove_window(&mut self, id: WindowId) -> Result<TimeWindow> {
        let index = self
            .windows
            .iter()
            .position(|entry| entry.id == id)
            .ok_or(Error::UnknownWindow(id.as_uuid()))?;
        let entry = self.windows.remove(index);
        debug!("Removed window {} ({})", entry.window, entry.id);
        Ok(entry.window)
    }

    /// Remove a window by its position in insertion order
    pub fn remove_window_at(&mut self, index: usize) -> Result<WindowEntry> {
        if index >= self.windows.len() {
            return Err(Error::IndexOutOfRange {
                index: i64::try_from(index).unwrap_or(i64::MAX),
                len: self.windows.len(),
            });
        }
        let entry = self.windows.remove(index);
        debug!("Removed window #{} {} ({})", index, entry.window, entry.id);
        Ok(entry)
    }

    /// Set the attempts honored per loop; values below 1 become 1.
    ///
    /// Returns the stored value.
    pub fn set_attempt_limit(&mut self, limit: i64) -> u32 {
        self.attempt_limit = u32::try_from(limit.max(1)).unwrap_or(u32::MAX);
        debug!("Attempt limit set to {}", self.attempt_limit);
        self.attempt_limit
    }

    /// Completion handler: rewind, restart and refresh the attempt budget.
    ///
    /// Returns false when the gate is not ready.
    pub fn on_engine_finished(&mut self) -> bool {
        if self.state != GateState::Ready {
            debug!("finished notification ignored: gate is {}", self.state);
            return false;
        }
        self.engine.seek(0);
        self.engine.start();
        self.attempt_count = 0;
        debug!("Loop completed, restarted from 0");
        true
    }

    /// Completion handler for a delivered signal.
    ///
    /// Signals sent before the latest load or seek are dropped.
    pub fn on_finished_signal(&mut self, signal: FinishedSignal) -> bool {
        let current = self
            .finished
            .as_ref()
            .map_or(true, |notifier| notifier.is_current(signal));
        if !current {
            debug!(
                "Dropping stale finished notification (generation {})",
                signal.generation()
            );
            return false;
        }
        self.on_engine_finished()
    }

    /// Stop if playing and release the engine. Safe to call repeatedly.
    pub fn teardown(&mut self) {
        if self.state == GateState::Released {
            return;
        }
        if self.engine.is_playing() {
            self.engine.stop();
        }
        self.engine.release();
        self.state = GateState::Released;
        self.source = None;
        info!("Playback gate released");
    }

    pub fn state(&self) -> GateState {
        self.state
    }

    pub fn source(&self) -> Option<&MediaSource> {
        self.source.as_ref()
    }

    pub fn attempt_count(&self) -> u32 {
        self.attempt_count
    }

    pub fn attempt_limit(&self) -> u32 {
        self.attempt_limit
    }

    /// Windows in insertion (scan) order
    pub fn windows(&self) -> &[WindowEntry] {
        &self.windows
    }

    /// Engine position, 0 unless ready
    pub fn position_ms(&self) -> i64 {
        if self.state == GateState::Ready {
            self.engine.position_ms()
        } else {
            0
        }
    }

    /// Engine duration, 0 unless ready
    pub fn duration_ms(&self) -> i64 {
        if self.state == GateState::Ready {
            self.engine.duration_ms()
        } else {
            0
        }
    }

    pub fn is_playing(&self) -> bool {
        self.state == GateState::Ready && self.engine.is_playing()
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }
}

impl<E: PlaybackEngine> Drop for PlaybackGate<E> {
    fn drop(&mut self) {
        self.teardown();
    }
}
