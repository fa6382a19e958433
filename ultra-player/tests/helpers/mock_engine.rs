//! Recording mock of the playback engine
//!
//! `MockEngine` goes into the gate; the paired `MockHandle` stays with the
//! test to move the playhead, script load failures, simulate end of track and
//! inspect the calls the gate made.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use ultra_player::engine::{FinishedNotifier, MediaSource, PlaybackEngine};
use ultra_player::error::{Error, Result};

/// Default duration reported after a successful load
pub const MOCK_DURATION_MS: i64 = 10_000;

/// One call the gate made on the engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineCall {
    Load(String),
    Start,
    Pause,
    Stop,
    Seek(i64),
    Release,
}

#[derive(Debug, Default)]
struct MockState {
    calls: Vec<EngineCall>,
    playing: bool,
    position_ms: i64,
    duration_ms: i64,
    fail_next_load: Option<String>,
    load_delay: Option<Duration>,
    notifier: Option<FinishedNotifier>,
    released: bool,
}

pub struct MockEngine {
    state: Arc<Mutex<MockState>>,
}

/// Test-side view of a [`MockEngine`]
#[derive(Clone)]
pub struct MockHandle {
    state: Arc<Mutex<MockState>>,
}

impl MockEngine {
    pub fn new() -> (Self, MockHandle) {
        let state = Arc::new(Mutex::new(MockState::default()));
        (
            Self {
                state: Arc::clone(&state),
            },
            MockHandle { state },
        )
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap()
    }
}

impl PlaybackEngine for MockEngine {
    fn load(&mut self, source: &MediaSource) -> Result<()> {
        let delay = self.state().load_delay;
        if let Some(delay) = delay {
            // Stand-in for a slow decode; blocks the calling thread
            std::thread::sleep(delay);
        }
        let mut state = self.state();
        state.calls.push(EngineCall::Load(source.to_string()));
        if let Some(message) = state.fail_next_load.take() {
            return Err(Error::Source {
                source_name: source.to_string(),
                message,
            });
        }
        state.playing = false;
        state.position_ms = 0;
        state.duration_ms = MOCK_DURATION_MS;
        Ok(())
    }

    fn start(&mut self) {
        let mut state = self.state();
        state.calls.push(EngineCall::Start);
        state.playing = true;
    }

    fn pause(&mut self) {
        let mut state = self.state();
        state.calls.push(EngineCall::Pause);
        state.playing = false;
    }

    fn stop(&mut self) {
        let mut state = self.state();
        state.calls.push(EngineCall::Stop);
        state.playing = false;
    }

    fn seek(&mut self, position_ms: i64) {
        let mut state = self.state();
        state.calls.push(EngineCall::Seek(position_ms));
        state.position_ms = position_ms;
    }

    fn is_playing(&self) -> bool {
        self.state().playing
    }

    fn position_ms(&self) -> i64 {
        self.state().position_ms
    }

    fn duration_ms(&self) -> i64 {
        self.state().duration_ms
    }

    fn set_finished_notifier(&mut self, notifier: FinishedNotifier) {
        self.state().notifier = Some(notifier);
    }

    fn release(&mut self) {
        let mut state = self.state();
        state.calls.push(EngineCall::Release);
        state.released = true;
        state.notifier = None;
    }
}

impl MockHandle {
    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap()
    }

    /// Move the playhead without recording a call
    pub fn set_position(&self, position_ms: i64) {
        self.state().position_ms = position_ms;
    }

    /// Change the play flag without recording a call
    pub fn set_playing(&self, playing: bool) {
        self.state().playing = playing;
    }

    /// Make every load block for `delay`
    pub fn set_load_delay(&self, delay: Duration) {
        self.state().load_delay = Some(delay);
    }

    /// Make the next load fail with `message`
    pub fn fail_next_load(&self, message: &str) {
        self.state().fail_next_load = Some(message.to_string());
    }

    /// Play to the end: stop producing audio and send one notification.
    ///
    /// Returns false when no listener is registered.
    pub fn finish(&self) -> bool {
        let mut state = self.state();
        state.playing = false;
        state.position_ms = state.duration_ms;
        state
            .notifier
            .as_ref()
            .map(|notifier| notifier.notify())
            .unwrap_or(false)
    }

    pub fn calls(&self) -> Vec<EngineCall> {
        self.state().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.state().calls.clear();
    }

    pub fn count(&self, call: &EngineCall) -> usize {
        self.state().calls.iter().filter(|c| *c == call).count()
    }

    pub fn is_playing(&self) -> bool {
        self.state().playing
    }

    pub fn position_ms(&self) -> i64 {
        self.state().position_ms
    }

    pub fn released(&self) -> bool {
        self.state().released
    }
}
