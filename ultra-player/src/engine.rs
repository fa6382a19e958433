//! Playback engine capability interface
//!
//! The gate never decodes or outputs audio itself. Everything it needs from
//! the audio side is expressed by [`PlaybackEngine`]; the device-backed
//! implementation lives in [`crate::audio::device`], tests use a recording
//! mock.

use crate::error::Result;
use std::fmt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Where audio comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaSource {
    /// Local filesystem path
    Path(PathBuf),
    /// URI with an explicit scheme (`file:///...`, `content://...`)
    Uri(String),
}

impl MediaSource {
    /// Interpret user input: anything with a `scheme://` prefix is a URI,
    /// everything else a path.
    pub fn parse(input: &str) -> Self {
        match input.split_once("://") {
            Some((scheme, _))
                if !scheme.is_empty()
                    && scheme
                        .chars()
                        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.')) =>
            {
                MediaSource::Uri(input.to_string())
            }
            _ => MediaSource::Path(PathBuf::from(input)),
        }
    }

    /// Local path for this source, if it has one.
    ///
    /// `file://` URIs resolve to their path; other schemes return None.
    pub fn local_path(&self) -> Option<PathBuf> {
        match self {
            MediaSource::Path(path) => Some(path.clone()),
            MediaSource::Uri(uri) => uri.strip_prefix("file://").map(PathBuf::from),
        }
    }
}

impl fmt::Display for MediaSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediaSource::Path(path) => write!(f, "{}", path.display()),
            MediaSource::Uri(uri) => write!(f, "{}", uri),
        }
    }
}

/// One "playback finished" notification, tagged with the notifier's
/// generation at the time it was sent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FinishedSignal {
    generation: u64,
}

impl FinishedSignal {
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// Receiving half of the finished-notification channel
pub type FinishedReceiver = mpsc::UnboundedReceiver<FinishedSignal>;

/// Sending half handed to the engine.
///
/// Sending never blocks, so it is safe to call from an audio callback thread.
/// Clones share one generation counter; signals sent before
/// [`FinishedNotifier::advance`] are stale afterwards.
#[derive(Debug, Clone)]
pub struct FinishedNotifier {
    tx: mpsc::UnboundedSender<FinishedSignal>,
    generation: Arc<AtomicU64>,
}

impl FinishedNotifier {
    /// Create a connected notifier/receiver pair
    pub fn channel() -> (Self, FinishedReceiver) {
        let (tx, rx) = mpsc::unbounded_channel();
        let notifier = Self {
            tx,
            generation: Arc::new(AtomicU64::new(0)),
        };
        (notifier, rx)
    }

    /// Deliver one finished notification.
    ///
    /// Returns false when nobody is listening any more.
    pub fn notify(&self) -> bool {
        let signal = FinishedSignal {
            generation: self.generation.load(Ordering::Acquire),
        };
        self.tx.send(signal).is_ok()
    }

    /// Invalidate every signal sent so far
    pub fn advance(&self) {
        self.generation.fetch_add(1, Ordering::AcqRel);
    }

    /// True when `signal` was sent after the latest [`advance`](Self::advance)
    pub fn is_current(&self, signal: FinishedSignal) -> bool {
        signal.generation == self.generation.load(Ordering::Acquire)
    }
}

/// Audio transport consumed by the gate.
///
/// Positions and durations are milliseconds from the start of the source.
/// Implementations deliver exactly one notification per playback completion
/// through the registered [`FinishedNotifier`] and must stop reporting
/// "playing" once the end has been reached.
pub trait PlaybackEngine: Send {
    /// Set the source and prepare it for playback (paused at position 0).
    ///
    /// Fails when the source cannot be opened or decoded; the error message is
    /// surfaced to the caller unchanged. The engine should not be left
    /// playing the previous source after a failure.
    fn load(&mut self, source: &MediaSource) -> Result<()>;

    /// Start or resume playback
    fn start(&mut self);

    /// Pause playback; no effect when already paused
    fn pause(&mut self);

    /// Stop playback ahead of release
    fn stop(&mut self);

    /// Move the playhead
    fn seek(&mut self, position_ms: i64);

    /// True while audio is being produced
    fn is_playing(&self) -> bool;

    /// Elapsed position
    fn position_ms(&self) -> i64;

    /// Total duration of the loaded source (0 when nothing is loaded)
    fn duration_ms(&self) -> i64;

    /// Register the channel used for finished notifications
    fn set_finished_notifier(&mut self, notifier: FinishedNotifier);

    /// Release device and decoded data; the engine is unusable afterwards
    fn release(&mut self);
}
