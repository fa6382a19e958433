//! Event types for the Ultra Alarm event stream
//!
//! Every state change made through a session is broadcast as an
//! [`AlarmEvent`]. Consumers (the console, tests) subscribe read-only.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Ultra Alarm event types
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum AlarmEvent {
    /// A source was loaded and prepared
    SourceLoaded {
        source: String,
        duration_ms: i64,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Loading a source failed; the session stays unloaded
    SourceFailed {
        source: String,
        message: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Playback started or resumed
    PlaybackStarted {
        position_ms: i64,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A gated stop request was evaluated
    StopAttempted {
        attempt: u32,
        attempt_limit: u32,
        outcome: StopOutcomeKind,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Playback paused unconditionally, bypassing the gate
    ForcedStop {
        paused: bool,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Playback position moved; attempt budget was refreshed
    Seeked {
        position_ms: i64,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Stoppable window appended
    WindowAdded {
        window_id: Uuid,
        start_ms: i64,
        end_ms: i64,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Stoppable window removed
    WindowRemoved {
        window_id: Uuid,
        start_ms: i64,
        end_ms: i64,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Attempt limit changed (value after clamping)
    AttemptLimitChanged {
        attempt_limit: u32,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Source played to the end and restarted from zero
    LoopRestarted {
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Periodic read-only position report
    PlaybackPosition {
        position_ms: i64,
        duration_ms: i64,
        playing: bool,
        attempt_count: u32,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Session torn down, engine released
    SessionReleased {
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

/// Result of a gated stop request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopOutcomeKind {
    /// Position was inside a window; playback paused
    Paused,
    /// Position matched no window; attempt consumed
    OutsideWindows,
    /// Attempt exceeded the limit for this loop; ignored
    LimitExceeded,
    /// No source loaded (or session released); nothing happened
    Inactive,
}

impl std::fmt::Display for StopOutcomeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StopOutcomeKind::Paused => write!(f, "paused"),
            StopOutcomeKind::OutsideWindows => write!(f, "outside windows"),
            StopOutcomeKind::LimitExceeded => write!(f, "limit exceeded"),
            StopOutcomeKind::Inactive => write!(f, "inactive"),
        }
    }
}

impl AlarmEvent {
    /// Event type name as it appears in the serialized `type` tag
    pub fn event_type(&self) -> &'static str {
        match self {
            AlarmEvent::SourceLoaded { .. } => "SourceLoaded",
            AlarmEvent::SourceFailed { .. } => "SourceFailed",
            AlarmEvent::PlaybackStarted { .. } => "PlaybackStarted",
            AlarmEvent::StopAttempted { .. } => "StopAttempted",
            AlarmEvent::ForcedStop { .. } => "ForcedStop",
            AlarmEvent::Seeked { .. } => "Seeked",
            AlarmEvent::WindowAdded { .. } => "WindowAdded",
            AlarmEvent::WindowRemoved { .. } => "WindowRemoved",
            AlarmEvent::AttemptLimitChanged { .. } => "AttemptLimitChanged",
            AlarmEvent::LoopRestarted { .. } => "LoopRestarted",
            AlarmEvent::PlaybackPosition { .. } => "PlaybackPosition",
            AlarmEvent::SessionReleased { .. } => "SessionReleased",
        }
    }
}
