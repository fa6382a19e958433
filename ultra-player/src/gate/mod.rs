//! Gated playback control
//!
//! The only part of the player with real decision logic: whether a stop
//! request pauses playback, how attempts are counted, and how a completed
//! loop resets the attempt budget.

pub mod controller;
pub mod window;

pub use controller::{GateState, PlaybackGate, StopOutcome, DEFAULT_ATTEMPT_LIMIT};
pub use window::{TimeWindow, WindowEntry, WindowId};
