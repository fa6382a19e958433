//! # Ultra Alarm Player Library (ultra-player)
//!
//! Looping alarm playback that resists being silenced.
//!
//! **Purpose:** Play a track on repeat and honor "stop" only while the
//! playhead sits inside a configured stoppable window, with a limited number
//! of stop attempts per loop.
//!
//! **Architecture:** [`gate::PlaybackGate`] holds the decision logic over an
//! injected [`engine::PlaybackEngine`]; [`session::AlarmSession`] serializes
//! access, runs the loop-restart listener and broadcasts events;
//! [`audio::DeviceEngine`] plays through symphonia + rubato + cpal.

pub mod audio;
pub mod config;
pub mod console;
pub mod engine;
pub mod error;
pub mod gate;
pub mod session;

pub use engine::{FinishedNotifier, MediaSource, PlaybackEngine};
pub use error::{Error, Result};
pub use gate::{GateState, PlaybackGate, StopOutcome, TimeWindow, WindowId};
pub use session::{AlarmSession, GateStatus};
