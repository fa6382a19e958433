//! Test helper modules for ultra-player integration tests
//!
//! Provides reusable test infrastructure components:
//! - MockEngine: scriptable PlaybackEngine that records every call
//! - Audio generator: deterministic WAV fixtures written with hound

#![allow(dead_code)]

pub mod audio_generator;
pub mod mock_engine;

pub use audio_generator::{generate_silent_wav, generate_sine_wav};
pub use mock_engine::{EngineCall, MockEngine, MockHandle};
