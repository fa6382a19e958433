//! # Ultra Alarm Common Library
//!
//! Shared code for the Ultra Alarm player:
//! - Error type used by configuration and parsing
//! - Event types (AlarmEvent enum)
//! - TOML configuration loading and resolution
//! - Human-readable time parsing and formatting

pub mod config;
pub mod error;
pub mod events;
pub mod human_time;

pub use error::{Error, Result};
pub use events::AlarmEvent;
