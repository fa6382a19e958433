//! Error types for ultra-player
//!
//! Defines module-specific error types using thiserror for clear error propagation.
//!
//! Exceeding the stop attempt limit is reported through `StopOutcome`, not here.

use thiserror::Error;

/// Main error type for ultra-player
#[derive(Error, Debug)]
pub enum Error {
    /// Engine could not open or prepare a source; carries the engine's message
    #[error("Source error ({source_name}): {message}")]
    Source { source_name: String, message: String },

    /// Positional window lookup outside `0..len`
    #[error("Window index {index} out of range (have {len} windows)")]
    IndexOutOfRange { index: i64, len: usize },

    /// Window handle does not name a window in this gate
    #[error("Unknown window: {0}")]
    UnknownWindow(uuid::Uuid),

    /// Operation attempted after the session was torn down
    #[error("Session already released")]
    AlreadyReleased,

    /// Audio decoding errors
    #[error("Audio decode error: {0}")]
    Decode(String),

    /// Audio output device errors
    #[error("Audio output error: {0}")]
    AudioOutput(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Unparseable console command
    #[error("Invalid command: {0}")]
    Command(String),

    /// Errors bubbled up from ultra-common (config, time parsing)
    #[error(transparent)]
    Common(#[from] ultra_common::Error),

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience Result type using ultra-player Error
pub type Result<T> = std::result::Result<T, Error>;
