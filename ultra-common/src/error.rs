//! Common error types for Ultra Alarm

use thiserror::Error;

/// Common result type for Ultra Alarm operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types shared by the workspace crates
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// TOML document could not be parsed
    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    /// Invalid user input (time strings, window specs, ...)
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}
