//! ultra-alarm runtime settings
//!
//! Merges command-line overrides onto the TOML file configuration. CLI
//! values win; CLI windows are appended after the configured ones.

use crate::engine::MediaSource;
use crate::error::{Error, Result};
use std::time::Duration;
use ultra_common::config::{TomlConfig, WindowConfig};

/// Values given on the command line; `None` means "not given"
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub source: Option<String>,
    pub attempt_limit: Option<i64>,
    pub windows: Vec<WindowConfig>,
    pub device: Option<String>,
    pub volume: Option<f32>,
    pub no_autostart: bool,
    pub log_level: Option<String>,
}

/// Fully resolved settings for one alarm run
#[derive(Debug, Clone, PartialEq)]
pub struct AlarmSettings {
    pub source: Option<MediaSource>,
    pub attempt_limit: i64,
    pub autostart: bool,
    /// None disables the position monitor
    pub position_interval: Option<Duration>,
    /// Window bounds as written; the gate normalizes them
    pub windows: Vec<(i64, i64)>,
    /// None selects the default output device
    pub device: Option<String>,
    pub volume: f32,
    pub log_level: String,
}

impl AlarmSettings {
    pub fn resolve(file: TomlConfig, cli: CliOverrides) -> Result<Self> {
        let volume = cli.volume.unwrap_or(file.audio.volume);
        if !volume.is_finite() {
            return Err(Error::Config(format!("volume must be a number, got {}", volume)));
        }

        let windows = file
            .windows
            .iter()
            .chain(cli.windows.iter())
            .map(WindowConfig::to_millis)
            .collect::<ultra_common::Result<Vec<_>>>()?;

        let device = cli
            .device
            .or(file.audio.device)
            .filter(|name| !name.trim().is_empty() && !name.eq_ignore_ascii_case("default"));

        Ok(Self {
            source: cli.source.or(file.source).map(|s| MediaSource::parse(&s)),
            attempt_limit: cli.attempt_limit.unwrap_or(file.attempt_limit),
            autostart: file.autostart && !cli.no_autostart,
            position_interval: (file.position_interval_ms > 0)
                .then(|| Duration::from_millis(file.position_interval_ms)),
            windows,
            device,
            volume: volume.clamp(0.0, 1.0),
            log_level: cli.log_level.unwrap_or(file.logging.level),
        })
    }
}
