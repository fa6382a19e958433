//! Configuration loading and config file resolution
//!
//! The alarm reads a single TOML file. Its location is resolved in priority
//! order:
//! 1. Command-line argument (highest priority)
//! 2. `ULTRA_ALARM_CONFIG` environment variable
//! 3. `<user config dir>/ultra-alarm/config.toml`
//! 4. Compiled defaults (no file)
//!
//! A missing file never terminates startup: a warning is logged and the
//! compiled defaults are used. A file that exists but does not parse is an
//! error.

use crate::human_time::parse_millis;
use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "ULTRA_ALARM_CONFIG";

/// Application directory name under the platform config dir
const APP_DIR_NAME: &str = "ultra-alarm";

/// Alarm configuration loaded from TOML
#[derive(Debug, Clone, Deserialize)]
pub struct TomlConfig {
    /// Audio source path or URI (optional, CLI positional overrides)
    #[serde(default)]
    pub source: Option<String>,

    /// Gated stop attempts honored per loop.
    ///
    /// Signed so that out-of-range values reach the clamp instead of failing
    /// deserialization.
    #[serde(default = "default_attempt_limit")]
    pub attempt_limit: i64,

    /// Start playback as soon as the source is loaded
    #[serde(default = "default_autostart")]
    pub autostart: bool,

    /// Interval for read-only position reports (0 = disabled)
    #[serde(default)]
    pub position_interval_ms: u64,

    /// Initial stoppable windows, in insertion order
    #[serde(default)]
    pub windows: Vec<WindowConfig>,

    /// Audio output configuration
    #[serde(default)]
    pub audio: AudioConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// One configured stoppable window
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct WindowConfig {
    pub start: TimeValue,
    pub end: TimeValue,
}

/// Time as either integer milliseconds or a human-readable string
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum TimeValue {
    Millis(i64),
    Text(String),
}

/// Audio output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AudioConfig {
    /// Output device name (None = system default)
    #[serde(default)]
    pub device: Option<String>,

    /// Output volume, clamped to [0.0, 1.0] when applied
    #[serde(default = "default_volume")]
    pub volume: f32,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_attempt_limit() -> i64 {
    1
}

fn default_autostart() -> bool {
    true
}

fn default_volume() -> f32 {
    1.0
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            source: None,
            attempt_limit: default_attempt_limit(),
            autostart: default_autostart(),
            position_interval_ms: 0,
            windows: Vec::new(),
            audio: AudioConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            device: None,
            volume: default_volume(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl TimeValue {
    /// Resolve to milliseconds
    pub fn to_millis(&self) -> Result<i64> {
        match self {
            TimeValue::Millis(ms) => Ok(*ms),
            TimeValue::Text(text) => parse_millis(text),
        }
    }
}

impl WindowConfig {
    /// Resolve both bounds to milliseconds, in the order written.
    ///
    /// Bounds are not reordered here; window construction normalizes them.
    pub fn to_millis(&self) -> Result<(i64, i64)> {
        Ok((self.start.to_millis()?, self.end.to_millis()?))
    }

    /// Parse a `START..END` or `START-END` window spec as given on the
    /// command line, e.g. `4.3s-5.0s` or `4300..5000`.
    pub fn parse_spec(spec: &str) -> Result<Self> {
        let spec = spec.trim();
        let (start, end) = if let Some((start, end)) = spec.split_once("..") {
            (start, end)
        } else {
            // Skip index 0 so a leading minus sign is not taken as the separator
            let split_at = spec
                .char_indices()
                .skip(1)
                .find(|&(_, c)| c == '-')
                .map(|(i, _)| i)
                .ok_or_else(|| {
                    Error::InvalidInput(format!(
                        "window '{}' must look like START-END or START..END",
                        spec
                    ))
                })?;
            (&spec[..split_at], &spec[split_at + 1..])
        };

        // Validate eagerly so a bad spec fails at argument parsing
        parse_millis(start)?;
        parse_millis(end)?;

        Ok(Self {
            start: TimeValue::Text(start.trim().to_string()),
            end: TimeValue::Text(end.trim().to_string()),
        })
    }
}

impl TomlConfig {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read config file {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from TOML text and validate window bounds
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: TomlConfig = toml::from_str(content)?;

        for (index, window) in config.windows.iter().enumerate() {
            window.to_millis().map_err(|e| {
                Error::Config(format!("windows[{}]: {}", index, e))
            })?;
        }

        Ok(config)
    }

    /// Resolve and load configuration with graceful degradation.
    ///
    /// Returns the configuration and the path it came from (None when the
    /// compiled defaults were used).
    pub fn load_resolved(resolver: &ConfigResolver) -> Result<(Self, Option<PathBuf>)> {
        match resolver.resolve() {
            Some(path) if path.exists() => {
                let config = Self::load(&path)?;
                info!("Loaded configuration from {}", path.display());
                Ok((config, Some(path)))
            }
            Some(path) => {
                warn!(
                    "Config file {} not found, using compiled defaults",
                    path.display()
                );
                Ok((Self::default(), None))
            }
            None => {
                info!("No config file found, using compiled defaults");
                Ok((Self::default(), None))
            }
        }
    }
}

/// Config file resolution following the priority order in the module docs
#[derive(Debug, Clone, Default)]
pub struct ConfigResolver {
    cli_path: Option<PathBuf>,
}

impl ConfigResolver {
    pub fn new(cli_path: Option<PathBuf>) -> Self {
        Self { cli_path }
    }

    /// Resolve the config file path.
    ///
    /// Explicit sources (CLI, env) are returned even when the file does not
    /// exist so the caller can warn about them; the user config file is only
    /// returned when present.
    pub fn resolve(&self) -> Option<PathBuf> {
        // Priority 1: Command-line argument
        if let Some(path) = &self.cli_path {
            return Some(path.clone());
        }

        // Priority 2: Environment variable
        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            if !path.trim().is_empty() {
                return Some(PathBuf::from(path));
            }
        }

        // Priority 3: User config directory
        if let Some(path) = default_config_path() {
            if path.exists() {
                return Some(path);
            }
        }

        // Priority 4: Compiled defaults
        None
    }
}

/// `<user config dir>/ultra-alarm/config.toml`, if the platform has one
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join(APP_DIR_NAME).join("config.toml"))
}
