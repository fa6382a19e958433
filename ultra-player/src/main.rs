//! Ultra Alarm (ultra-alarm) - Main entry point
//!
//! Loads a track, loops it through the output device and reads control
//! commands from stdin until `quit`, end of input or a shutdown signal.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::io::BufReader;
use tokio::signal;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use ultra_common::config::{ConfigResolver, TomlConfig, WindowConfig};
use ultra_player::audio::{AudioOutput, DeviceEngine};
use ultra_player::config::{AlarmSettings, CliOverrides};
use ultra_player::{console, AlarmSession};

/// Command-line arguments for ultra-alarm
#[derive(Parser, Debug)]
#[command(name = "ultra-alarm")]
#[command(about = "Looping alarm that only stops inside configured windows")]
#[command(version)]
struct Args {
    /// Audio file path or file:// URI (overrides the config file)
    source: Option<String>,

    /// Config file (default: $ULTRA_ALARM_CONFIG, then the user config dir)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Stop attempts honored per loop (values below 1 become 1)
    #[arg(short = 'n', long, env = "ULTRA_ALARM_ATTEMPT_LIMIT", allow_hyphen_values = true)]
    attempt_limit: Option<i64>,

    /// Stoppable window START-END, e.g. 4.3s-5.0s (repeatable)
    #[arg(short, long = "window", value_parser = parse_window)]
    windows: Vec<WindowConfig>,

    /// Output device name
    #[arg(short, long, env = "ULTRA_ALARM_DEVICE")]
    device: Option<String>,

    /// Output volume 0.0-1.0
    #[arg(long)]
    volume: Option<f32>,

    /// Load the source but wait for `start`
    #[arg(long)]
    no_autostart: bool,

    /// Log level when RUST_LOG is unset (trace, debug, info, warn, error)
    #[arg(long, env = "ULTRA_ALARM_LOG_LEVEL")]
    log_level: Option<String>,

    /// List output devices and exit
    #[arg(long)]
    list_devices: bool,
}

impl Args {
    fn into_overrides(self) -> CliOverrides {
        CliOverrides {
            source: self.source,
            attempt_limit: self.attempt_limit,
            windows: self.windows,
            device: self.device,
            volume: self.volume,
            no_autostart: self.no_autostart,
            log_level: self.log_level,
        }
    }
}

fn parse_window(spec: &str) -> std::result::Result<WindowConfig, String> {
    WindowConfig::parse_spec(spec).map_err(|e| e.to_string())
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Built by hand so a pending stdin read cannot hold up shutdown
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;

    let result = runtime.block_on(run(args));
    runtime.shutdown_timeout(Duration::from_millis(250));
    result
}

async fn run(args: Args) -> Result<()> {
    if args.list_devices {
        init_tracing("warn");
        for name in AudioOutput::list_devices().context("Failed to list output devices")? {
            println!("{}", name);
        }
        return Ok(());
    }

    // Config must be read before logging is up; outcome is logged below
    let resolver = ConfigResolver::new(args.config.clone());
    let requested_config = resolver.resolve();
    let (file_config, loaded_from) =
        TomlConfig::load_resolved(&resolver).context("Failed to load configuration")?;
    let settings = AlarmSettings::resolve(file_config, args.into_overrides())
        .context("Invalid settings")?;

    init_tracing(&settings.log_level);

    info!(
        "Starting ultra-alarm v{} ({} {}, built {})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_PROFILE"),
        env!("BUILD_TIMESTAMP")
    );
    match (&loaded_from, &requested_config) {
        (Some(path), _) => info!("Configuration: {}", path.display()),
        (None, Some(path)) => warn!(
            "Config file {} not found, using compiled defaults",
            path.display()
        ),
        (None, None) => info!("Configuration: compiled defaults"),
    }

    let engine = DeviceEngine::open(settings.device.clone(), settings.volume)
        .context("Failed to open audio output")?;
    info!("Audio output ready at {}Hz", engine.output_rate());

    let session = AlarmSession::new(engine);
    spawn_event_logger(&session);

    session.set_attempt_limit(settings.attempt_limit).await;
    for (start_ms, end_ms) in &settings.windows {
        session.add_window(*start_ms, *end_ms).await;
    }

    match settings.source.clone() {
        Some(source) => {
            session
                .load(source.clone())
                .await
                .with_context(|| format!("Failed to load {}", source))?;
            if settings.autostart {
                session.start().await;
            }
        }
        None => warn!("No source configured; use `load <source>`"),
    }

    if let Some(interval) = settings.position_interval {
        session.spawn_position_monitor(interval);
    }

    println!("{}", console::HELP);

    let stdin = BufReader::new(tokio::io::stdin());
    tokio::select! {
        result = console::run(&session, stdin, tokio::io::stdout()) => {
            result.context("Console error")?;
            info!("Console closed, shutting down");
        }
        _ = shutdown_signal() => {}
    }

    session.teardown().await;
    info!("Shutdown complete");
    Ok(())
}

fn init_tracing(level: &str) {
    let default_directive = format!(
        "ultra_alarm={level},ultra_player={level},ultra_common={level}",
        level = level
    );
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_directive.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Log every session event at debug level as JSON
fn spawn_event_logger<E: ultra_player::PlaybackEngine + 'static>(session: &AlarmSession<E>) {
    let mut events = session.subscribe();
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => match serde_json::to_string(&event) {
                    Ok(json) => debug!("event {}", json),
                    Err(e) => warn!("Failed to serialize {}: {}", event.event_type(), e),
                },
                Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                    debug!("Event logger skipped {} events", skipped);
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    });
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
