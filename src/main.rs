//! # Weather Station
//!
//! Telemetry daemon for a Modbus RTU weather sensor.
//!
//! Samples the sensor over serial, keeps a rolling window of readings,
//! aggregates it on a fixed period, logs each record locally and forwards it
//! to a remote collector over HTTP.

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use weather_station::config::{Config, LoggingConfig};
use weather_station::device::DeviceLink;
use weather_station::pipeline::runner;
use weather_station::serial::{SensorSerial, DEFAULT_DEVICE_PATHS};
use weather_station::telemetry::{HttpTransport, TelemetryTransport};

/// Config file used when neither an argument nor the env var is given
const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Environment variable overriding the config path
const CONFIG_ENV_VAR: &str = "WEATHER_STATION_CONFIG";

/// File name prefix of the daily application log
const LOG_FILE_PREFIX: &str = "weather-station.log";

/// Main entry point for the weather station daemon
///
/// # Control Flow
///
/// 1. **Initialization**
///    - Load and validate configuration (any error is fatal)
///    - Set up logging to stdout and, optionally, a daily log file
///    - Open the sensor serial port
///    - Build the HTTP transport when dispatch is enabled
///
/// 2. **Run**
///    - Sampling task polls the sensor every `sampling.interval_ms`
///    - Aggregation task reduces, logs and dispatches every `aggregation.interval_s`
///
/// 3. **Graceful Shutdown**
///    - Ctrl+C stops both tasks
///
/// # Examples
///
/// ```bash
/// weather-station /etc/weather-station.toml
/// RUST_LOG=weather_station=debug weather-station
/// ```
#[tokio::main]
async fn main() -> Result<()> {
    let config_path = resolve_config_path(
        std::env::args().nth(1),
        std::env::var(CONFIG_ENV_VAR).ok(),
    );
    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load configuration from {}", config_path.display()))?;

    let _log_guard = init_logging(&config.logging);

    info!("Weather Station v{} starting...", env!("CARGO_PKG_VERSION"));
    info!("Configuration loaded from {}", config_path.display());

    let candidates = candidate_ports(&config.serial.port);
    let serial = SensorSerial::open_with_paths(&candidates, config.serial.baud_rate)?;
    info!("Sensor serial port opened at: {}", serial.device_path());
    let link = DeviceLink::from_config(serial.into_port(), &config.serial);

    let transport: Option<Arc<dyn TelemetryTransport>> = if config.dispatch.enabled {
        let http = HttpTransport::new(
            &config.dispatch.endpoint,
            Duration::from_secs(config.dispatch.timeout_s),
        )?;
        info!("Dispatching records to {}", http.endpoint());
        Some(Arc::new(http))
    } else {
        info!("Dispatch disabled, records are only logged locally");
        None
    };

    info!("Press Ctrl+C to exit");
    runner::run(config, link, transport, async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
        }
        info!("Received Ctrl+C, shutting down...");
    })
    .await;

    Ok(())
}

/// First CLI argument, then the env var, then the default path
fn resolve_config_path(arg: Option<String>, env: Option<String>) -> PathBuf {
    arg.or(env)
        .filter(|p| !p.trim().is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

/// Configured port first, then the usual device paths
fn candidate_ports(configured: &str) -> Vec<&str> {
    let mut candidates = vec![configured];
    candidates.extend(DEFAULT_DEVICE_PATHS.iter().filter(|p| **p != configured));
    candidates
}

/// Stdout logging plus an optional daily file
///
/// The returned guard must live until exit so buffered file lines get flushed.
fn init_logging(config: &LoggingConfig) -> Option<WorkerGuard> {
    let filter = EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into());

    let (file_layer, guard) = match &config.directory {
        Some(directory) => {
            let appender = tracing_appender::rolling::daily(directory, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (
                Some(fmt::layer().with_writer(writer).with_ansi(false)),
                Some(guard),
            )
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .with(file_layer)
        .init();

    guard
}
