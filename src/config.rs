//! # Configuration Module
//!
//! Handles loading and validating configuration from TOML files.
//!
//! The configuration is read once at startup and handed to each component;
//! an invalid station identity or endpoint stops the daemon before any
//! polling begins.

use serde::de::Error;
use serde::Deserialize;
use std::fmt::Display;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Result, StationError};
use crate::modbus::protocol::Metric;

/// Main configuration structure
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub station: StationConfig,

    #[serde(default)]
    pub serial: SerialConfig,

    #[serde(default)]
    pub sampling: SamplingConfig,

    #[serde(default)]
    pub aggregation: AggregationConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub dispatch: DispatchConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Station identity presented to the collector
#[derive(Debug, Deserialize, Clone)]
pub struct StationConfig {
    #[serde(default)]
    pub id: String,

    #[serde(default)]
    pub key: String,
}

/// Serial port configuration
#[derive(Debug, Deserialize, Clone)]
pub struct SerialConfig {
    #[serde(default = "default_serial_port")]
    pub port: String,

    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,

    /// Reply read timeout
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Delay between writing a request and reading its reply
    #[serde(default = "default_settle_ms")]
    pub settle_ms: u64,

    /// Device turnaround between consecutive requests
    #[serde(default = "default_inter_request_delay_ms")]
    pub inter_request_delay_ms: u64,
}

/// Sampling configuration
#[derive(Debug, Deserialize, Clone)]
pub struct SamplingConfig {
    #[serde(default = "default_sampling_interval_ms")]
    pub interval_ms: u64,

    /// Capacity of the raw sample window
    #[serde(default = "default_window_size")]
    pub window_size: usize,

    /// Single-register metrics polled after temperature/humidity, in column order
    #[serde(default = "default_metrics")]
    pub metrics: Vec<Metric>,
}

/// Aggregation configuration
#[derive(Debug, Deserialize, Clone)]
pub struct AggregationConfig {
    #[serde(default = "default_aggregation_interval_s")]
    pub interval_s: u64,
}

/// Local storage configuration
#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Data rows kept in the bounded latest file
    #[serde(default = "default_storage_size")]
    pub storage_size: usize,

    #[serde(default = "default_raw_log_enabled")]
    pub raw_log_enabled: bool,
}

/// Collector dispatch configuration
#[derive(Debug, Deserialize, Clone)]
pub struct DispatchConfig {
    #[serde(default = "default_dispatch_enabled")]
    pub enabled: bool,

    #[serde(default)]
    pub endpoint: String,

    /// Per-attempt request timeout
    #[serde(default = "default_dispatch_timeout_s")]
    pub timeout_s: u64,

    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Pause after a 202 Accepted before returning
    #[serde(default = "default_accepted_pause_ms")]
    pub accepted_pause_ms: u64,

    /// Pause between failed attempts
    #[serde(default)]
    pub retry_backoff_ms: u64,
}

/// Logging configuration
#[derive(Debug, Deserialize, Clone, Default)]
pub struct LoggingConfig {
    /// Directory for daily-rotated log files; console only when unset
    #[serde(default)]
    pub directory: Option<PathBuf>,
}

// Default value functions
fn default_serial_port() -> String { "/dev/ttyS0".to_string() }
fn default_baud_rate() -> u32 { 4800 }
fn default_timeout_ms() -> u64 { 100 }
fn default_settle_ms() -> u64 { 10 }
fn default_inter_request_delay_ms() -> u64 { 10 }

fn default_sampling_interval_ms() -> u64 { 1000 }
fn default_window_size() -> usize { 30 }
fn default_metrics() -> Vec<Metric> {
    vec![
        Metric::WindSpeed,
        Metric::WindAngle,
        Metric::Noise,
        Metric::Pm2dot5,
        Metric::Pm10,
        Metric::Pressure,
        Metric::Rain,
    ]
}

fn default_aggregation_interval_s() -> u64 { 30 }

fn default_data_dir() -> PathBuf { PathBuf::from("./data") }
fn default_storage_size() -> usize { 2880 }
fn default_raw_log_enabled() -> bool { true }

fn default_dispatch_enabled() -> bool { true }
fn default_dispatch_timeout_s() -> u64 { 10 }
fn default_max_attempts() -> u32 { 3 }
fn default_accepted_pause_ms() -> u64 { 5000 }

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: default_serial_port(),
            baud_rate: default_baud_rate(),
            timeout_ms: default_timeout_ms(),
            settle_ms: default_settle_ms(),
            inter_request_delay_ms: default_inter_request_delay_ms(),
        }
    }
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_sampling_interval_ms(),
            window_size: default_window_size(),
            metrics: default_metrics(),
        }
    }
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self {
            interval_s: default_aggregation_interval_s(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            storage_size: default_storage_size(),
            raw_log_enabled: default_raw_log_enabled(),
        }
    }
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            enabled: default_dispatch_enabled(),
            endpoint: String::new(),
            timeout_s: default_dispatch_timeout_s(),
            max_attempts: default_max_attempts(),
            accepted_pause_ms: default_accepted_pause_ms(),
            retry_backoff_ms: 0,
        }
    }
}

fn invalid(msg: impl Display) -> StationError {
    StationError::Config(toml::de::Error::custom(msg))
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use weather_station::config::Config;
    ///
    /// let config = Config::load("config/default.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    /// Parse and validate configuration from a TOML string
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns error if any configuration value is out of valid range
    pub fn validate(&self) -> Result<()> {
        // Station identity
        if self.station.id.trim().is_empty() {
            return Err(invalid("station id cannot be empty"));
        }

        if self.station.key.trim().is_empty() {
            return Err(invalid("station key cannot be empty"));
        }

        // Serial
        if self.serial.port.is_empty() {
            return Err(invalid("serial port cannot be empty"));
        }

        if ![1200, 2400, 4800, 9600, 19200].contains(&self.serial.baud_rate) {
            return Err(invalid("baud_rate must be one of: 1200, 2400, 4800, 9600, 19200"));
        }

        if self.serial.timeout_ms == 0 || self.serial.timeout_ms > 10000 {
            return Err(invalid("timeout_ms must be between 1 and 10000"));
        }

        if self.serial.settle_ms > 1000 {
            return Err(invalid("settle_ms must be between 0 and 1000"));
        }

        if self.serial.inter_request_delay_ms > 1000 {
            return Err(invalid("inter_request_delay_ms must be between 0 and 1000"));
        }

        // Sampling
        if self.sampling.interval_ms == 0 || self.sampling.interval_ms > 60000 {
            return Err(invalid("sampling interval_ms must be between 1 and 60000"));
        }

        if self.sampling.window_size == 0 {
            return Err(invalid("window_size must be greater than 0"));
        }

        self.validate_metrics()?;

        // Aggregation
        if self.aggregation.interval_s == 0 || self.aggregation.interval_s > 86400 {
            return Err(invalid("aggregation interval_s must be between 1 and 86400"));
        }

        // Storage
        if self.storage.data_dir.as_os_str().is_empty() {
            return Err(invalid("storage data_dir cannot be empty"));
        }

        if self.storage.storage_size == 0 {
            return Err(invalid("storage_size must be greater than 0"));
        }

        // Dispatch
        if self.dispatch.enabled {
            let url = reqwest::Url::parse(&self.dispatch.endpoint)
                .map_err(|e| invalid(format!("dispatch endpoint is not a valid URL: {}", e)))?;
            if url.scheme() != "http" && url.scheme() != "https" {
                return Err(invalid("dispatch endpoint must use http or https"));
            }
        }

        if self.dispatch.timeout_s == 0 || self.dispatch.timeout_s > 10 {
            return Err(invalid("dispatch timeout_s must be between 1 and 10"));
        }

        if self.dispatch.max_attempts == 0 || self.dispatch.max_attempts > 10 {
            return Err(invalid("max_attempts must be between 1 and 10"));
        }

        Ok(())
    }

    fn validate_metrics(&self) -> Result<()> {
        let metrics = &self.sampling.metrics;

        let Some(last) = metrics.last() else {
            return Err(invalid("metrics cannot be empty"));
        };

        for (i, metric) in metrics.iter().enumerate() {
            if metrics[..i].contains(metric) {
                return Err(invalid(format!("metric {} is listed more than once", metric)));
            }
        }

        // The aggregator reduces the last column by delta
        if !last.is_accumulating() {
            return Err(invalid(format!(
                "the last metric must be the accumulating one (rain), got {}",
                last
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_valid_config() -> Config {
        Config {
            station: StationConfig {
                id: "station-01".to_string(),
                key: "secret".to_string(),
            },
            serial: SerialConfig::default(),
            sampling: SamplingConfig::default(),
            aggregation: AggregationConfig::default(),
            storage: StorageConfig::default(),
            dispatch: DispatchConfig {
                endpoint: "https://collector.example.com/api/upload".to_string(),
                ..DispatchConfig::default()
            },
            logging: LoggingConfig::default(),
        }
    }

    #[test]
    fn test_default_config() {
        assert!(create_valid_config().validate().is_ok());
    }

    #[test]
    fn test_load_config_from_file() {
        use std::io::Write;
        use tempfile::NamedTempFile;

        let toml_content = r#"
[station]
id = "station-01"
key = "secret"

[serial]
port = "/dev/ttyUSB0"

[dispatch]
endpoint = "http://127.0.0.1:8080/upload"
"#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(toml_content.as_bytes()).unwrap();
        temp_file.flush().unwrap();

        let config = Config::load(temp_file.path()).unwrap();
        assert_eq!(config.serial.port, "/dev/ttyUSB0");
        assert_eq!(config.sampling.metrics, default_metrics());
        assert_eq!(config.storage.storage_size, 2880);
    }

    #[test]
    fn test_missing_station_section_is_rejected() {
        assert!(Config::from_toml("[serial]\nport = \"/dev/ttyS0\"\n").is_err());
    }

    #[test]
    fn test_empty_station_id() {
        let mut config = create_valid_config();
        config.station.id = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_blank_station_key() {
        let mut config = create_valid_config();
        config.station.key = "   ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_serial_port() {
        let mut config = create_valid_config();
        config.serial.port = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_baud_rate() {
        let mut config = create_valid_config();
        config.serial.baud_rate = 420_000;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_valid_baud_rates() {
        for &baud in &[1200, 2400, 4800, 9600, 19200] {
            let mut config = create_valid_config();
            config.serial.baud_rate = baud;
            assert!(config.validate().is_ok(), "Baud rate {} should be valid", baud);
        }
    }

    #[test]
    fn test_timeout_ms_bounds() {
        let mut config = create_valid_config();
        config.serial.timeout_ms = 0;
        assert!(config.validate().is_err());
        config.serial.timeout_ms = 10001;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_settle_ms_too_high() {
        let mut config = create_valid_config();
        config.serial.settle_ms = 1001;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_sampling_interval_zero() {
        let mut config = create_valid_config();
        config.sampling.interval_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_window_size_zero() {
        let mut config = create_valid_config();
        config.sampling.window_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_metrics() {
        let mut config = create_valid_config();
        config.sampling.metrics.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_duplicate_metric() {
        let mut config = create_valid_config();
        config.sampling.metrics = vec![Metric::Pressure, Metric::Pressure, Metric::Rain];
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_last_metric_must_accumulate() {
        let mut config = create_valid_config();
        config.sampling.metrics = vec![Metric::Rain, Metric::Pressure];
        assert!(config.validate().is_err());

        config.sampling.metrics = vec![Metric::Rain];
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_unknown_metric_fails_to_parse() {
        let toml_content = r#"
[station]
id = "a"
key = "b"

[sampling]
metrics = ["pressure", "lux", "rain"]

[dispatch]
enabled = false
"#;
        assert!(Config::from_toml(toml_content).is_err());
    }

    #[test]
    fn test_aggregation_interval_zero() {
        let mut config = create_valid_config();
        config.aggregation.interval_s = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_storage_size_zero() {
        let mut config = create_valid_config();
        config.storage.storage_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_endpoint_required_when_enabled() {
        let mut config = create_valid_config();
        config.dispatch.endpoint = String::new();
        assert!(config.validate().is_err());

        config.dispatch.enabled = false;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_endpoint_scheme() {
        let mut config = create_valid_config();
        config.dispatch.endpoint = "ftp://collector.example.com/".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_dispatch_timeout_bounds() {
        let mut config = create_valid_config();
        config.dispatch.timeout_s = 0;
        assert!(config.validate().is_err());
        config.dispatch.timeout_s = 11;
        assert!(config.validate().is_err());
        config.dispatch.timeout_s = 1;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_max_attempts_zero() {
        let mut config = create_valid_config();
        config.dispatch.max_attempts = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_default_functions() {
        assert_eq!(default_serial_port(), "/dev/ttyS0");
        assert_eq!(default_baud_rate(), 4800);
        assert_eq!(default_timeout_ms(), 100);
        assert_eq!(default_settle_ms(), 10);
        assert_eq!(default_inter_request_delay_ms(), 10);
        assert_eq!(default_sampling_interval_ms(), 1000);
        assert_eq!(default_window_size(), 30);
        assert_eq!(default_aggregation_interval_s(), 30);
        assert_eq!(default_data_dir(), PathBuf::from("./data"));
        assert_eq!(default_storage_size(), 2880);
        assert!(default_raw_log_enabled());
        assert!(default_dispatch_enabled());
        assert_eq!(default_dispatch_timeout_s(), 10);
        assert_eq!(default_max_attempts(), 3);
        assert_eq!(default_accepted_pause_ms(), 5000);
        assert_eq!(default_metrics().last(), Some(&Metric::Rain));
    }
}
