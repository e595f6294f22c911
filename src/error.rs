//! # Error Types
//!
//! Custom error types for the weather station using `thiserror`.

use thiserror::Error;

/// Main error type for the weather station
#[derive(Debug, Error)]
pub enum StationError {
    /// Modbus frame errors (bad length, header, checksum)
    #[error("Modbus protocol error: {0}")]
    Protocol(String),

    /// Serial port errors
    #[error("Serial error: {0}")]
    Serial(String),

    /// None of the candidate serial devices could be opened
    #[error("No sensor serial port could be opened (tried: {0})")]
    SerialPortNotFound(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP transport errors (connection refused, timeout, TLS)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Envelope serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for the weather station
pub type Result<T> = std::result::Result<T, StationError>;
