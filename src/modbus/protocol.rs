//! # Modbus RTU Constants and Register Table
//!
//! Static request frames for the station's multi-element sensor. Every frame
//! is a "read holding registers" request with its checksum already appended;
//! the table is configuration and nothing here is computed at runtime.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::StationError;

/// Modbus device address of the sensor on the bus
pub const SENSOR_ADDRESS: u8 = 0x01;

/// Function code: read holding registers
pub const FUNCTION_READ_HOLDING: u8 = 0x03;

/// Request frame size: address(1) + function(1) + register(2) + count(2) + crc(2)
pub const REQUEST_FRAME_LEN: usize = 8;

/// Response size for a single-register read: address + function + byte count + 2 data + crc(2)
pub const SINGLE_RESPONSE_LEN: usize = 7;

/// Response size for the combined temperature/humidity read (two registers)
pub const PAIR_RESPONSE_LEN: usize = 9;

/// A complete, checksummed request frame
pub type RequestFrame = [u8; REQUEST_FRAME_LEN];

/// Combined humidity + temperature read (registers 0x01F8..0x01F9)
pub const TEMPERATURE_HUMIDITY_REQUEST: RequestFrame =
    [0x01, 0x03, 0x01, 0xF8, 0x00, 0x02, 0x44, 0x06];

/// How a raw 16-bit register value maps to engineering units
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scale {
    /// Register value used as-is
    Raw,
    /// Register holds tenths (÷10)
    Tenths,
    /// Register holds hundredths (÷100)
    Hundredths,
}

impl Scale {
    /// Convert a raw register value to a scaled reading
    pub fn apply(self, raw: u16) -> f64 {
        match self {
            Scale::Raw => f64::from(raw),
            Scale::Tenths => f64::from(raw) / 10.0,
            Scale::Hundredths => f64::from(raw) / 100.0,
        }
    }
}

/// A single-register metric exposed by the sensor
///
/// Temperature and humidity are not listed here: they share one two-register
/// read and are always sampled first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    WindSpeed,
    WindScale,
    WindDirection,
    WindAngle,
    Noise,
    Pm2dot5,
    Pm10,
    Pressure,
    Rain,
    Compass,
}

impl Metric {
    /// Every metric the sensor exposes, in register order
    pub const ALL: [Metric; 10] = [
        Metric::WindSpeed,
        Metric::WindScale,
        Metric::WindDirection,
        Metric::WindAngle,
        Metric::Noise,
        Metric::Pm2dot5,
        Metric::Pm10,
        Metric::Pressure,
        Metric::Rain,
        Metric::Compass,
    ];

    /// Column name used in CSV headers and telemetry envelopes
    pub fn name(self) -> &'static str {
        match self {
            Metric::WindSpeed => "wind_speed",
            Metric::WindScale => "wind_scale",
            Metric::WindDirection => "wind_direction",
            Metric::WindAngle => "wind_angle",
            Metric::Noise => "noise",
            Metric::Pm2dot5 => "pm2dot5",
            Metric::Pm10 => "pm10",
            Metric::Pressure => "pressure",
            Metric::Rain => "rain",
            Metric::Compass => "compass",
        }
    }

    /// Request frame registered for this metric
    pub fn request_frame(self) -> RequestFrame {
        match self {
            Metric::WindSpeed => [0x01, 0x03, 0x01, 0xF4, 0x00, 0x01, 0xC4, 0x04],
            Metric::WindScale => [0x01, 0x03, 0x01, 0xF5, 0x00, 0x01, 0x95, 0xC4],
            Metric::WindDirection => [0x01, 0x03, 0x01, 0xF6, 0x00, 0x01, 0x65, 0xC4],
            Metric::WindAngle => [0x01, 0x03, 0x01, 0xF7, 0x00, 0x01, 0x34, 0x04],
            Metric::Noise => [0x01, 0x03, 0x01, 0xFA, 0x00, 0x01, 0xA5, 0xC7],
            Metric::Pm2dot5 => [0x01, 0x03, 0x01, 0xFB, 0x00, 0x01, 0xF4, 0x07],
            Metric::Pm10 => [0x01, 0x03, 0x01, 0xFC, 0x00, 0x01, 0x45, 0xC6],
            Metric::Pressure => [0x01, 0x03, 0x01, 0xFD, 0x00, 0x01, 0x14, 0x06],
            Metric::Rain => [0x01, 0x03, 0x01, 0x01, 0x00, 0x01, 0xD4, 0x36],
            Metric::Compass => [0x01, 0x03, 0x01, 0x02, 0x00, 0x01, 0x24, 0x36],
        }
    }

    /// Unit scaling applied to the decoded register
    pub fn scale(self) -> Scale {
        match self {
            Metric::Noise | Metric::Rain => Scale::Tenths,
            Metric::WindSpeed | Metric::Compass => Scale::Hundredths,
            _ => Scale::Raw,
        }
    }

    /// Whether the register is a running counter (aggregated by delta, not mean)
    pub fn is_accumulating(self) -> bool {
        matches!(self, Metric::Rain)
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Metric {
    type Err = StationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Metric::ALL
            .iter()
            .copied()
            .find(|m| m.name() == s)
            .ok_or_else(|| StationError::Protocol(format!("Unknown metric: {}", s)))
    }
}
