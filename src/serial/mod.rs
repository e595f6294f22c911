//! # Serial Communication Module
//!
//! Handles the RS-485 serial link to the weather sensor.
//!
//! This module handles:
//! - Opening the serial port at the sensor's fixed baud rate (8N1)
//! - Falling back across candidate device paths
//! - Exposing the port through [`SerialPortIO`] so the device link can be tested

pub mod port_trait;

pub use port_trait::{SerialPortIO, TokioSerialPort};

use crate::error::{Result, StationError};
use tokio_serial::SerialPortBuilderExt;
use tracing::{debug, info, warn};

/// Factory default baud rate of the sensor
pub const SENSOR_BAUD_RATE: u32 = 4800;

/// Device paths tried when none is configured (in order of preference)
pub const DEFAULT_DEVICE_PATHS: &[&str] = &[
    "/dev/ttyS0",   // Raspberry Pi mini UART wired to an RS-485 HAT
    "/dev/ttyUSB0", // USB-to-RS485 adapters
];

/// Sensor Serial Port Handler
///
/// Owns the opened port; hand it to a [`crate::device::DeviceLink`] with
/// [`SensorSerial::into_port`].
pub struct SensorSerial {
    /// Serial port handle
    port: tokio_serial::SerialStream,
    /// Device path (e.g., /dev/ttyS0)
    device_path: String,
}

impl std::fmt::Debug for SensorSerial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SensorSerial")
            .field("device_path", &self.device_path)
            .finish_non_exhaustive()
    }
}

impl SensorSerial {
    /// Open the first of `paths` that succeeds
    ///
    /// # Errors
    ///
    /// Returns [`StationError::SerialPortNotFound`] listing every path tried
    /// when none of them could be opened.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use weather_station::serial::{SensorSerial, SENSOR_BAUD_RATE};
    ///
    /// let serial = SensorSerial::open_with_paths(&["/dev/ttyS0"], SENSOR_BAUD_RATE)?;
    /// println!("Connected to: {}", serial.device_path());
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn open_with_paths(paths: &[&str], baud_rate: u32) -> Result<Self> {
        for path in paths {
            debug!("Trying to open serial port: {}", path);

            match Self::open_port(path, baud_rate) {
                Ok(port) => {
                    info!("Opened sensor serial port at {} ({} baud)", path, baud_rate);
                    return Ok(Self {
                        port,
                        device_path: path.to_string(),
                    });
                }
                Err(e) => {
                    warn!("Failed to open {}: {}", path, e);
                    continue;
                }
            }
        }

        Err(StationError::SerialPortNotFound(paths.join(", ")))
    }

    /// Open a specific serial port with 8N1 settings
    fn open_port(path: &str, baud_rate: u32) -> Result<tokio_serial::SerialStream> {
        let port = tokio_serial::new(path, baud_rate)
            .data_bits(tokio_serial::DataBits::Eight)
            .parity(tokio_serial::Parity::None)
            .stop_bits(tokio_serial::StopBits::One)
            .flow_control(tokio_serial::FlowControl::None)
            .open_native_async()
            .map_err(|e| StationError::Serial(format!("Failed to open {}: {}", path, e)))?;

        Ok(port)
    }

    /// Get the device path of the opened serial port
    pub fn device_path(&self) -> &str {
        &self.device_path
    }

    /// Wrap the opened port for use by the device link
    pub fn into_port(self) -> Box<dyn SerialPortIO> {
        Box::new(TokioSerialPort::new(self.port))
    }
}
