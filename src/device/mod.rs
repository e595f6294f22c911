//! # Device Link
//!
//! Request/response cycles against the weather sensor.
//!
//! Every poll is one exclusive cycle on the serial port: discard stale input,
//! write the metric's fixed request frame, wait the settle delay, then read
//! exactly the reply length for that request type. A reply that is short,
//! late or corrupt becomes [`Reading::Unavailable`]; the link never fails a
//! poll with an error.

use std::time::Duration;
use tracing::debug;

use crate::config::SerialConfig;
use crate::modbus::decoder::{decode_register, decode_temperature_humidity};
use crate::modbus::protocol::{
    Metric, RequestFrame, PAIR_RESPONSE_LEN, SINGLE_RESPONSE_LEN, TEMPERATURE_HUMIDITY_REQUEST,
};
use crate::serial::SerialPortIO;

/// Outcome of one poll
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Reading<T> {
    /// The device answered with a valid reply
    Value(T),
    /// No usable reply (timeout, short read, bad checksum, write failure)
    Unavailable,
}

impl<T> Reading<T> {
    pub fn is_available(&self) -> bool {
        matches!(self, Reading::Value(_))
    }

    /// The value, if the device answered
    pub fn value(self) -> Option<T> {
        match self {
            Reading::Value(v) => Some(v),
            Reading::Unavailable => None,
        }
    }
}

impl Reading<f64> {
    /// Value used by the pipeline: unavailable reads count as 0.0
    pub fn or_sentinel(self) -> f64 {
        self.value().unwrap_or(0.0)
    }
}

impl Reading<(f64, f64)> {
    /// Value used by the pipeline: unavailable reads count as (0.0, 0.0)
    pub fn or_sentinel(self) -> (f64, f64) {
        self.value().unwrap_or((0.0, 0.0))
    }
}

/// Exclusive owner of the sensor's serial port
pub struct DeviceLink {
    port: Box<dyn SerialPortIO>,
    /// Pause between writing a request and reading the reply
    settle: Duration,
    /// Upper bound on waiting for the reply bytes
    read_timeout: Duration,
}

impl std::fmt::Debug for DeviceLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceLink")
            .field("settle", &self.settle)
            .field("read_timeout", &self.read_timeout)
            .finish_non_exhaustive()
    }
}

impl DeviceLink {
    pub fn new(port: Box<dyn SerialPortIO>, settle: Duration, read_timeout: Duration) -> Self {
        Self {
            port,
            settle,
            read_timeout,
        }
    }

    /// Build a link using the `[serial]` timing settings
    pub fn from_config(port: Box<dyn SerialPortIO>, config: &SerialConfig) -> Self {
        Self::new(
            port,
            Duration::from_millis(config.settle_ms),
            Duration::from_millis(config.timeout_ms),
        )
    }

    /// Poll a single-register metric and apply its unit scale
    pub async fn poll(&mut self, metric: Metric) -> Reading<f64> {
        let Some(reply) = self.exchange(&metric.request_frame(), SINGLE_RESPONSE_LEN).await else {
            return Reading::Unavailable;
        };

        match decode_register(&reply) {
            Ok(raw) => Reading::Value(metric.scale().apply(raw)),
            Err(e) => {
                debug!("Discarding {} reply: {}", metric, e);
                Reading::Unavailable
            }
        }
    }

    /// Poll the combined register pair
    ///
    /// # Returns
    ///
    /// * `Reading<(f64, f64)>` - `(temperature, humidity)`
    pub async fn poll_temperature_humidity(&mut self) -> Reading<(f64, f64)> {
        let Some(reply) = self.exchange(&TEMPERATURE_HUMIDITY_REQUEST, PAIR_RESPONSE_LEN).await else {
            return Reading::Unavailable;
        };

        match decode_temperature_humidity(&reply) {
            Ok(pair) => Reading::Value(pair),
            Err(e) => {
                debug!("Discarding temperature/humidity reply: {}", e);
                Reading::Unavailable
            }
        }
    }

    /// One request/response cycle. `None` when the port itself failed.
    async fn exchange(&mut self, frame: &RequestFrame, reply_len: usize) -> Option<Vec<u8>> {
        if let Err(e) = self.port.discard_input() {
            debug!("Failed to discard stale input: {}", e);
        }

        if let Err(e) = self.port.write_all(frame).await {
            debug!("Failed to write request: {}", e);
            return None;
        }
        if let Err(e) = self.port.flush().await {
            debug!("Failed to flush request: {}", e);
            return None;
        }

        if !self.settle.is_zero() {
            tokio::time::sleep(self.settle).await;
        }

        match self.port.read_up_to(reply_len, self.read_timeout).await {
            Ok(reply) => Some(reply),
            Err(e) => {
                debug!("Failed to read reply: {}", e);
                None
            }
        }
    }
}
