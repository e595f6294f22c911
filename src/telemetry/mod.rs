//! # Telemetry Module
//!
//! Forwards aggregated records to the remote collector.
//!
//! This module handles:
//! - Building the JSON telemetry envelope (identity, timestamp, data, placeholders)
//! - POSTing it over HTTP(S) with a per-attempt timeout
//! - Retrying on transient failures and keeping the last payload on disk

pub mod envelope;
pub mod transport;
pub mod dispatcher;

pub use dispatcher::{DispatchOutcome, Dispatcher, RetryPolicy};
pub use envelope::TelemetryEnvelope;
pub use transport::{HttpTransport, TelemetryTransport};
