//! # Dispatcher
//!
//! Sends each aggregated record to the collector with a small retry budget.
//!
//! Status policy per attempt:
//! - 200 / 201: delivered, stop
//! - 202: accepted but delayed; pause briefly, stop
//! - anything else, or no response: consume an attempt and try again
//!
//! The serialized payload is written to the data directory before the first
//! attempt, so the last envelope is on disk whatever the outcome. Delivery is
//! best effort: a failed dispatch is logged and the pipeline carries on.

use bytes::Bytes;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::fs;
use tracing::{debug, error, info, warn};

use super::envelope::TelemetryEnvelope;
use super::transport::TelemetryTransport;
use crate::config::{DispatchConfig, StationConfig};
use crate::error::Result;
use crate::pipeline::aggregator::AggregatedRecord;
use crate::pipeline::sample::Schema;

/// File name of the last outbound payload inside the data directory
pub const PAYLOAD_FILE_NAME: &str = "latest_data.json";

/// Result of dispatching one record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Collector answered 200 or 201
    Delivered,
    /// Collector answered 202 (accepted, processing delayed)
    DeliveredDegraded,
    /// Every attempt failed
    Failed,
}

/// Retry and pacing settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub accepted_pause: Duration,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            accepted_pause: Duration::from_secs(5),
            backoff: Duration::ZERO,
        }
    }
}

impl From<&DispatchConfig> for RetryPolicy {
    fn from(config: &DispatchConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            accepted_pause: Duration::from_millis(config.accepted_pause_ms),
            backoff: Duration::from_millis(config.retry_backoff_ms),
        }
    }
}

/// Builds envelopes and pushes them through a [`TelemetryTransport`]
pub struct Dispatcher {
    station: StationConfig,
    schema: Schema,
    transport: Arc<dyn TelemetryTransport>,
    payload_path: PathBuf,
    policy: RetryPolicy,
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("station_id", &self.station.id)
            .field("payload_path", &self.payload_path)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl Dispatcher {
    pub fn new(
        station: StationConfig,
        schema: Schema,
        transport: Arc<dyn TelemetryTransport>,
        data_dir: &Path,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            station,
            schema,
            transport,
            payload_path: data_dir.join(PAYLOAD_FILE_NAME),
            policy,
        }
    }

    /// Where the last outbound payload is kept
    pub fn payload_path(&self) -> &Path {
        &self.payload_path
    }

    /// Dispatch one record
    pub async fn send(&self, record: &AggregatedRecord) -> DispatchOutcome {
        let envelope =
            TelemetryEnvelope::new(&self.station.id, &self.station.key, &self.schema, record);
        let body = match envelope.to_json() {
            Ok(body) => body,
            Err(e) => {
                error!("Failed to serialize telemetry envelope: {}", e);
                return DispatchOutcome::Failed;
            }
        };

        if let Err(e) = self.persist_payload(&body).await {
            warn!("Failed to keep local copy at {}: {}", self.payload_path.display(), e);
        }

        for attempt in 1..=self.policy.max_attempts {
            match self.transport.post(body.clone()).await {
                Ok(200) | Ok(201) => {
                    info!("Record {} delivered (attempt {})", record.timestamp, attempt);
                    return DispatchOutcome::Delivered;
                }
                Ok(202) => {
                    info!("Record {} accepted with delay (attempt {})", record.timestamp, attempt);
                    if !self.policy.accepted_pause.is_zero() {
                        tokio::time::sleep(self.policy.accepted_pause).await;
                    }
                    return DispatchOutcome::DeliveredDegraded;
                }
                Ok(status) => {
                    warn!(
                        "Collector answered {} (attempt {}/{})",
                        status, attempt, self.policy.max_attempts
                    );
                }
                Err(e) => {
                    warn!(
                        "Dispatch failed: {} (attempt {}/{})",
                        e, attempt, self.policy.max_attempts
                    );
                }
            }

            if attempt < self.policy.max_attempts && !self.policy.backoff.is_zero() {
                debug!("Retrying in {:?}", self.policy.backoff);
                tokio::time::sleep(self.policy.backoff).await;
            }
        }

        error!(
            "Giving up on record {} after {} attempts; it remains in the local log",
            record.timestamp, self.policy.max_attempts
        );
        DispatchOutcome::Failed
    }

    /// Write via a temp file and rename
    async fn persist_payload(&self, body: &Bytes) -> Result<()> {
        if let Some(parent) = self.payload_path.parent() {
            fs::create_dir_all(parent).await?;
        }
        let tmp = self.payload_path.with_extension("json.tmp");
        fs::write(&tmp, body).await?;
        fs::rename(&tmp, &self.payload_path).await?;
        Ok(())
    }
}
