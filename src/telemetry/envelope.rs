//! Telemetry envelope: the JSON document sent to the collector.
//!
//! ```json
//! {
//!   "id": "station-01",
//!   "timestamp": 1700000000,
//!   "key": "secret",
//!   "data": { "temperature": 20.2, "humidity": 50.17, "rain": 5.0,
//!             "hold1": null, "hold2": null, "hold3": null }
//! }
//! ```
//!
//! `hold1`..`hold3` are reserved for future columns and always sent as `null`.
//! Non-finite values are also sent as `null`.

use bytes::Bytes;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::Result;
use crate::pipeline::aggregator::AggregatedRecord;
use crate::pipeline::sample::Schema;

/// Reserved placeholder fields appended to `data`
pub const PLACEHOLDER_FIELDS: [&str; 3] = ["hold1", "hold2", "hold3"];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TelemetryEnvelope {
    #[serde(rename = "id")]
    pub station_id: String,
    pub timestamp: i64,
    #[serde(rename = "key")]
    pub station_key: String,
    /// Column name -> value, in schema order, then the placeholders
    pub data: Map<String, Value>,
}

impl TelemetryEnvelope {
    pub fn new(
        station_id: &str,
        station_key: &str,
        schema: &Schema,
        record: &AggregatedRecord,
    ) -> Self {
        let mut data: Map<String, Value> = schema
            .value_columns()
            .iter()
            .zip(&record.values)
            .map(|(name, &value)| (name.clone(), Value::from(value)))
            .collect();
        for field in PLACEHOLDER_FIELDS {
            data.insert(field.to_string(), Value::Null);
        }

        Self {
            station_id: station_id.to_string(),
            timestamp: record.timestamp,
            station_key: station_key.to_string(),
            data,
        }
    }

    /// Serialize to the request body
    pub fn to_json(&self) -> Result<Bytes> {
        Ok(Bytes::from(serde_json::to_vec_pretty(self)?))
    }
}
