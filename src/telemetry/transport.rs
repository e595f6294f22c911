//! HTTP transport for telemetry envelopes, behind a trait for testing.

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::CONTENT_TYPE;
use serde::de::Error;
use std::time::Duration;

use crate::error::{Result, StationError};

/// Delivers one serialized envelope and reports the collector's status code
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TelemetryTransport: Send + Sync {
    /// POST `body`; `Ok(status)` for any HTTP response, `Err` when no
    /// response arrived (connection refused, timeout, TLS failure)
    async fn post(&self, body: Bytes) -> Result<u16>;
}

/// JSON POST to the collector endpoint with a per-attempt timeout
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    endpoint: reqwest::Url,
}

impl HttpTransport {
    /// # Errors
    ///
    /// Returns error if `endpoint` is not a valid URL or the HTTP client
    /// cannot be built.
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self> {
        let endpoint = reqwest::Url::parse(endpoint).map_err(|e| {
            StationError::Config(toml::de::Error::custom(format!(
                "invalid dispatch endpoint {:?}: {}",
                endpoint, e
            )))
        })?;

        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self { client, endpoint })
    }

    pub fn endpoint(&self) -> &reqwest::Url {
        &self.endpoint
    }
}

#[async_trait]
impl TelemetryTransport for HttpTransport {
    async fn post(&self, body: Bytes) -> Result<u16> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await?;

        Ok(response.status().as_u16())
    }
}
