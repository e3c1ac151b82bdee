//! Remote status transports.
//!
//! The agent learns about operator commands by re-reading each sensor's
//! current status. When `agent.remote_url` is set it asks the HTTP API;
//! otherwise it reads the shared store directly.

use std::time::Duration;

use pisensor_core::{RemoteStatusSource, TransportError};
use pisensor_db::Database;
use pisensor_types::{SensorStatus, StatusRecord};
use reqwest::StatusCode;

/// Reads `GET {base}/api/sensor/status/current/{sensorId}`.
#[derive(Debug, Clone)]
pub struct HttpStatusSource {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl HttpStatusSource {
    /// Build a client whose requests give up after `timeout`.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_owned(),
            timeout,
        })
    }

    /// Base URL requests are sent to.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

impl RemoteStatusSource for HttpStatusSource {
    async fn current_status(&self, sensor_id: &str) -> Result<Option<SensorStatus>, TransportError> {
        let url = format!("{}/api/sensor/status/current/{sensor_id}", self.base_url);
        let response = self.client.get(&url).send().await.map_err(|e| {
            if e.is_timeout() {
                TransportError::Timeout(self.timeout)
            } else {
                TransportError::Request(e.to_string())
            }
        })?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(TransportError::Status(status.as_u16()));
        }

        let record: StatusRecord = response
            .json()
            .await
            .map_err(|e| TransportError::Decode(e.to_string()))?;
        Ok(Some(record.status))
    }
}

/// The transport chosen at startup.
pub enum RemoteSource {
    /// Read the shared store directly.
    Store(Database),
    /// Ask the HTTP API.
    Http(HttpStatusSource),
}

impl RemoteStatusSource for RemoteSource {
    async fn current_status(&self, sensor_id: &str) -> Result<Option<SensorStatus>, TransportError> {
        match self {
            Self::Store(db) => db.current_status(sensor_id).await,
            Self::Http(http) => http.current_status(sensor_id).await,
        }
    }
}
