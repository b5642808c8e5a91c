//! deCONZ REST client for Zigbee floor-heating thermostats.
//!
//! Only two calls are needed: reading a sensor and updating its
//! `heatsetpoint`. The API key is part of the URL path, so URLs are never
//! logged.

use std::fmt;

use kjeller_types::{SensorReading, Setpoint};
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;

use crate::read_error_body;
use crate::retry::{RetryConfig, RetryOutcome, send_with_retry};

#[derive(Debug, Error)]
pub enum DeconzError {
    #[error("deCONZ request failed: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("deCONZ returned {status}: {body}")]
    Status { status: StatusCode, body: String },
    #[error("deCONZ sensor could not be decoded: {0}")]
    Decode(String),
}

#[derive(Debug, Deserialize)]
struct SensorResponse {
    name: String,
    state: SensorState,
    config: SensorConfig,
}

#[derive(Debug, Deserialize)]
struct SensorState {
    temperature: i32,
    floortemperature: i32,
    heating: bool,
}

#[derive(Debug, Deserialize)]
struct SensorConfig {
    heatsetpoint: i32,
}

impl From<SensorResponse> for SensorReading {
    fn from(raw: SensorResponse) -> Self {
        Self {
            name: raw.name,
            temperature: raw.state.temperature,
            floor_temperature: raw.state.floortemperature,
            heat_setpoint: Setpoint::from_raw(raw.config.heatsetpoint),
            heating: raw.state.heating,
        }
    }
}

#[derive(Clone)]
pub struct DeconzClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    retry: RetryConfig,
}

impl fmt::Debug for DeconzClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeconzClient")
            .field("base_url", &self.base_url)
            .field("api_key", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

impl DeconzClient {
    pub fn new(http: reqwest::Client, endpoint: &str, api_key: impl Into<String>) -> Self {
        Self {
            http,
            base_url: endpoint.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            retry: RetryConfig::default(),
        }
    }

    #[must_use]
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    fn sensor_url(&self, uniqueid: &str) -> String {
        format!("{}/api/{}/sensors/{uniqueid}", self.base_url, self.api_key)
    }

    /// Read the current state and configuration of a thermostat.
    pub async fn sensor(&self, uniqueid: &str) -> Result<SensorReading, DeconzError> {
        let url = self.sensor_url(uniqueid);
        let response = expect_success(send_with_retry(|| self.http.get(&url), &self.retry).await)
            .await?;

        // deCONZ answers reads with exactly 200; anything else carries an error list.
        if response.status() != StatusCode::OK {
            let status = response.status();
            let body = read_error_body(response).await;
            return Err(DeconzError::Status { status, body });
        }

        let bytes = response.bytes().await.map_err(DeconzError::Transport)?;
        let raw: SensorResponse =
            serde_json::from_slice(&bytes).map_err(|e| DeconzError::Decode(e.to_string()))?;
        let reading = SensorReading::from(raw);

        tracing::info!(
            sensor = uniqueid,
            name = %reading.name,
            temperature = reading.temperature,
            floortemperature = reading.floor_temperature,
            heatsetpoint = reading.heat_setpoint.raw(),
            heating = reading.heating,
            "Thermostat read"
        );
        Ok(reading)
    }

    /// Write a new `heatsetpoint` to a thermostat's config.
    pub async fn set_heat_setpoint(
        &self,
        uniqueid: &str,
        setpoint: Setpoint,
    ) -> Result<(), DeconzError> {
        let url = format!("{}/config", self.sensor_url(uniqueid));
        let payload = json!({ "heatsetpoint": setpoint.raw() });

        expect_success(send_with_retry(|| self.http.put(&url).json(&payload), &self.retry).await)
            .await?;
        tracing::debug!(sensor = uniqueid, heatsetpoint = setpoint.raw(), "Setpoint written");
        Ok(())
    }
}

async fn expect_success(outcome: RetryOutcome) -> Result<reqwest::Response, DeconzError> {
    match outcome {
        RetryOutcome::Success(response) => Ok(response),
        RetryOutcome::HttpError(response) => {
            let status = response.status();
            let body = read_error_body(response).await;
            Err(DeconzError::Status { status, body })
        }
        RetryOutcome::ConnectionError { source, .. } | RetryOutcome::NonRetryable(source) => {
            Err(DeconzError::Transport(source))
        }
    }
}
