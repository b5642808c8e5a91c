//! Tibber GraphQL client.
//!
//! Fetches the `today` price list of the house's current subscription. Each
//! entry is one hour with a `total` (energy + tax, in the subscription's
//! currency per kWh) and a `startsAt` RFC 3339 timestamp with offset.

use std::fmt;

use chrono::DateTime;
use kjeller_types::PricePoint;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::{Value, json};
use thiserror::Error;

use crate::read_error_body;
use crate::retry::{RetryConfig, RetryOutcome, send_with_retry};

const PRICE_QUERY: &str = r"
query ($house_id: ID!) {
  viewer {
    home(id: $house_id) {
      currentSubscription {
        priceInfo {
          current { total startsAt }
          today { total startsAt }
        }
      }
    }
  }
}
";

/// Where `today` lives in the response document.
const PRICE_PATH: &[&str] = &[
    "data",
    "viewer",
    "home",
    "currentSubscription",
    "priceInfo",
    "today",
];

#[derive(Debug, Error)]
pub enum TibberError {
    #[error("Tibber request failed: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("Tibber API error {status}: {body}")]
    Status { status: StatusCode, body: String },
    #[error("Tibber GraphQL error: {0}")]
    Api(String),
    #[error("Tibber response is missing '{key}'")]
    MissingPrices { key: &'static str },
    #[error("Tibber response could not be decoded: {0}")]
    Decode(String),
}

#[derive(Debug, Deserialize)]
struct RawPrice {
    total: f64,
    #[serde(rename = "startsAt")]
    starts_at: String,
}

#[derive(Clone)]
pub struct TibberClient {
    http: reqwest::Client,
    endpoint: String,
    access_token: String,
    house_id: String,
    retry: RetryConfig,
}

impl fmt::Debug for TibberClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TibberClient")
            .field("endpoint", &self.endpoint)
            .field("access_token", &"[REDACTED]")
            .field("house_id", &self.house_id)
            .finish_non_exhaustive()
    }
}

impl TibberClient {
    pub fn new(
        http: reqwest::Client,
        endpoint: impl Into<String>,
        access_token: impl Into<String>,
        house_id: impl Into<String>,
    ) -> Self {
        Self {
            http,
            endpoint: endpoint.into(),
            access_token: access_token.into(),
            house_id: house_id.into(),
            retry: RetryConfig::default(),
        }
    }

    #[must_use]
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Today's hourly prices, in the order Tibber returns them.
    pub async fn fetch_today(&self) -> Result<Vec<PricePoint>, TibberError> {
        let body = json!({
            "query": PRICE_QUERY,
            "variables": { "house_id": self.house_id },
        });

        let outcome = send_with_retry(
            || {
                self.http
                    .post(&self.endpoint)
                    .bearer_auth(&self.access_token)
                    .json(&body)
            },
            &self.retry,
        )
        .await;

        let response = match outcome {
            RetryOutcome::Success(response) => response,
            RetryOutcome::HttpError(response) => {
                let status = response.status();
                let body = read_error_body(response).await;
                return Err(TibberError::Status { status, body });
            }
            RetryOutcome::ConnectionError { source, .. } | RetryOutcome::NonRetryable(source) => {
                return Err(TibberError::Transport(source));
            }
        };

        let bytes = response.bytes().await.map_err(TibberError::Transport)?;
        let payload: Value =
            serde_json::from_slice(&bytes).map_err(|e| TibberError::Decode(e.to_string()))?;
        let prices = extract_today(&payload)?;
        tracing::info!(count = prices.len(), "Tibber price updated");
        Ok(prices)
    }
}

/// Pull `data.viewer.home.currentSubscription.priceInfo.today` out of a
/// GraphQL response.
pub fn extract_today(payload: &Value) -> Result<Vec<PricePoint>, TibberError> {
    let mut node = payload;
    for &key in PRICE_PATH {
        match node.get(key) {
            Some(next) if !next.is_null() => node = next,
            _ => {
                if let Some(message) = first_graphql_error(payload) {
                    return Err(TibberError::Api(message));
                }
                tracing::error!(key, "Missing key in Tibber API response");
                return Err(TibberError::MissingPrices { key });
            }
        }
    }

    let entries = node
        .as_array()
        .ok_or(TibberError::MissingPrices { key: "today" })?;

    entries
        .iter()
        .map(|entry| {
            let raw = RawPrice::deserialize(entry)
                .map_err(|e| TibberError::Decode(format!("price entry: {e}")))?;
            let starts_at = DateTime::parse_from_rfc3339(&raw.starts_at)
                .map_err(|e| TibberError::Decode(format!("startsAt '{}': {e}", raw.starts_at)))?;
            Ok(PricePoint::new(raw.total, starts_at))
        })
        .collect()
}

fn first_graphql_error(payload: &Value) -> Option<String> {
    payload
        .get("errors")?
        .as_array()?
        .first()?
        .get("message")?
        .as_str()
        .map(ToString::to_string)
}
