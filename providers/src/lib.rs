//! HTTP clients for the services Kjeller talks to.
//!
//! - [`tibber`] - Tibber GraphQL API, today's hourly electricity prices
//! - [`deconz`] - deCONZ REST API, thermostat readings and setpoints
//! - [`retry`] - shared retry policy with exponential backoff
//!
//! Both clients share one [`reqwest::Client`] built by [`http_client`]. Unlike
//! a public API client, the deCONZ gateway is usually reached over plain HTTP on
//! the local network, so the client does not enforce HTTPS.

pub mod deconz;
pub mod retry;
pub mod tibber;

use std::time::Duration;

use reqwest::{Client, redirect::Policy};

pub use deconz::{DeconzClient, DeconzError};
pub use retry::{RetryConfig, RetryOutcome, send_with_retry};
pub use tibber::{TibberClient, TibberError};

/// Sent on every request; Tibber asks integrations to identify themselves.
pub const USER_AGENT: &str = "Kjeller/0.1";

const CONNECT_TIMEOUT_SECS: u64 = 10;
const REQUEST_TIMEOUT_SECS: u64 = 30;
const TCP_KEEPALIVE_SECS: u64 = 60;

const MAX_ERROR_BODY_BYTES: usize = 32 * 1024;

pub fn http_client() -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(USER_AGENT)
        .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
        .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
        .tcp_keepalive(Some(Duration::from_secs(TCP_KEEPALIVE_SECS)))
        .redirect(Policy::none())
        .build()
}

/// Read an error response body, capped at [`MAX_ERROR_BODY_BYTES`].
pub(crate) async fn read_error_body(response: reqwest::Response) -> String {
    match response.text().await {
        Ok(mut text) => {
            if text.len() > MAX_ERROR_BODY_BYTES {
                let mut cut = MAX_ERROR_BODY_BYTES;
                while !text.is_char_boundary(cut) {
                    cut -= 1;
                }
                text.truncate(cut);
                text.push_str("...(truncated)");
            }
            text
        }
        Err(e) => format!("<failed to read body: {e}>"),
    }
}
