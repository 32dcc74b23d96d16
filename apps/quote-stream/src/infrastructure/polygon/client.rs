//! Last-Trade REST Client

use std::time::Duration;

use reqwest::StatusCode;
use reqwest::header::RETRY_AFTER;

use super::cooldown::parse_retry_after;
use super::payload::extract_trade;
use crate::domain::quote::{Quote, Symbol};
use crate::infrastructure::config::Credentials;

/// Client configuration.
#[derive(Debug, Clone)]
pub struct PolygonClientConfig {
    /// Base URL without trailing path, e.g. `https://api.polygon.io`.
    pub base_url: String,
    /// API key sent as the `apiKey` query parameter.
    pub credentials: Credentials,
    /// Connect and whole-request timeout.
    pub timeout: Duration,
}

/// Errors from a single last-trade fetch.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// Upstream answered 429.
    #[error("rate limited, retry after {retry_after:?}")]
    RateLimited {
        /// Wait requested by the upstream.
        retry_after: Duration,
    },

    /// Upstream answered with another non-success status.
    #[error("unexpected status: {0}")]
    Status(StatusCode),

    /// Connection failure or timeout.
    #[error("transport error: {0}")]
    Transport(#[source] reqwest::Error),

    /// Body was not JSON.
    #[error("decode error: {0}")]
    Decode(#[source] reqwest::Error),
}

/// REST client for the last-trade endpoint.
#[derive(Debug, Clone)]
pub struct PolygonClient {
    http: reqwest::Client,
    base_url: String,
    credentials: Credentials,
}

impl PolygonClient {
    /// Build a client.
    ///
    /// # Errors
    ///
    /// Returns the underlying error if the TLS backend cannot be initialized.
    pub fn new(config: PolygonClientConfig) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .connect_timeout(config.timeout)
            .timeout(config.timeout)
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            credentials: config.credentials,
        })
    }

    /// Fetch the most recent trade for `symbol`.
    ///
    /// Returns `Ok(None)` when the response carries no usable trade.
    ///
    /// # Errors
    ///
    /// Returns `FetchError` on rate limiting, non-success status, transport
    /// failure or an undecodable body.
    pub async fn fetch_last_trade(&self, symbol: Symbol) -> Result<Option<Quote>, FetchError> {
        let url = format!("{}/v2/last/trade/{}", self.base_url, symbol.as_str());

        let response = self
            .http
            .get(&url)
            .query(&[("apiKey", self.credentials.api_key())])
            .send()
            .await
            .map_err(FetchError::Transport)?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            let header = response
                .headers()
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok());
            return Err(FetchError::RateLimited {
                retry_after: parse_retry_after(header),
            });
        }
        if !status.is_success() {
            return Err(FetchError::Status(status));
        }

        let body: serde_json::Value = response.json().await.map_err(FetchError::Decode)?;

        Ok(extract_trade(&body).and_then(|trade| trade.into_quote(symbol)))
    }
}
