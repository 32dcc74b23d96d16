//! Prometheus Metrics Module
//!
//! Exposes application metrics via Prometheus format for monitoring.
//!
//! # Metrics Categories
//!
//! - **Connections**: WebSocket connects, disconnects by code, active gauge
//! - **Messages**: Quotes published by providers, sent to and dropped for clients
//! - **Upstream**: Outbound REST requests by outcome, rate-limit signals
//!
//! # Integration
//!
//! Metrics are exposed at `/metrics` on the HTTP server port.

use std::sync::OnceLock;

use metrics::{counter, describe_counter, describe_gauge, gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

// =============================================================================
// Global Metrics Handle
// =============================================================================

static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Initialize the Prometheus metrics recorder.
///
/// # Panics
///
/// Panics if another global recorder was already installed.
#[allow(clippy::expect_used)]
pub fn init_metrics() -> PrometheusHandle {
    PROMETHEUS_HANDLE
        .get_or_init(|| {
            let handle = PrometheusBuilder::new()
                .install_recorder()
                .expect("failed to install Prometheus recorder");

            register_metrics();
            handle
        })
        .clone()
}

/// Get the Prometheus handle for rendering metrics.
///
/// Returns `None` if metrics have not been initialized.
#[must_use]
pub fn get_metrics_handle() -> Option<PrometheusHandle> {
    PROMETHEUS_HANDLE.get().cloned()
}

// =============================================================================
// Metric Registration
// =============================================================================

fn register_metrics() {
    describe_counter!(
        "quote_stream_websocket_connections_total",
        "Total WebSocket connections accepted"
    );
    describe_counter!(
        "quote_stream_websocket_disconnects_total",
        "Total WebSocket connections closed or dropped"
    );
    describe_counter!(
        "quote_stream_websocket_messages_sent_total",
        "Number of messages sent to WebSocket clients"
    );
    describe_gauge!(
        "quote_stream_websocket_active_connections",
        "Current active WebSocket connections"
    );

    describe_counter!(
        "quote_stream_quotes_published_total",
        "Quotes published by the active provider"
    );
    describe_counter!(
        "quote_stream_quotes_dropped_total",
        "Quotes skipped by lagging subscribers"
    );

    describe_counter!(
        "quote_stream_upstream_requests_total",
        "Outbound upstream requests by outcome"
    );
    describe_counter!(
        "quote_stream_upstream_rate_limited_total",
        "Upstream rate-limit responses"
    );
}

// =============================================================================
// Metric Recording Functions
// =============================================================================

/// Outcome label for an upstream request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpstreamOutcome {
    /// Parsed into a quote.
    Quote,
    /// Response carried no usable trade.
    Empty,
    /// Rate limited (429).
    RateLimited,
    /// Other non-success HTTP status.
    HttpError,
    /// Timeout, connection failure or undecodable body.
    TransportError,
}

impl UpstreamOutcome {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Quote => "quote",
            Self::Empty => "empty",
            Self::RateLimited => "rate_limited",
            Self::HttpError => "http_error",
            Self::TransportError => "transport_error",
        }
    }
}

/// Track a new WebSocket connection on an endpoint.
pub fn websocket_connected(endpoint: &'static str) {
    counter!("quote_stream_websocket_connections_total", "endpoint" => endpoint).increment(1);
    gauge!("quote_stream_websocket_active_connections", "endpoint" => endpoint).increment(1.0);
}

/// Track a closed WebSocket connection with its close code.
pub fn websocket_closed(endpoint: &'static str, code: &str) {
    counter!(
        "quote_stream_websocket_disconnects_total",
        "endpoint" => endpoint,
        "code" => code.to_string()
    )
    .increment(1);
    gauge!("quote_stream_websocket_active_connections", "endpoint" => endpoint).decrement(1.0);
}

/// Track an outbound WebSocket message.
pub fn websocket_message_sent(endpoint: &'static str) {
    counter!("quote_stream_websocket_messages_sent_total", "endpoint" => endpoint).increment(1);
}

/// Record a quote published by a provider.
pub fn record_quote_published(provider: &'static str) {
    counter!("quote_stream_quotes_published_total", "provider" => provider).increment(1);
}

/// Record quotes skipped by a lagging subscriber.
pub fn record_quotes_dropped(count: u64) {
    counter!("quote_stream_quotes_dropped_total").increment(count);
}

/// Record the outcome of an upstream request.
pub fn record_upstream_request(provider: &'static str, outcome: UpstreamOutcome) {
    counter!(
        "quote_stream_upstream_requests_total",
        "provider" => provider,
        "outcome" => outcome.as_str()
    )
    .increment(1);

    if outcome == UpstreamOutcome::RateLimited {
        counter!("quote_stream_upstream_rate_limited_total", "provider" => provider).increment(1);
    }
}

// =============================================================================
// Tests
// =============================================================================
