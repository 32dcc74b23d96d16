//! Polled Provider
//!
//! One background loop polls the last trade of every tracked symbol,
//! sequentially, then sleeps for the poll interval. A 429 sets a shared
//! cooldown and abandons the rest of the sweep; nothing is requested for
//! any symbol until the cooldown has elapsed.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use super::client::{FetchError, PolygonClient, PolygonClientConfig};
use super::cooldown::Cooldown;
use crate::application::ports::{LifecycleState, ProviderError, QuoteProvider, QuoteStream};
use crate::domain::quote::Symbol;
use crate::domain::subscription::{Channel, SubscribeOutcome, SymbolSet};
use crate::infrastructure::broadcast::{FeedSlot, QuoteBroadcast};
use crate::infrastructure::metrics::{self, UpstreamOutcome};
use crate::infrastructure::producer::{ProductionTask, sleep_or_cancel};

const PROVIDER_NAME: &str = "polygon";

/// Provider backed by the polled last-trade endpoint.
#[derive(Debug)]
pub struct PolledProvider {
    client_config: PolygonClientConfig,
    poll_interval: Duration,
    symbols: Arc<SymbolSet>,
    feed: FeedSlot,
    task: ProductionTask,
}

impl PolledProvider {
    /// Create a provider polling `symbols` every `poll_interval`.
    ///
    /// No network resources are allocated until `start`.
    #[must_use]
    pub fn new(
        client_config: PolygonClientConfig,
        symbols: impl IntoIterator<Item = Symbol>,
        poll_interval: Duration,
        feed: QuoteBroadcast,
    ) -> Self {
        Self {
            client_config,
            poll_interval,
            symbols: Arc::new(SymbolSet::new(symbols)),
            feed: FeedSlot::new(feed),
            task: ProductionTask::new(PROVIDER_NAME),
        }
    }

    /// Get the poll interval.
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        self.poll_interval
    }
}

#[async_trait]
impl QuoteProvider for PolledProvider {
    fn name(&self) -> &'static str {
        PROVIDER_NAME
    }

    async fn start(&self) -> Result<(), ProviderError> {
        if self.task.state() == LifecycleState::Running {
            return Ok(());
        }

        let feed = self
            .feed
            .sender()
            .ok_or(ProviderError::Stopped(PROVIDER_NAME))?;
        let client = PolygonClient::new(self.client_config.clone())
            .map_err(|e| ProviderError::HttpClient(e.to_string()))?;

        let poller = Poller {
            client,
            interval: self.poll_interval,
            symbols: Arc::clone(&self.symbols),
            feed,
        };
        self.task.start(|cancel| poller.run(cancel))?;
        Ok(())
    }

    async fn stop(&self) {
        self.task.stop().await;
        self.feed.close();
    }

    async fn subscribe(&self, symbol: &str, channel: Channel) -> SubscribeOutcome {
        let outcome = self.symbols.subscribe(symbol);
        tracing::debug!(
            provider = PROVIDER_NAME,
            symbol,
            channel = channel.as_str(),
            ?outcome,
            "Subscribe request"
        );
        outcome
    }

    fn stream(&self) -> QuoteStream {
        self.feed.subscribe()
    }

    fn tracked_symbols(&self) -> Vec<Symbol> {
        self.symbols.snapshot()
    }

    fn state(&self) -> LifecycleState {
        self.task.state()
    }
}

// =============================================================================
// Polling Loop
// =============================================================================

struct Poller {
    client: PolygonClient,
    interval: Duration,
    symbols: Arc<SymbolSet>,
    feed: QuoteBroadcast,
}

/// How a sweep ended.
enum Sweep {
    Completed,
    RateLimited,
    Cancelled,
}

impl Poller {
    async fn run(self, cancel: CancellationToken) {
        let mut cooldown = Cooldown::default();

        loop {
            if let Some(wait) = cooldown.remaining(Instant::now()) {
                tracing::debug!(provider = PROVIDER_NAME, ?wait, "Waiting out rate-limit cooldown");
                if !sleep_or_cancel(&cancel, wait).await {
                    return;
                }
                continue;
            }

            match self.sweep(&cancel, &mut cooldown).await {
                Sweep::Cancelled => return,
                Sweep::RateLimited => continue,
                Sweep::Completed => {}
            }

            if !sleep_or_cancel(&cancel, self.interval).await {
                return;
            }
        }
    }

    async fn sweep(&self, cancel: &CancellationToken, cooldown: &mut Cooldown) -> Sweep {
        for symbol in self.symbols.snapshot() {
            let result = tokio::select! {
                () = cancel.cancelled() => return Sweep::Cancelled,
                result = self.client.fetch_last_trade(symbol) => result,
            };

            match result {
                Ok(Some(quote)) => {
                    metrics::record_upstream_request(PROVIDER_NAME, UpstreamOutcome::Quote);
                    metrics::record_quote_published(PROVIDER_NAME);
                    let _ = self.feed.publish(quote);
                }
                Ok(None) => {
                    metrics::record_upstream_request(PROVIDER_NAME, UpstreamOutcome::Empty);
                    tracing::debug!(provider = PROVIDER_NAME, %symbol, "No usable trade in response");
                }
                Err(FetchError::RateLimited { retry_after }) => {
                    metrics::record_upstream_request(PROVIDER_NAME, UpstreamOutcome::RateLimited);
                    cooldown.extend(Instant::now(), retry_after);
                    tracing::warn!(
                        provider = PROVIDER_NAME,
                        %symbol,
                        retry_after_secs = retry_after.as_secs_f64(),
                        "Upstream rate limit hit, pausing all requests"
                    );
                    return Sweep::RateLimited;
                }
                Err(FetchError::Status(status)) => {
                    metrics::record_upstream_request(PROVIDER_NAME, UpstreamOutcome::HttpError);
                    tracing::warn!(provider = PROVIDER_NAME, %symbol, %status, "Upstream request failed");
                }
                Err(e) => {
                    metrics::record_upstream_request(PROVIDER_NAME, UpstreamOutcome::TransportError);
                    tracing::debug!(provider = PROVIDER_NAME, %symbol, error = %e, "Upstream request error");
                }
            }
        }

        Sweep::Completed
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use futures::StreamExt;
    use tokio::time::timeout;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::infrastructure::config::Credentials;

    const TRADE_TIME_NS: i64 = 1_700_000_000_000_000_000;

    fn provider_for(server: &MockServer, symbols: &[Symbol]) -> PolledProvider {
        let config = PolygonClientConfig {
            base_url: server.uri(),
            credentials: Credentials::new("test-key").unwrap(),
            timeout: Duration::from_secs(2),
        };
        PolledProvider::new(
            config,
            symbols.iter().copied(),
            Duration::from_millis(20),
            QuoteBroadcast::default(),
        )
    }

    #[tokio::test]
    async fn publishes_parsed_trade() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v2/last/trade/AAPL"))
            .and(query_param("apiKey", "test-key"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({
                    "results": {"p": 123.45, "s": 42, "t": TRADE_TIME_NS}
                })),
            )
            .mount(&server)
            .await;

        let provider = provider_for(&server, &[Symbol::Aapl]);
        let mut stream = provider.stream();
        provider.start().await.unwrap();

        let quote = timeout(Duration::from_secs(2), stream.next())
            .await
            .unwrap()
            .unwrap();
        provider.stop().await;

        assert_eq!(quote.symbol(), Symbol::Aapl);
        assert!((quote.price() - 123.45).abs() < 1e-9);
        assert_eq!(quote.volume(), 42);
    }

    #[tokio::test]
    async fn rate_limit_pauses_every_symbol() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "30"))
            .mount(&server)
            .await;

        let provider = provider_for(&server, &[Symbol::Aapl, Symbol::Msft]);
        provider.start().await.unwrap();
        tokio::time::sleep(Duration::from_millis(300)).await;
        provider.stop().await;

        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].url.path(), "/v2/last/trade/AAPL");
    }

    #[tokio::test]
    async fn server_errors_do_not_stop_polling() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let provider = provider_for(&server, &[Symbol::Tsla]);
        provider.start().await.unwrap();
        tokio::time::sleep(Duration::from_millis(200)).await;
        provider.stop().await;

        assert!(server.received_requests().await.unwrap().len() >= 2);
    }

    #[tokio::test]
    async fn subscribe_adds_symbol_to_next_sweep() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"results": {"p": 1.0, "t": TRADE_TIME_NS}})),
            )
            .mount(&server)
            .await;

        let provider = provider_for(&server, &[Symbol::Aapl]);
        assert_eq!(
            provider.subscribe("MSFT", Channel::Trades).await,
            SubscribeOutcome::Added(Symbol::Msft)
        );
        assert_eq!(provider.subscribe("GOOG", Channel::Quotes).await, SubscribeOutcome::Ignored);
        assert_eq!(provider.tracked_symbols(), vec![Symbol::Aapl, Symbol::Msft]);

        let mut stream = provider.stream();
        provider.start().await.unwrap();
        let found = timeout(Duration::from_secs(2), async {
            loop {
                if stream.next().await.unwrap().symbol() == Symbol::Msft {
                    break;
                }
            }
        })
        .await;
        provider.stop().await;

        assert!(found.is_ok());
    }

    #[tokio::test]
    async fn stop_ends_open_streams() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let provider = provider_for(&server, &[Symbol::Aapl]);
        let mut stream = provider.stream();
        provider.start().await.unwrap();
        provider.stop().await;

        let ended = timeout(Duration::from_millis(500), stream.next()).await;
        assert!(matches!(ended, Ok(None)), "stream still open after stop");
    }

    #[tokio::test]
    async fn stop_before_start_is_safe() {
        let server = MockServer::start().await;
        let provider = provider_for(&server, &[Symbol::Aapl]);

        provider.stop().await;
        assert_eq!(provider.state(), LifecycleState::Stopped);
        assert!(provider.start().await.is_err());
        assert!(server.received_requests().await.unwrap().is_empty());
    }
}
