//! Quote WebSocket Integration Tests
//!
//! Runs the HTTP server on an ephemeral port and consumes `/ws/quotes`
//! with a real WebSocket client.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use futures::{SinkExt, StreamExt};
use parking_lot::Mutex;
use serde_json::Value;
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use quote_stream::{
    AppState, Channel, Credentials, HttpServer, LifecycleState, ProviderError, ProviderKind,
    ProviderRegistry, ProviderSettings, Quote, QuoteBroadcast, QuoteProvider, QuoteStream,
    SharedProvider, SubscribeOutcome, Symbol,
};

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

const READ_TIMEOUT: Duration = Duration::from_secs(3);

const TRADE_TIME_NS: i64 = 1_700_000_000_000_000_000;

// =============================================================================
// Helpers
// =============================================================================

async fn serve(registry: ProviderRegistry) -> (String, CancellationToken) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let cancel = CancellationToken::new();

    let state = AppState::new(Arc::new(registry), "test");
    let server = HttpServer::new(addr.port(), state, cancel.clone());
    tokio::spawn(async move {
        server.serve(listener).await.unwrap();
    });

    (format!("ws://{addr}/ws/quotes"), cancel)
}

async fn next_quote(client: &mut Client) -> Value {
    loop {
        let message = timeout(READ_TIMEOUT, client.next())
            .await
            .expect("timed out waiting for a quote")
            .expect("socket ended")
            .unwrap();
        if let Message::Text(text) = message {
            return serde_json::from_str(text.as_str()).unwrap();
        }
    }
}

/// Provider whose feed is driven by the test.
struct ScriptedProvider {
    feed: Mutex<Option<QuoteBroadcast>>,
}

impl ScriptedProvider {
    fn new() -> Self {
        Self {
            feed: Mutex::new(Some(QuoteBroadcast::new(64))),
        }
    }

    fn publish(&self, quote: Quote) {
        if let Some(feed) = self.feed.lock().as_ref() {
            let _ = feed.publish(quote);
        }
    }

    fn receivers(&self) -> usize {
        self.feed
            .lock()
            .as_ref()
            .map_or(0, QuoteBroadcast::receiver_count)
    }

    /// Drop the only sender so every open stream ends.
    fn finish(&self) {
        self.feed.lock().take();
    }

    async fn wait_for_receivers(&self, count: usize) {
        timeout(READ_TIMEOUT, async {
            while self.receivers() != count {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("receiver count never reached");
    }
}

#[async_trait]
impl QuoteProvider for ScriptedProvider {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn start(&self) -> Result<(), ProviderError> {
        Ok(())
    }

    async fn stop(&self) {}

    async fn subscribe(&self, _symbol: &str, _channel: Channel) -> SubscribeOutcome {
        SubscribeOutcome::Ignored
    }

    fn stream(&self) -> QuoteStream {
        self.feed
            .lock()
            .as_ref()
            .map_or_else(|| futures::stream::empty().boxed(), QuoteBroadcast::subscribe)
    }

    fn tracked_symbols(&self) -> Vec<Symbol> {
        vec![Symbol::Aapl]
    }

    fn state(&self) -> LifecycleState {
        LifecycleState::Running
    }
}

// =============================================================================
// End-to-end Sources
// =============================================================================

#[tokio::test]
async fn synthetic_source_streams_tracked_symbols() {
    let settings = ProviderSettings {
        symbols: "AAPL,MSFT".to_string(),
        synthetic_interval: Duration::from_millis(10),
        ..ProviderSettings::default()
    };
    let registry = ProviderRegistry::new(settings);
    let provider = registry.provider().await.unwrap();
    provider.start().await.unwrap();

    let (url, cancel) = serve(registry).await;
    let (mut client, _) = connect_async(url.as_str()).await.unwrap();

    for _ in 0..10 {
        let quote = next_quote(&mut client).await;
        let symbol = quote["symbol"].as_str().unwrap();
        assert!(matches!(symbol, "AAPL" | "MSFT"), "unexpected {symbol}");
        assert!(quote["price"].as_f64().unwrap() >= 0.0);
        assert!((1_000..=5_000).contains(&quote["volume"].as_u64().unwrap()));
        assert!(quote["timestamp"].as_str().unwrap().ends_with('Z'));
    }

    client.close(None).await.unwrap();
    provider.stop().await;
    cancel.cancel();
}

#[tokio::test]
async fn stopping_source_completes_open_sockets() {
    let settings = ProviderSettings {
        symbols: "TSLA".to_string(),
        synthetic_interval: Duration::from_millis(10),
        ..ProviderSettings::default()
    };
    let registry = ProviderRegistry::new(settings);
    let provider = registry.provider().await.unwrap();
    provider.start().await.unwrap();

    let (url, cancel) = serve(registry).await;
    let (mut client, _) = connect_async(url.as_str()).await.unwrap();
    assert_eq!(next_quote(&mut client).await["symbol"], "TSLA");

    provider.stop().await;

    let close = loop {
        let message = timeout(READ_TIMEOUT, client.next())
            .await
            .expect("socket left open after stop")
            .expect("socket ended without close frame")
            .unwrap();
        if let Message::Close(frame) = message {
            break frame;
        }
    };
    let frame = close.expect("close frame without payload");
    assert_eq!(frame.code, CloseCode::Normal);
    assert_eq!(frame.reason.as_str(), "complete");

    cancel.cancel();
}

#[tokio::test]
async fn polled_source_streams_stubbed_trade() {
    let upstream = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v2/last/trade/AAPL"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "results": {"p": 123.45, "s": 42, "t": TRADE_TIME_NS}
            })),
        )
        .mount(&upstream)
        .await;

    let settings = ProviderSettings {
        kind: ProviderKind::Polled,
        credentials: Credentials::new("test-key"),
        symbols: "AAPL".to_string(),
        base_url: upstream.uri(),
        poll_interval: Duration::from_millis(50),
        ..ProviderSettings::default()
    };
    let registry = ProviderRegistry::new(settings);
    let provider = registry.provider().await.unwrap();
    provider.start().await.unwrap();

    let (url, cancel) = serve(registry).await;
    let (mut client, _) = connect_async(url.as_str()).await.unwrap();

    let quote = next_quote(&mut client).await;
    assert_eq!(quote["symbol"], "AAPL");
    assert!((quote["price"].as_f64().unwrap() - 123.45).abs() < 1e-9);
    assert_eq!(quote["volume"], 42);
    assert_eq!(quote["timestamp"], "2023-11-14T22:13:20Z");

    client.close(None).await.unwrap();
    provider.stop().await;
    cancel.cancel();
}

// =============================================================================
// Delivery Loop
// =============================================================================

#[tokio::test]
async fn delivers_in_production_order_then_completes() {
    let scripted = Arc::new(ScriptedProvider::new());
    let provider: SharedProvider = Arc::clone(&scripted) as SharedProvider;
    let registry = ProviderRegistry::with_provider(ProviderSettings::default(), provider);

    let (url, cancel) = serve(registry).await;
    let (mut client, _) = connect_async(url.as_str()).await.unwrap();
    scripted.wait_for_receivers(1).await;

    for volume in 0..20_u64 {
        scripted.publish(Quote::new(Symbol::Tsla, 200.0, volume, Utc::now()).unwrap());
    }
    scripted.finish();

    let mut volumes = Vec::new();
    let close = loop {
        let message = timeout(READ_TIMEOUT, client.next())
            .await
            .unwrap()
            .expect("socket ended without close frame")
            .unwrap();
        match message {
            Message::Text(text) => {
                let quote: Value = serde_json::from_str(text.as_str()).unwrap();
                assert_eq!(quote["symbol"], "TSLA");
                volumes.push(quote["volume"].as_u64().unwrap());
            }
            Message::Close(frame) => break frame,
            _ => {}
        }
    };

    assert_eq!(volumes, (0..20).collect::<Vec<_>>());
    let frame = close.expect("close frame without payload");
    assert_eq!(frame.code, CloseCode::Normal);
    assert_eq!(frame.reason.as_str(), "complete");

    cancel.cancel();
}

#[tokio::test]
async fn every_client_sees_every_quote() {
    let scripted = Arc::new(ScriptedProvider::new());
    let provider: SharedProvider = Arc::clone(&scripted) as SharedProvider;
    let registry = ProviderRegistry::with_provider(ProviderSettings::default(), provider);

    let (url, cancel) = serve(registry).await;
    let (mut first, _) = connect_async(url.as_str()).await.unwrap();
    let (mut second, _) = connect_async(url.as_str()).await.unwrap();
    scripted.wait_for_receivers(2).await;

    for volume in [7, 8, 9] {
        scripted.publish(Quote::new(Symbol::Msft, 300.0, volume, Utc::now()).unwrap());
    }

    for client in [&mut first, &mut second] {
        for expected in [7, 8, 9] {
            assert_eq!(next_quote(client).await["volume"], expected);
        }
    }

    cancel.cancel();
}

#[tokio::test]
async fn client_close_releases_subscriber() {
    let scripted = Arc::new(ScriptedProvider::new());
    let provider: SharedProvider = Arc::clone(&scripted) as SharedProvider;
    let registry = ProviderRegistry::with_provider(ProviderSettings::default(), provider);

    let (url, cancel) = serve(registry).await;
    let (mut client, _) = connect_async(url.as_str()).await.unwrap();
    scripted.wait_for_receivers(1).await;

    client
        .send(Message::Close(Some(CloseFrame {
            code: CloseCode::Away,
            reason: "bye".into(),
        })))
        .await
        .unwrap();

    scripted.wait_for_receivers(0).await;
    cancel.cancel();
}

#[tokio::test]
async fn client_drop_releases_subscriber() {
    let scripted = Arc::new(ScriptedProvider::new());
    let provider: SharedProvider = Arc::clone(&scripted) as SharedProvider;
    let registry = ProviderRegistry::with_provider(ProviderSettings::default(), provider);

    let (url, cancel) = serve(registry).await;
    let (client, _) = connect_async(url.as_str()).await.unwrap();
    scripted.wait_for_receivers(1).await;

    drop(client);

    scripted.wait_for_receivers(0).await;
    cancel.cancel();
}
