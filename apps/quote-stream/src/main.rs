//! Quote Stream Binary
//!
//! Starts the live quote service.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin quote-stream
//! ```
//!
//! # Environment Variables
//!
//! ## Required (polygon provider only)
//! - `POLYGON_API_KEY`: Upstream REST API key
//!
//! ## Optional
//! - `APP_ENV`: Environment name reported by readiness (default: development)
//! - `DATA_PROVIDER`: "mock" | "polygon" (default: mock)
//! - `SYMBOLS`: Comma-separated tracked tickers (default: AAPL,MSFT,TSLA)
//! - `MOCK_STREAM_INTERVAL`: Synthetic interval in seconds (default: 1.0)
//! - `POLYGON_POLL_INTERVAL`: Poll interval in seconds (default: 1.0)
//! - `POLYGON_BASE_URL`: REST base URL (default: <https://api.polygon.io>)
//! - `POLYGON_REQUEST_TIMEOUT_SECS`: Upstream request timeout (default: 5)
//! - `QUOTE_BROADCAST_CAPACITY`: Per-subscriber buffer (default: 10000)
//! - `HTTP_PORT`: HTTP/WebSocket port (default: 8080)
//! - `OTEL_ENABLED`: Enable OpenTelemetry (default: false)
//! - `RUST_LOG`: Log filter (default adds quote_stream=info)

use std::sync::Arc;

use anyhow::Context;
use quote_stream::infrastructure::telemetry;
use quote_stream::{AppConfig, AppState, HttpServer, ProviderRegistry, init_metrics};
use tokio::signal;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Already installed is fine.
    let _ = rustls::crypto::ring::default_provider().install_default();

    load_dotenv();

    let _telemetry_guard = telemetry::init();

    tracing::info!("Starting quote stream");

    let _metrics_handle = init_metrics();

    let config = AppConfig::from_env();
    log_config(&config);

    let registry = Arc::new(ProviderRegistry::new(config.provider.clone()));
    let provider = registry
        .provider()
        .await
        .context("failed to construct quote provider")?;
    provider
        .start()
        .await
        .context("failed to start quote provider")?;

    let shutdown_token = CancellationToken::new();
    let state = AppState::new(Arc::clone(&registry), config.environment.as_str());
    let server = HttpServer::new(config.server.http_port, state, shutdown_token.clone());

    let signal_token = shutdown_token.clone();
    let signal_provider = Arc::clone(&provider);
    tokio::spawn(async move {
        await_shutdown().await;
        // Open quote sockets get their `complete` close before the listener drains.
        signal_provider.stop().await;
        signal_token.cancel();
    });

    tracing::info!("Quote stream ready");

    let served = server.run().await;

    shutdown_token.cancel();
    provider.stop().await;

    served.context("HTTP server failed")?;

    tracing::info!("Quote stream stopped");
    Ok(())
}

/// Log the parsed configuration.
fn log_config(config: &AppConfig) {
    tracing::info!(
        environment = %config.environment,
        provider = config.provider.kind.as_str(),
        symbols = ?config.provider.tracked_symbols(),
        http_port = config.server.http_port,
        "Configuration loaded"
    );
    tracing::debug!(
        base_url = %config.provider.base_url,
        poll_interval_secs = config.provider.poll_interval.as_secs_f64(),
        synthetic_interval_secs = config.provider.synthetic_interval.as_secs_f64(),
        broadcast_capacity = config.provider.broadcast_capacity,
        "Provider tuning"
    );
}

/// Load .env file from current directory or any ancestor directory.
fn load_dotenv() {
    if dotenvy::dotenv().is_ok() {
        return;
    }

    if let Ok(cwd) = std::env::current_dir() {
        let mut dir = cwd.as_path();
        while let Some(parent) = dir.parent() {
            let env_path = parent.join(".env");
            if env_path.exists() {
                let _ = dotenvy::from_path(&env_path);
                return;
            }
            dir = parent;
        }
    }
}

/// Wait for shutdown signal (SIGTERM or SIGINT).
#[allow(clippy::expect_used)]
async fn await_shutdown() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("signal handler installation is critical for graceful shutdown");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("SIGTERM handler installation is critical for graceful shutdown")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, initiating shutdown");
        }
    }
}
