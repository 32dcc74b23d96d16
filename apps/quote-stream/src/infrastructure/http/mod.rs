//! HTTP and WebSocket Server
//!
//! Serves the subscribe endpoint, the quote WebSocket, health probes and
//! Prometheus metrics from a single axum router.
//!
//! # Endpoints
//!
//! - `POST /stream` - Track a symbol on the active provider
//! - `GET /ws/quotes` - WebSocket pushing one JSON text frame per quote
//! - `GET /health/live` - Liveness probe
//! - `GET /health/ready` - Readiness probe with provider summary
//! - `GET /metrics` - Prometheus metrics in text format

mod error;
pub mod stream;
pub mod subscribe;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

pub use error::ApiError;

use crate::infrastructure::health;
use crate::infrastructure::registry::ProviderRegistry;

/// Shared state for every handler.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Active provider registry.
    pub registry: Arc<ProviderRegistry>,
    /// Deployment environment name.
    pub environment: Arc<str>,
}

impl AppState {
    /// Create handler state.
    #[must_use]
    pub fn new(registry: Arc<ProviderRegistry>, environment: impl Into<Arc<str>>) -> Self {
        Self {
            registry,
            environment: environment.into(),
        }
    }
}

/// Create the router with all endpoints.
#[must_use]
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/stream", post(subscribe::subscribe_handler))
        .route(stream::QUOTES_ENDPOINT, get(stream::quotes_ws_handler))
        .route("/health/live", get(health::liveness_handler))
        .route("/health/ready", get(health::readiness_handler))
        .route("/metrics", get(health::metrics_handler))
        .with_state(state)
}

/// HTTP server bound to a port.
pub struct HttpServer {
    port: u16,
    state: AppState,
    cancel: CancellationToken,
}

impl HttpServer {
    /// Create a new server.
    #[must_use]
    pub const fn new(port: u16, state: AppState, cancel: CancellationToken) -> Self {
        Self {
            port,
            state,
            cancel,
        }
    }

    /// Bind the configured port and serve until cancelled.
    ///
    /// # Errors
    ///
    /// Returns `HttpServerError` if binding fails or the server encounters
    /// a fatal error while running.
    pub async fn run(self) -> Result<(), HttpServerError> {
        let addr = SocketAddr::from(([0, 0, 0, 0], self.port));
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| HttpServerError::BindFailed(self.port, e.to_string()))?;

        self.serve(listener).await
    }

    /// Serve on an already bound listener until cancelled.
    ///
    /// # Errors
    ///
    /// Returns `HttpServerError::ServerFailed` on a fatal server error.
    pub async fn serve(self, listener: TcpListener) -> Result<(), HttpServerError> {
        let local_addr = listener.local_addr().ok();
        tracing::info!(addr = ?local_addr, "HTTP server listening");

        axum::serve(listener, create_router(self.state))
            .with_graceful_shutdown(self.cancel.cancelled_owned())
            .await
            .map_err(|e| HttpServerError::ServerFailed(e.to_string()))?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// HTTP server errors.
#[derive(Debug, thiserror::Error)]
pub enum HttpServerError {
    /// Failed to bind to port.
    #[error("failed to bind to port {0}: {1}")]
    BindFailed(u16, String),

    /// Server failed while running.
    #[error("server failed: {0}")]
    ServerFailed(String),
}
