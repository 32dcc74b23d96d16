//! Health Check and Metrics Handlers
//!
//! Probes for container orchestrators and the Prometheus scrape endpoint.
//! Routed by the HTTP server alongside the quote endpoints.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde::{Deserialize, Serialize};

use crate::domain::quote::Symbol;
use crate::infrastructure::http::{ApiError, AppState};
use crate::infrastructure::metrics::get_metrics_handle;

// =============================================================================
// Response Types
// =============================================================================

/// Liveness response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LiveResponse {
    /// Always "ok".
    pub status: String,
}

/// Readiness response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadyResponse {
    /// Always "ok" when returned with 200.
    pub status: String,
    /// Active provider summary.
    pub summary: ReadySummary,
}

/// Active provider summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadySummary {
    /// Deployment environment.
    pub environment: String,
    /// Provider name.
    pub provider: String,
    /// Lifecycle state of the provider's production loop.
    pub state: String,
    /// Symbols currently produced.
    pub tracked_symbols: Vec<Symbol>,
}

// =============================================================================
// HTTP Handlers
// =============================================================================

/// `GET /health/live`
pub async fn liveness_handler() -> Json<LiveResponse> {
    Json(LiveResponse {
        status: "ok".to_string(),
    })
}

/// `GET /health/ready`
///
/// # Errors
///
/// Returns 503 if the active provider cannot be constructed.
pub async fn readiness_handler(
    State(state): State<AppState>,
) -> Result<Json<ReadyResponse>, ApiError> {
    let provider = state.registry.provider().await?;

    Ok(Json(ReadyResponse {
        status: "ok".to_string(),
        summary: ReadySummary {
            environment: state.environment.to_string(),
            provider: provider.name().to_string(),
            state: provider.state().as_str().to_string(),
            tracked_symbols: provider.tracked_symbols(),
        },
    }))
}

/// `GET /metrics`
pub async fn metrics_handler() -> impl IntoResponse {
    get_metrics_handle().map_or_else(
        || {
            (
                StatusCode::SERVICE_UNAVAILABLE,
                [("content-type", "text/plain")],
                "Metrics not initialized".to_string(),
            )
        },
        |handle| {
            (
                StatusCode::OK,
                [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
                handle.render(),
            )
        },
    )
}

// =============================================================================
// Tests
// =============================================================================
