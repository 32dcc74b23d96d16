//! Subscribe Endpoint

use axum::Json;
use axum::extract::State;
use serde::{Deserialize, Serialize};

use super::{ApiError, AppState};
use crate::domain::subscription::Channel;

/// Body of `POST /stream`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamRequest {
    /// Ticker to track; unknown tickers are ignored.
    pub symbol: String,
    /// Requested channel.
    #[serde(default)]
    pub channel: Channel,
}

/// Outcome reported to the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscribeStatus {
    /// Symbol is tracked.
    Subscribed,
    /// Symbol is not known.
    Ignored,
}

/// Response of `POST /stream`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamResponse {
    /// Subscribe outcome.
    pub status: SubscribeStatus,
}

/// Track a symbol on the active provider.
///
/// # Errors
///
/// Returns 503 if the active provider cannot be constructed.
pub async fn subscribe_handler(
    State(state): State<AppState>,
    Json(request): Json<StreamRequest>,
) -> Result<Json<StreamResponse>, ApiError> {
    let provider = state.registry.provider().await?;
    let outcome = provider.subscribe(&request.symbol, request.channel).await;

    let status = if outcome.is_tracked() {
        SubscribeStatus::Subscribed
    } else {
        SubscribeStatus::Ignored
    };

    Ok(Json(StreamResponse { status }))
}
