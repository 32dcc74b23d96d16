//! Quote WebSocket
//!
//! Each connection opens its own subscriber on the active provider and
//! forwards every quote as a JSON text frame until the client leaves, the
//! provider's feed ends or a socket error occurs.

use axum::extract::State;
use axum::extract::ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade, close_code};
use axum::response::Response;
use futures::StreamExt;
use uuid::Uuid;

use super::{ApiError, AppState};
use crate::application::ports::{QuoteStream, SharedProvider};
use crate::infrastructure::metrics;

/// Route of the quote WebSocket.
pub const QUOTES_ENDPOINT: &str = "/ws/quotes";

/// Why a delivery loop ended normally.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    /// Client sent a close frame, with its code if one was given.
    ClientClosed(Option<u16>),
    /// Client went away without a close frame.
    Disconnect,
    /// The provider's feed ended.
    Complete,
}

impl CloseReason {
    /// Get the label recorded in disconnect metrics.
    #[must_use]
    pub fn label(&self) -> String {
        match self {
            Self::ClientClosed(Some(code)) => code.to_string(),
            Self::ClientClosed(None) | Self::Disconnect => "disconnect".to_string(),
            Self::Complete => "complete".to_string(),
        }
    }
}

/// Connection-level failure.
#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    /// Reading a client frame failed.
    #[error("receive failed: {0}")]
    Receive(#[source] axum::Error),

    /// Writing a frame failed.
    #[error("send failed: {0}")]
    Send(#[source] axum::Error),

    /// A quote could not be serialized.
    #[error("encode failed: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Upgrade handler for `GET /ws/quotes`.
///
/// # Errors
///
/// Returns 503 if the active provider cannot be constructed.
pub async fn quotes_ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> Result<Response, ApiError> {
    let provider = state.registry.provider().await?;
    Ok(ws.on_upgrade(move |socket| serve_connection(socket, provider)))
}

async fn serve_connection(mut socket: WebSocket, provider: SharedProvider) {
    let connection_id = Uuid::new_v4();
    metrics::websocket_connected(QUOTES_ENDPOINT);
    tracing::info!(%connection_id, provider = provider.name(), "Quote client connected");

    let quotes = provider.stream();
    match deliver_quotes(&mut socket, quotes).await {
        Ok(reason) => {
            let label = reason.label();
            metrics::websocket_closed(QUOTES_ENDPOINT, &label);
            tracing::info!(%connection_id, reason = %label, "Quote client disconnected");
        }
        Err(e) => {
            metrics::websocket_closed(QUOTES_ENDPOINT, "error");
            tracing::error!(%connection_id, error = %e, "Quote delivery failed");
        }
    }
}

/// Forward quotes to the socket until one side ends.
///
/// Pings are answered by the framework; other client frames are ignored.
///
/// # Errors
///
/// Returns `DeliveryError` if the socket fails or a quote cannot be encoded.
pub async fn deliver_quotes(
    socket: &mut WebSocket,
    mut quotes: QuoteStream,
) -> Result<CloseReason, DeliveryError> {
    loop {
        tokio::select! {
            frame = socket.recv() => match frame {
                Some(Ok(Message::Close(frame))) => {
                    return Ok(CloseReason::ClientClosed(frame.map(|f| f.code)));
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => return Err(DeliveryError::Receive(e)),
                None => return Ok(CloseReason::Disconnect),
            },
            quote = quotes.next() => {
                let Some(quote) = quote else {
                    let close = CloseFrame {
                        code: close_code::NORMAL,
                        reason: "complete".into(),
                    };
                    // Peer may already be gone.
                    let _ = socket.send(Message::Close(Some(close))).await;
                    return Ok(CloseReason::Complete);
                };

                let text = serde_json::to_string(&quote)?;
                socket
                    .send(Message::Text(text.into()))
                    .await
                    .map_err(DeliveryError::Send)?;
                metrics::websocket_message_sent(QUOTES_ENDPOINT);
            }
        }
    }
}
