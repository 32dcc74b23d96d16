//! Port Interfaces
//!
//! Defines the provider contract following the Hexagonal Architecture
//! pattern. Concrete sources live in the infrastructure layer; the HTTP
//! layer only ever sees `dyn QuoteProvider`.
//!
//! ## Driven Ports (Outbound)
//!
//! - `QuoteProvider`: a source of live quotes (synthetic or polled REST)

use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::domain::quote::{Quote, Symbol};
use crate::domain::subscription::{Channel, SubscribeOutcome};

/// Live, unbounded sequence of quotes from one provider.
pub type QuoteStream = BoxStream<'static, Quote>;

/// Shared provider reference.
pub type SharedProvider = Arc<dyn QuoteProvider>;

/// Lifecycle of a provider's background production.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    /// Constructed, production not started.
    NotStarted,
    /// Production loop is running.
    Running,
    /// Stopped; a fresh instance is needed to produce again.
    Stopped,
}

impl LifecycleState {
    /// Get the state name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::NotStarted => "not_started",
            Self::Running => "running",
            Self::Stopped => "stopped",
        }
    }
}

/// Provider lifecycle errors.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// `start` was called after `stop`.
    #[error("provider {0} was stopped and cannot be restarted")]
    Stopped(&'static str),

    /// The HTTP client could not be built.
    #[error("failed to build HTTP client: {0}")]
    HttpClient(String),
}

/// A source of live quotes.
///
/// Every source runs one background production loop that publishes into
/// an internal broadcast point. Each call to [`QuoteProvider::stream`]
/// opens an independent subscriber on that point, so every open stream
/// observes every quote published after it was opened, in order.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait QuoteProvider: Send + Sync {
    /// Short provider name used in logs, metrics and readiness output.
    fn name(&self) -> &'static str;

    /// Begin background production. A no-op while already running.
    ///
    /// # Errors
    ///
    /// Returns `ProviderError::Stopped` after `stop`, or an error if
    /// network resources cannot be allocated.
    async fn start(&self) -> Result<(), ProviderError>;

    /// Cancel background production and wait for it to finish.
    ///
    /// Every open stream ends once production has stopped. Safe to call
    /// in any state, including concurrently.
    async fn stop(&self);

    /// Track a symbol for subsequent production cycles.
    ///
    /// Unknown symbols are ignored.
    async fn subscribe(&self, symbol: &str, channel: Channel) -> SubscribeOutcome;

    /// Open a new subscriber on the provider's feed.
    fn stream(&self) -> QuoteStream;

    /// Get the currently tracked symbols.
    fn tracked_symbols(&self) -> Vec<Symbol>;

    /// Get the current lifecycle state.
    fn state(&self) -> LifecycleState;
}
