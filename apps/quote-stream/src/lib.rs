#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::float_cmp,
        clippy::significant_drop_tightening,
        clippy::too_many_lines,
        clippy::needless_pass_by_value,
        clippy::default_trait_access,
        clippy::items_after_statements
    )
)]

//! Quote Stream - Live Market Quote Service
//!
//! Produces live quotes for a small, fixed set of tickers from one of two
//! interchangeable sources and pushes them to WebSocket clients.
//!
//! # Layers (inside → outside)
//!
//! - **Domain**: Quote values, symbols and the tracked symbol set
//!   - `quote`: `Quote` and the closed `Symbol` enumeration
//!   - `subscription`: Tracked symbols and subscribe outcomes
//!
//! - **Application**: Port definitions
//!   - `ports`: The `QuoteProvider` contract
//!
//! - **Infrastructure**: Adapters and external integrations
//!   - `synthetic`: Generated quotes with no external dependency
//!   - `polygon`: Polled REST source with rate-limit cooldown
//!   - `registry`: Selects and owns the active source
//!   - `broadcast`: Per-provider fan-out channel
//!   - `http`: Subscribe endpoint and quote WebSocket
//!   - `health`, `metrics`, `telemetry`, `config`
//!
//! # Data Flow
//!
//! ```text
//! Synthetic generator ─┐                              ┌──► WS client 1
//!                      ├──► Broadcast ──► /ws/quotes ─┼──► WS client 2
//! Polled REST source ──┘  (one active)                └──► WS client N
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

// =============================================================================
// Module Declarations
// =============================================================================

/// Domain layer - Quote types with no I/O.
pub mod domain;

/// Application layer - Port definitions.
pub mod application;

/// Infrastructure layer - Adapters and external integrations.
pub mod infrastructure;

// =============================================================================
// Re-exports
// =============================================================================

// Domain types
pub use domain::quote::{Quote, QuoteError, Symbol, UnknownSymbol};
pub use domain::subscription::{Channel, SubscribeOutcome, SymbolSet, resolve_symbols};

// Ports
pub use application::ports::{
    LifecycleState, ProviderError, QuoteProvider, QuoteStream, SharedProvider,
};

// Infrastructure config
pub use infrastructure::config::{
    AppConfig, ConfigError, Credentials, ProviderKind, ProviderSettings, ServerSettings,
};

// Providers
pub use infrastructure::broadcast::{FeedSlot, QuoteBroadcast};
pub use infrastructure::polygon::PolledProvider;
pub use infrastructure::registry::{ProviderRegistry, build_provider};
pub use infrastructure::synthetic::SyntheticProvider;

// HTTP server
pub use infrastructure::http::{AppState, HttpServer, HttpServerError, create_router};

// Metrics
pub use infrastructure::metrics::init_metrics;

// Telemetry
pub use infrastructure::telemetry::{TelemetryConfig, TelemetryGuard, init as init_telemetry};
