//! Polled REST Provider
//!
//! Polls a "last trade" endpoint per tracked symbol and republishes the
//! parsed trades as quotes.
//!
//! - `client`: REST client for the last-trade endpoint
//! - `payload`: tolerant extraction of trades from varying response shapes
//! - `cooldown`: rate-limit cooldown tracking
//! - `provider`: the polling loop behind `QuoteProvider`

pub mod client;
pub mod cooldown;
pub mod payload;
pub mod provider;

pub use client::{FetchError, PolygonClient, PolygonClientConfig};
pub use cooldown::{Cooldown, DEFAULT_RETRY_AFTER, parse_retry_after};
pub use payload::{TradeRecord, extract_trade};
pub use provider::PolledProvider;
