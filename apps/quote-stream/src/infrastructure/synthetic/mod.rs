//! Synthetic Quote Provider
//!
//! Generates believable price motion with no external dependency, for
//! local development and tests.
//!
//! # Price Model
//!
//! Each tracked symbol carries a phase angle. Every tick the phase
//! advances by a small random step and the price is
//! `BASE_PRICE + AMPLITUDE * sin(phase)` plus uniform jitter, rounded to
//! cents. Volume is drawn uniformly from `VOLUME_RANGE`.

use std::collections::HashMap;
use std::f64::consts::TAU;
use std::ops::RangeInclusive;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use rand::Rng;
use rust_decimal::Decimal;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use tokio_util::sync::CancellationToken;

use crate::application::ports::{LifecycleState, ProviderError, QuoteProvider, QuoteStream};
use crate::domain::quote::{Quote, Symbol};
use crate::domain::subscription::{Channel, SubscribeOutcome, SymbolSet};
use crate::infrastructure::broadcast::{FeedSlot, QuoteBroadcast};
use crate::infrastructure::metrics;
use crate::infrastructure::producer::{ProductionTask, sleep_or_cancel};

const PROVIDER_NAME: &str = "mock";

const BASE_PRICE: f64 = 150.0;

const AMPLITUDE: f64 = 10.0;

const JITTER: f64 = 1.0;

/// Per-tick phase advance bounds (radians).
const PHASE_STEP: std::ops::Range<f64> = 0.05..0.15;

/// Range of generated trade volumes.
pub const VOLUME_RANGE: RangeInclusive<u64> = 1_000..=5_000;

/// Synthetic provider.
#[derive(Debug)]
pub struct SyntheticProvider {
    interval: Duration,
    symbols: Arc<SymbolSet>,
    feed: FeedSlot,
    task: ProductionTask,
}

impl SyntheticProvider {
    /// Create a provider generating quotes for `symbols` every `interval`.
    ///
    /// An empty symbol list is seeded with `Symbol::DEFAULT`.
    #[must_use]
    pub fn new(
        symbols: impl IntoIterator<Item = Symbol>,
        interval: Duration,
        feed: QuoteBroadcast,
    ) -> Self {
        let symbols = SymbolSet::new(symbols);
        if symbols.is_empty() {
            symbols.insert(Symbol::DEFAULT);
        }

        Self {
            interval,
            symbols: Arc::new(symbols),
            feed: FeedSlot::new(feed),
            task: ProductionTask::new(PROVIDER_NAME),
        }
    }

    /// Get the generation interval.
    #[must_use]
    pub const fn interval(&self) -> Duration {
        self.interval
    }
}

#[async_trait]
impl QuoteProvider for SyntheticProvider {
    fn name(&self) -> &'static str {
        PROVIDER_NAME
    }

    async fn start(&self) -> Result<(), ProviderError> {
        let feed = self
            .feed
            .sender()
            .ok_or(ProviderError::Stopped(PROVIDER_NAME))?;
        let generator = Generator {
            interval: self.interval,
            symbols: Arc::clone(&self.symbols),
            feed,
        };
        self.task.start(|cancel| generator.run(cancel))?;
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
// Production Loop
// =============================================================================

struct Generator {
    interval: Duration,
    symbols: Arc<SymbolSet>,
    feed: QuoteBroadcast,
}

impl Generator {
    async fn run(self, cancel: CancellationToken) {
        let mut phases: HashMap<Symbol, f64> = HashMap::new();

        while sleep_or_cancel(&cancel, self.interval).await {
            for quote in generate_sweep(&mut phases, &self.symbols.snapshot()) {
                metrics::record_quote_published(PROVIDER_NAME);
                let _ = self.feed.publish(quote);
            }
        }
    }
}

/// Produce one quote per symbol, seeding a random phase for symbols seen
/// for the first time.
fn generate_sweep(phases: &mut HashMap<Symbol, f64>, symbols: &[Symbol]) -> Vec<Quote> {
    let mut rng = rand::rng();
    let now = Utc::now();

    symbols
        .iter()
        .filter_map(|&symbol| {
            let phase = phases
                .entry(symbol)
                .or_insert_with(|| rng.random_range(0.0..TAU));
            *phase += rng.random_range(PHASE_STEP);

            let raw = BASE_PRICE + AMPLITUDE * phase.sin() + rng.random_range(-JITTER..=JITTER);
            let volume = rng.random_range(VOLUME_RANGE);

            Quote::new(symbol, round_to_cents(raw), volume, now).ok()
        })
        .collect()
}

fn round_to_cents(price: f64) -> f64 {
    Decimal::from_f64(price)
        .map(|d| d.round_dp(2))
        .and_then(|d| d.to_f64())
        .unwrap_or(price)
}

// =============================================================================
// Tests
// =============================================================================
