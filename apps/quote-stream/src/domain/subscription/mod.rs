//! Subscription Tracking
//!
//! Domain types for the set of symbols a provider is actively producing.
//!
//! # Design
//!
//! The tracked set only grows: clients add symbols through subscribe
//! requests and nothing removes them for the lifetime of the provider.
//! Input naming an unknown ticker is dropped, never reported as an error,
//! since it comes straight from external clients.

use std::collections::BTreeSet;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::domain::quote::Symbol;

// =============================================================================
// Types
// =============================================================================

/// Market data channel named on a subscribe request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    /// Quote updates.
    #[default]
    Quotes,
    /// Trade prints.
    Trades,
}

impl Channel {
    /// Get the channel name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Quotes => "quotes",
            Self::Trades => "trades",
        }
    }
}

/// Result of a subscribe call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscribeOutcome {
    /// Symbol was added to the tracked set.
    Added(Symbol),
    /// Symbol was already tracked.
    AlreadyTracked(Symbol),
    /// Input did not name a known symbol.
    Ignored,
}

impl SubscribeOutcome {
    /// Check whether the symbol is tracked after the call.
    #[must_use]
    pub const fn is_tracked(&self) -> bool {
        matches!(self, Self::Added(_) | Self::AlreadyTracked(_))
    }
}

// =============================================================================
// Symbol Set
// =============================================================================

/// Thread-safe, grow-only set of tracked symbols.
///
/// Iteration order is the `Symbol` declaration order so that every
/// production sweep visits symbols deterministically.
///
/// # Example
///
/// ```rust
/// use quote_stream::domain::quote::Symbol;
/// use quote_stream::domain::subscription::{SubscribeOutcome, SymbolSet};
///
/// let set = SymbolSet::new([Symbol::Aapl]);
/// assert_eq!(set.subscribe("msft"), SubscribeOutcome::Added(Symbol::Msft));
/// assert_eq!(set.subscribe("AAPL"), SubscribeOutcome::AlreadyTracked(Symbol::Aapl));
/// assert_eq!(set.subscribe("DOGE"), SubscribeOutcome::Ignored);
/// assert_eq!(set.len(), 2);
/// ```
#[derive(Debug, Default)]
pub struct SymbolSet {
    symbols: RwLock<BTreeSet<Symbol>>,
}

impl SymbolSet {
    /// Create a set seeded with the given symbols.
    #[must_use]
    pub fn new(initial: impl IntoIterator<Item = Symbol>) -> Self {
        Self {
            symbols: RwLock::new(initial.into_iter().collect()),
        }
    }

    /// Parse external input and add the symbol if it is known.
    pub fn subscribe(&self, raw: &str) -> SubscribeOutcome {
        raw.parse::<Symbol>()
            .map_or(SubscribeOutcome::Ignored, |symbol| self.insert(symbol))
    }

    /// Add a known symbol.
    pub fn insert(&self, symbol: Symbol) -> SubscribeOutcome {
        if self.symbols.write().insert(symbol) {
            SubscribeOutcome::Added(symbol)
        } else {
            SubscribeOutcome::AlreadyTracked(symbol)
        }
    }

    /// Check whether a symbol is tracked.
    #[must_use]
    pub fn contains(&self, symbol: Symbol) -> bool {
        self.symbols.read().contains(&symbol)
    }

    /// Copy the current symbols out of the lock.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Symbol> {
        self.symbols.read().iter().copied().collect()
    }

    /// Get the number of tracked symbols.
    #[must_use]
    pub fn len(&self) -> usize {
        self.symbols.read().len()
    }

    /// Check if no symbols are tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.symbols.read().is_empty()
    }
}

// =============================================================================
// Configured Symbol Lists
// =============================================================================

/// Resolve a comma-separated ticker list against the known symbols.
///
/// Unknown entries are dropped, duplicates collapse to their first
/// occurrence, and an empty result falls back to `Symbol::DEFAULT`.
#[must_use]
pub fn resolve_symbols(raw: &str) -> Vec<Symbol> {
    let mut resolved = Vec::new();

    for symbol in raw.split(',').filter_map(|entry| entry.parse::<Symbol>().ok()) {
        if !resolved.contains(&symbol) {
            resolved.push(symbol);
        }
    }

    if resolved.is_empty() {
        resolved.push(Symbol::DEFAULT);
    }

    resolved
}

// =============================================================================
// Tests
// =============================================================================
