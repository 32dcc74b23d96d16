//! Quote Types
//!
//! The immutable `Quote` value object that flows from a provider's
//! production loop to every connected client, and the closed `Symbol`
//! enumeration of tradable tickers.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// Symbol
// =============================================================================

/// Tradable ticker known at compile time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Symbol {
    /// Apple Inc.
    Aapl,
    /// Microsoft Corp.
    Msft,
    /// Tesla Inc.
    Tsla,
}

impl Symbol {
    /// Symbol used when a configured list reduces to nothing.
    pub const DEFAULT: Self = Self::Aapl;

    /// Get all known symbols.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::Aapl, Self::Msft, Self::Tsla]
    }

    /// Get the ticker string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Aapl => "AAPL",
            Self::Msft => "MSFT",
            Self::Tsla => "TSLA",
        }
    }
}

impl Default for Symbol {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Symbol {
    type Err = UnknownSymbol;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Self::all()
            .iter()
            .find(|symbol| symbol.as_str().eq_ignore_ascii_case(trimmed))
            .copied()
            .ok_or_else(|| UnknownSymbol(trimmed.to_string()))
    }
}

/// Input named a ticker outside the known set.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown symbol: {0:?}")]
pub struct UnknownSymbol(pub String);

// =============================================================================
// Quote
// =============================================================================

/// A single price update.
///
/// Deserialization goes through [`Quote::new`], so a decoded quote has
/// passed the same price check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "QuoteFields")]
pub struct Quote {
    symbol: Symbol,
    price: f64,
    volume: u64,
    timestamp: DateTime<Utc>,
}

impl Quote {
    /// Create a new quote.
    ///
    /// # Errors
    ///
    /// Returns `QuoteError::InvalidPrice` if `price` is negative or not finite.
    pub fn new(
        symbol: Symbol,
        price: f64,
        volume: u64,
        timestamp: DateTime<Utc>,
    ) -> Result<Self, QuoteError> {
        if !price.is_finite() || price < 0.0 {
            return Err(QuoteError::InvalidPrice(price));
        }

        Ok(Self {
            symbol,
            price,
            volume,
            timestamp,
        })
    }

    /// Get the symbol.
    #[must_use]
    pub const fn symbol(&self) -> Symbol {
        self.symbol
    }

    /// Get the price.
    #[must_use]
    pub const fn price(&self) -> f64 {
        self.price
    }

    /// Get the traded volume.
    #[must_use]
    pub const fn volume(&self) -> u64 {
        self.volume
    }

    /// Get the UTC timestamp.
    #[must_use]
    pub const fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

#[derive(Deserialize)]
struct QuoteFields {
    symbol: Symbol,
    price: f64,
    volume: u64,
    timestamp: DateTime<Utc>,
}

impl TryFrom<QuoteFields> for Quote {
    type Error = QuoteError;

    fn try_from(fields: QuoteFields) -> Result<Self, Self::Error> {
        Self::new(fields.symbol, fields.price, fields.volume, fields.timestamp)
    }
}

/// Quote construction error.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum QuoteError {
    /// Price was negative, NaN or infinite.
    #[error("invalid price: {0}")]
    InvalidPrice(f64),
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;

    #[test_case("AAPL", Symbol::Aapl ; "upper")]
    #[test_case("msft", Symbol::Msft ; "lower")]
    #[test_case("  Tsla ", Symbol::Tsla ; "padded mixed case")]
    fn symbol_parsing(input: &str, expected: Symbol) {
        assert_eq!(input.parse::<Symbol>().unwrap(), expected);
    }

    #[test_case("GOOG" ; "unlisted")]
    #[test_case("" ; "empty")]
    #[test_case("AAPL;" ; "malformed")]
    fn symbol_parsing_rejects_unknown(input: &str) {
        assert!(input.parse::<Symbol>().is_err());
    }

    #[test]
    fn quote_rejects_negative_price() {
        let result = Quote::new(Symbol::Aapl, -0.01, 10, Utc::now());
        assert_eq!(result, Err(QuoteError::InvalidPrice(-0.01)));
    }

    #[test]
    fn quote_rejects_non_finite_price() {
        assert!(Quote::new(Symbol::Aapl, f64::NAN, 10, Utc::now()).is_err());
        assert!(Quote::new(Symbol::Aapl, f64::INFINITY, 10, Utc::now()).is_err());
    }

    #[test]
    fn quote_serializes_flat() {
        let timestamp = DateTime::parse_from_rfc3339("2024-05-01T14:30:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let quote = Quote::new(Symbol::Msft, 412.5, 300, timestamp).unwrap();

        let json = serde_json::to_value(&quote).unwrap();
        assert_eq!(json["symbol"], "MSFT");
        assert_eq!(json["price"], 412.5);
        assert_eq!(json["volume"], 300);
        assert_eq!(json["timestamp"], "2024-05-01T14:30:00Z");
        assert_eq!(json.as_object().unwrap().len(), 4);

        let decoded: Quote = serde_json::from_value(json).unwrap();
        assert_eq!(decoded, quote);
    }

    #[test]
    fn deserialization_rejects_negative_price() {
        let json = serde_json::json!({
            "symbol": "AAPL",
            "price": -5.0,
            "volume": 1,
            "timestamp": "2024-05-01T14:30:00Z",
        });
        let err = serde_json::from_value::<Quote>(json).unwrap_err();
        assert!(err.to_string().contains("invalid price"), "{err}");
    }
}
