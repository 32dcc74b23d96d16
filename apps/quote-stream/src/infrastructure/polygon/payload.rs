//! Last-Trade Payload Extraction
//!
//! The upstream has served several response shapes over time. Extraction
//! looks for the trade under `results`, `result` or `last` (falling back
//! to the top level) and accepts both abbreviated and long field names.

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::domain::quote::{Quote, Symbol};

const WRAPPER_KEYS: &[&str] = &["results", "result", "last"];

/// Trade fields pulled out of an upstream response.
#[derive(Debug, Clone, PartialEq)]
pub struct TradeRecord {
    /// Ticker reported by the upstream, if any.
    pub symbol: Option<String>,
    /// Trade price.
    pub price: f64,
    /// Trade size, zero when absent.
    pub size: u64,
    /// Trade time.
    pub timestamp: DateTime<Utc>,
}

impl TradeRecord {
    /// Convert into a quote for `requested`.
    ///
    /// A record naming a different known ticker keeps that ticker. A record
    /// naming an unknown ticker, or carrying an invalid price, yields `None`.
    #[must_use]
    pub fn into_quote(self, requested: Symbol) -> Option<Quote> {
        let symbol = match self.symbol {
            Some(raw) => raw.parse::<Symbol>().ok()?,
            None => requested,
        };
        Quote::new(symbol, self.price, self.size, self.timestamp).ok()
    }
}

/// Extract a trade from a response body.
///
/// Returns `None` when no numeric price or no timestamp can be found.
#[must_use]
pub fn extract_trade(body: &Value) -> Option<TradeRecord> {
    let record = WRAPPER_KEYS
        .iter()
        .find_map(|key| body.get(*key).filter(|v| v.is_object()))
        .unwrap_or(body);

    let price = field(record, &["p", "price"]).and_then(Value::as_f64)?;

    let size = field(record, &["s", "size"])
        .and_then(as_size)
        .unwrap_or(0);

    let timestamp = field(record, &["t", "timestamp"]).map(parse_timestamp)?;

    let symbol = field(record, &["T", "symbol"])
        .and_then(Value::as_str)
        .map(str::to_string);

    Some(TradeRecord {
        symbol,
        price,
        size,
        timestamp,
    })
}

fn field<'a>(record: &'a Value, names: &[&str]) -> Option<&'a Value> {
    names
        .iter()
        .find_map(|name| record.get(*name).filter(|v| !v.is_null()))
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn as_size(value: &Value) -> Option<u64> {
    value.as_u64().or_else(|| {
        value
            .as_f64()
            .filter(|v| v.is_finite() && *v >= 0.0)
            .map(|v| v as u64)
    })
}

/// Numbers are nanoseconds since the epoch; strings are RFC 3339. Anything
/// else resolves to now.
#[allow(clippy::cast_possible_truncation)]
fn parse_timestamp(value: &Value) -> DateTime<Utc> {
    let parsed = match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|v| v.is_finite()).map(|v| v as i64))
            .map(DateTime::from_timestamp_nanos),
        Value::String(s) => DateTime::parse_from_rfc3339(s.trim())
            .ok()
            .map(|dt| dt.with_timezone(&Utc)),
        _ => None,
    };
    parsed.unwrap_or_else(Utc::now)
}

// =============================================================================
// Tests
// =============================================================================
