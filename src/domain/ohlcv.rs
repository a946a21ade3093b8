//! OHLCV bar representation.

use chrono::{DateTime, Utc};

/// One OHLCV observation for a symbol, keyed by `(symbol, timestamp)`.
///
/// `timestamp` is epoch milliseconds.
#[derive(Debug, Clone, PartialEq)]
pub struct Bar {
    pub symbol: String,
    pub timestamp: i64,
    pub open: f64,
    pub close: f64,
    pub high: f64,
    pub low: f64,
    pub volume: f64,
}

impl Bar {
    /// (high + low + close) / 3
    pub fn typical_price(&self) -> f64 {
        (self.high + self.low + self.close) / 3.0
    }

    /// The timestamp as a UTC datetime, `None` when out of chrono's range.
    pub fn datetime(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.timestamp)
    }

    pub fn key(&self) -> (&str, i64) {
        (&self.symbol, self.timestamp)
    }
}
