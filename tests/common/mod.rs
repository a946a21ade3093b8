#![allow(dead_code)]

use std::collections::BTreeMap;
use stockframe::domain::error::StockframeError;
pub use stockframe::domain::ohlcv::Bar;
use stockframe::ports::data_port::DataPort;

pub const DAY_MS: i64 = 86_400_000;

pub struct MockDataPort {
    pub data: BTreeMap<String, Vec<Bar>>,
    pub errors: BTreeMap<String, String>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            data: BTreeMap::new(),
            errors: BTreeMap::new(),
        }
    }

    pub fn with_bars(mut self, symbol: &str, bars: Vec<Bar>) -> Self {
        self.data.insert(symbol.to_string(), bars);
        self
    }

    pub fn with_error(mut self, symbol: &str, reason: &str) -> Self {
        self.errors.insert(symbol.to_string(), reason.to_string());
        self
    }
}

impl DataPort for MockDataPort {
    fn fetch_bars(&self, symbol: &str) -> Result<Vec<Bar>, StockframeError> {
        if let Some(reason) = self.errors.get(symbol) {
            return Err(StockframeError::Data {
                reason: reason.clone(),
            });
        }
        Ok(self.data.get(symbol).cloned().unwrap_or_default())
    }

    fn list_symbols(&self) -> Result<Vec<String>, StockframeError> {
        Ok(self.data.keys().cloned().collect())
    }
}

pub fn make_bar(symbol: &str, day: i64, close: f64) -> Bar {
    Bar {
        symbol: symbol.to_string(),
        timestamp: day * DAY_MS,
        open: close - 1.0,
        high: close + 1.0,
        low: close - 2.0,
        close,
        volume: 1000.0,
    }
}

/// Daily bars starting at day 0 with the given closes.
pub fn bars_from_closes(symbol: &str, closes: &[f64]) -> Vec<Bar> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| make_bar(symbol, i as i64, close))
        .collect()
}

/// `count` daily bars moving by `step` per day from `start_price`.
pub fn generate_bars(symbol: &str, count: usize, start_price: f64, step: f64) -> Vec<Bar> {
    (0..count)
        .map(|i| make_bar(symbol, i as i64, start_price + step * i as f64))
        .collect()
}
