//! CSV file bar source: one `<SYMBOL>.csv` per symbol.
//!
//! Expected header: `timestamp,open,high,low,close,volume`. The timestamp may
//! be epoch milliseconds, RFC 3339, or `YYYY-MM-DD` (midnight UTC).

use crate::domain::error::StockframeError;
use crate::domain::ohlcv::Bar;
use crate::ports::data_port::DataPort;
use chrono::{DateTime, NaiveDate};
use csv::StringRecord;
use std::fs;
use std::path::PathBuf;
use tracing::debug;

pub struct CsvAdapter {
    base_path: PathBuf,
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, symbol: &str) -> PathBuf {
        self.base_path.join(format!("{}.csv", symbol))
    }
}

impl DataPort for CsvAdapter {
    fn fetch_bars(&self, symbol: &str) -> Result<Vec<Bar>, StockframeError> {
        let path = self.csv_path(symbol);
        let content = fs::read_to_string(&path).map_err(|e| StockframeError::Data {
            reason: format!("failed to read {}: {}", path.display(), e),
        })?;

        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let mut bars = Vec::new();

        for (line, result) in rdr.records().enumerate() {
            let record = result.map_err(|e| StockframeError::Data {
                reason: format!("CSV parse error in {}: {}", path.display(), e),
            })?;
            let row = line + 2;

            bars.push(Bar {
                symbol: symbol.to_string(),
                timestamp: parse_timestamp(field(&record, 0, "timestamp", row)?, row)?,
                open: parse_price(&record, 1, "open", row)?,
                high: parse_price(&record, 2, "high", row)?,
                low: parse_price(&record, 3, "low", row)?,
                close: parse_price(&record, 4, "close", row)?,
                volume: parse_price(&record, 5, "volume", row)?,
            });
        }

        bars.sort_by_key(|b| b.timestamp);
        debug!(symbol, bars = bars.len(), path = %path.display(), "loaded bars");
        Ok(bars)
    }

    fn list_symbols(&self) -> Result<Vec<String>, StockframeError> {
        let entries = fs::read_dir(&self.base_path).map_err(|e| StockframeError::Data {
            reason: format!(
                "failed to read directory {}: {}",
                self.base_path.display(),
                e
            ),
        })?;

        let mut symbols = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| StockframeError::Data {
                reason: format!("directory entry error: {}", e),
            })?;

            let name = entry.file_name();
            let name_str = name.to_string_lossy();
            if let Some(symbol) = name_str.strip_suffix(".csv") {
                if !symbol.is_empty() {
                    symbols.push(symbol.to_string());
                }
            }
        }

        symbols.sort();
        Ok(symbols)
    }
}

fn field<'r>(
    record: &'r StringRecord,
    index: usize,
    name: &str,
    row: usize,
) -> Result<&'r str, StockframeError> {
    record
        .get(index)
        .map(str::trim)
        .ok_or_else(|| StockframeError::Data {
            reason: format!("row {row}: missing {name} column"),
        })
}

fn parse_price(
    record: &StringRecord,
    index: usize,
    name: &str,
    row: usize,
) -> Result<f64, StockframeError> {
    let value: f64 = field(record, index, name, row)?
        .parse()
        .map_err(|e| StockframeError::Data {
            reason: format!("row {row}: invalid {name} value: {e}"),
        })?;
    if !value.is_finite() {
        return Err(StockframeError::Data {
            reason: format!("row {row}: {name} must be finite, got {value}"),
        });
    }
    Ok(value)
}

/// Epoch milliseconds, RFC 3339, or a bare date at midnight UTC.
pub fn parse_timestamp(raw: &str, row: usize) -> Result<i64, StockframeError> {
    if let Ok(millis) = raw.parse::<i64>() {
        return Ok(millis);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.timestamp_millis());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc().timestamp_millis())
        .ok_or_else(|| StockframeError::Data {
            reason: format!("row {row}: invalid timestamp {raw:?}"),
        })
}
