//! Configuration validation.
//!
//! Typed readers over [`ConfigPort`] that turn absent or malformed values
//! into `ConfigMissing` / `ConfigInvalid` errors naming the offending key.

use crate::domain::error::StockframeError;
use crate::domain::signal::Comparator;
use crate::domain::strategy::Strategy;
use crate::ports::config_port::ConfigPort;
use std::collections::HashSet;
use std::path::PathBuf;

/// The `[data]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct DataConfig {
    pub path: PathBuf,
    /// `None` loads every symbol the data source lists.
    pub symbols: Option<Vec<String>>,
}

pub fn read_data_config(config: &dyn ConfigPort) -> Result<DataConfig, StockframeError> {
    let path = PathBuf::from(require_string(config, "data", "path")?);
    let symbols = config
        .get_string("data", "symbols")
        .map(|s| parse_symbols(&s))
        .transpose()?;
    Ok(DataConfig { path, symbols })
}

/// Check the whole file: data source, indicators, and that every rule only
/// references columns some indicator produces.
pub fn validate_config(config: &dyn ConfigPort) -> Result<Strategy, StockframeError> {
    read_data_config(config)?;
    let strategy = Strategy::from_config(config)?;
    strategy.check_references()?;
    Ok(strategy)
}

/// Comma-separated symbol list, uppercased. Empty tokens and duplicates are
/// rejected.
pub fn parse_symbols(input: &str) -> Result<Vec<String>, StockframeError> {
    let mut symbols = Vec::new();
    let mut seen = HashSet::new();

    for token in input.split(',') {
        let trimmed = token.trim();
        if trimmed.is_empty() {
            return Err(invalid("data", "symbols", "empty symbol in list"));
        }
        let symbol = trimmed.to_uppercase();
        if !seen.insert(symbol.clone()) {
            return Err(invalid(
                "data",
                "symbols",
                &format!("duplicate symbol {symbol}"),
            ));
        }
        symbols.push(symbol);
    }

    Ok(symbols)
}

pub fn require_string(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
) -> Result<String, StockframeError> {
    match config.get_string(section, key) {
        Some(s) if !s.trim().is_empty() => Ok(s.trim().to_string()),
        _ => Err(StockframeError::ConfigMissing {
            section: section.to_string(),
            key: key.to_string(),
        }),
    }
}

pub fn optional_f64(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
) -> Result<Option<f64>, StockframeError> {
    let Some(raw) = config.get_string(section, key) else {
        return Ok(None);
    };
    match raw.trim().parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(Some(value)),
        _ => Err(invalid(section, key, &format!("expected a number, got {raw:?}"))),
    }
}

pub fn require_f64(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
) -> Result<f64, StockframeError> {
    optional_f64(config, section, key)?.ok_or_else(|| StockframeError::ConfigMissing {
        section: section.to_string(),
        key: key.to_string(),
    })
}

/// A positive integer window length.
pub fn optional_period(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
) -> Result<Option<usize>, StockframeError> {
    let Some(raw) = config.get_string(section, key) else {
        return Ok(None);
    };
    match raw.trim().parse::<usize>() {
        Ok(period) if period > 0 => Ok(Some(period)),
        _ => Err(invalid(
            section,
            key,
            &format!("expected a positive integer, got {raw:?}"),
        )),
    }
}

pub fn require_operator(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
) -> Result<Comparator, StockframeError> {
    let raw = require_string(config, section, key)?;
    parse_operator(section, key, &raw)
}

pub fn optional_operator(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: Comparator,
) -> Result<Comparator, StockframeError> {
    match config.get_string(section, key) {
        Some(raw) => parse_operator(section, key, &raw),
        None => Ok(default),
    }
}

fn parse_operator(section: &str, key: &str, raw: &str) -> Result<Comparator, StockframeError> {
    raw.parse::<Comparator>().map_err(|_| {
        invalid(
            section,
            key,
            &format!("unknown operator {raw:?}, expected one of >, >=, <, <=, =="),
        )
    })
}

pub(crate) fn invalid(section: &str, key: &str, reason: &str) -> StockframeError {
    StockframeError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.to_string(),
    }
}
