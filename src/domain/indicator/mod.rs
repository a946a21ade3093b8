//! Technical indicator formulas.
//!
//! Every formula runs over a single [`SymbolGroup`], so values derived for
//! one symbol never depend on the bars of another. A formula produces one or
//! more named columns (`IndicatorSeries`), each aligned with the group's
//! bars; warmup and zero-denominator cells are `None`.
//!
//! - `Formula`: identity + parameters of a computation
//! - `IndicatorDefinition`: a formula registered under a column name
//! - `IndicatorSeries`: one output column for one symbol

pub mod change;
pub mod ema;
pub mod macd;
pub mod rsi;
pub mod sma;
pub mod vwap;

pub use change::calculate_change_in_price;
pub use ema::{calculate_ema, ewm_mean};
pub use macd::calculate_macd;
pub use rsi::calculate_rsi;
pub use sma::calculate_sma;
pub use vwap::calculate_vwap;

use crate::domain::error::StockframeError;
use crate::domain::store::{Column, SymbolGroup};
use std::collections::BTreeMap;
use std::fmt;

/// Named integer parameters of a formula, e.g. `period = 14`.
pub type Parameters = BTreeMap<String, usize>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Formula {
    ChangeInPrice,
    Sma(usize),
    Ema(usize),
    Rsi(usize),
    Macd { fast: usize, slow: usize },
    Vwap,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorSeries {
    pub column: String,
    pub values: Column,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndicatorDefinition {
    pub name: String,
    pub formula: Formula,
}

impl IndicatorDefinition {
    pub fn parameters(&self) -> Parameters {
        self.formula.parameters()
    }

    /// Every column this definition writes.
    pub fn columns(&self) -> Vec<String> {
        self.formula.output_columns(&self.name)
    }
}

impl Formula {
    pub fn name(&self) -> &'static str {
        match self {
            Formula::ChangeInPrice => "change_in_price",
            Formula::Sma(_) => "sma",
            Formula::Ema(_) => "ema",
            Formula::Rsi(_) => "rsi",
            Formula::Macd { .. } => "macd",
            Formula::Vwap => "vwap",
        }
    }

    /// Resolve a formula by name from its parameter map.
    ///
    /// `sma`, `ema` and `rsi` require `period`; `macd` reads `fast_period`
    /// and `slow_period`, defaulting to 12 and 26.
    pub fn from_parameters(name: &str, params: &Parameters) -> Result<Self, StockframeError> {
        let formula = match name.trim().to_lowercase().as_str() {
            "change_in_price" => Formula::ChangeInPrice,
            "sma" => Formula::Sma(require(name, params, "period")?),
            "ema" => Formula::Ema(require(name, params, "period")?),
            "rsi" => Formula::Rsi(require(name, params, "period")?),
            "macd" => Formula::Macd {
                fast: params
                    .get("fast_period")
                    .copied()
                    .unwrap_or(macd::DEFAULT_FAST),
                slow: params
                    .get("slow_period")
                    .copied()
                    .unwrap_or(macd::DEFAULT_SLOW),
            },
            "vwap" => Formula::Vwap,
            _ => {
                return Err(StockframeError::UnknownFormula {
                    name: name.to_string(),
                });
            }
        };
        formula.validate()?;
        Ok(formula)
    }

    /// Reject zero-length windows.
    pub fn validate(&self) -> Result<(), StockframeError> {
        let zero = |parameter: &str| StockframeError::InvalidParameter {
            formula: self.name().to_string(),
            parameter: parameter.to_string(),
            reason: "must be at least 1".to_string(),
        };
        match *self {
            Formula::Sma(0) | Formula::Ema(0) | Formula::Rsi(0) => Err(zero("period")),
            Formula::Macd { fast: 0, .. } => Err(zero("fast_period")),
            Formula::Macd { slow: 0, .. } => Err(zero("slow_period")),
            _ => Ok(()),
        }
    }

    pub fn parameters(&self) -> Parameters {
        let mut params = Parameters::new();
        match *self {
            Formula::Sma(period) | Formula::Ema(period) | Formula::Rsi(period) => {
                params.insert("period".into(), period);
            }
            Formula::Macd { fast, slow } => {
                params.insert("fast_period".into(), fast);
                params.insert("slow_period".into(), slow);
            }
            Formula::ChangeInPrice | Formula::Vwap => {}
        }
        params
    }

    pub fn output_columns(&self, name: &str) -> Vec<String> {
        match self {
            Formula::Macd { .. } => vec![
                name.to_string(),
                format!("{name}_signal"),
                format!("{name}_histogram"),
                format!("{name}_fast"),
                format!("{name}_slow"),
            ],
            _ => vec![name.to_string()],
        }
    }

    /// Run the formula over one symbol's bars.
    pub fn compute(&self, name: &str, group: &SymbolGroup<'_>) -> Vec<IndicatorSeries> {
        let single = |values: Column| {
            vec![IndicatorSeries {
                column: name.to_string(),
                values,
            }]
        };
        match *self {
            Formula::ChangeInPrice => single(calculate_change_in_price(group.bars)),
            Formula::Sma(period) => single(calculate_sma(group.bars, period)),
            Formula::Ema(period) => single(calculate_ema(group.bars, period)),
            Formula::Rsi(period) => single(calculate_rsi(group.bars, period)),
            Formula::Vwap => single(calculate_vwap(group.bars)),
            Formula::Macd { fast, slow } => {
                let out = calculate_macd(group.bars, fast, slow);
                let columns = self.output_columns(name);
                columns
                    .into_iter()
                    .zip([out.line, out.signal, out.histogram, out.fast, out.slow])
                    .map(|(column, values)| IndicatorSeries { column, values })
                    .collect()
            }
        }
    }
}

fn require(formula: &str, params: &Parameters, key: &str) -> Result<usize, StockframeError> {
    params
        .get(key)
        .copied()
        .ok_or_else(|| StockframeError::InvalidParameter {
            formula: formula.to_string(),
            parameter: key.to_string(),
            reason: "required".to_string(),
        })
}

impl fmt::Display for Formula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Formula::ChangeInPrice => write!(f, "CHANGE_IN_PRICE"),
            Formula::Sma(period) => write!(f, "SMA({})", period),
            Formula::Ema(period) => write!(f, "EMA({})", period),
            Formula::Rsi(period) => write!(f, "RSI({})", period),
            Formula::Macd { fast, slow } => write!(f, "MACD({},{})", fast, slow),
            Formula::Vwap => write!(f, "VWAP"),
        }
    }
}
