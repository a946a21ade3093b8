//! Strategy: a declarative bundle of indicators and signal rules.
//!
//! Built from configuration sections:
//!
//! - `[indicator.<name>]`: `formula`, `period`, `fast_period`, `slow_period`
//! - `[threshold.<indicator>]`: `buy`, `buy_operator`, `sell`, `sell_operator`,
//!   optional `buy_max`/`sell_max` with `*_max_operator` (default `>`)
//! - `[comparison.<label>]`: `left`, `right`, `buy_operator`, `sell_operator`
//! - `[ticker.<TICKER>.<indicator>]`: threshold or comparison keys plus
//!   `buy_cash_quantity` and `close_position_when_sell`
//!
//! Sections are read in sorted order, so indicators register in name order.

use crate::domain::config_validation::{
    invalid, optional_f64, optional_operator, optional_period, require_f64, require_operator,
    require_string,
};
use crate::domain::engine::IndicatorEngine;
use crate::domain::error::StockframeError;
use crate::domain::evaluator::SignalEvaluator;
use crate::domain::indicator::{Formula, IndicatorDefinition, Parameters};
use crate::domain::signal::{Comparator, Condition, TickerRule, Trigger};
use crate::ports::config_port::ConfigPort;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, warn};

const DEFAULT_NAME: &str = "unnamed";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Strategy {
    pub name: String,
    pub indicators: Vec<IndicatorDefinition>,
    pub rules: Vec<Condition>,
    pub ticker_rules: Vec<TickerRule>,
}

impl Strategy {
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, StockframeError> {
        let mut strategy = Strategy {
            name: config
                .get_string("strategy", "name")
                .unwrap_or_else(|| DEFAULT_NAME.to_string()),
            ..Strategy::default()
        };

        for section in config.sections() {
            if let Some(name) = section.strip_prefix("indicator.") {
                strategy.indicators.push(read_indicator(config, &section, name)?);
            } else if let Some(indicator) = section.strip_prefix("threshold.") {
                strategy.rules.push(read_threshold(config, &section, indicator)?);
            } else if section.starts_with("comparison.") {
                strategy.rules.push(read_comparison(config, &section, None)?);
            } else if let Some(rest) = section.strip_prefix("ticker.") {
                strategy.ticker_rules.push(read_ticker_rule(config, &section, rest)?);
            } else if section != "data" && section != "strategy" {
                warn!(section = %section, "ignoring unknown configuration section");
            }
        }

        debug!(
            strategy = %strategy.name,
            indicators = strategy.indicators.len(),
            rules = strategy.rules.len(),
            ticker_rules = strategy.ticker_rules.len(),
            "loaded strategy"
        );
        Ok(strategy)
    }

    /// Every column the indicators will produce.
    pub fn produced_columns(&self) -> BTreeSet<String> {
        self.indicators.iter().flat_map(|d| d.columns()).collect()
    }

    /// Fail if two indicators write the same column, or a rule reads a
    /// column no indicator produces.
    pub fn check_references(&self) -> Result<(), StockframeError> {
        let mut owners: BTreeMap<String, &str> = BTreeMap::new();
        for definition in &self.indicators {
            for column in definition.columns() {
                if let Some(owner) = owners.insert(column.clone(), &definition.name) {
                    return Err(invalid(
                        &format!("indicator.{}", definition.name),
                        "section",
                        &format!("column {column} is already produced by indicator {owner}"),
                    ));
                }
            }
        }

        let produced = self.produced_columns();
        let conditions = self
            .rules
            .iter()
            .chain(self.ticker_rules.iter().map(|r| &r.condition));
        for condition in conditions {
            let missing: Vec<String> = condition
                .columns()
                .into_iter()
                .filter(|c| !produced.contains(*c))
                .map(str::to_string)
                .collect();
            if !missing.is_empty() {
                return Err(StockframeError::UnknownIndicator {
                    context: format!("referenced by rule {}", condition.key()),
                    missing,
                });
            }
        }
        Ok(())
    }

    pub fn install(
        &self,
        engine: &mut IndicatorEngine,
        evaluator: &mut SignalEvaluator,
    ) -> Result<(), StockframeError> {
        for definition in &self.indicators {
            engine.register(&definition.name, definition.formula)?;
        }
        for rule in &self.rules {
            evaluator.add_rule(rule.clone());
        }
        for rule in &self.ticker_rules {
            evaluator.add_ticker_rule(rule.clone());
        }
        Ok(())
    }
}

fn read_indicator(
    config: &dyn ConfigPort,
    section: &str,
    name: &str,
) -> Result<IndicatorDefinition, StockframeError> {
    let formula = require_string(config, section, "formula")?;
    let mut params = Parameters::new();
    for key in ["period", "fast_period", "slow_period"] {
        if let Some(value) = optional_period(config, section, key)? {
            params.insert(key.to_string(), value);
        }
    }
    let formula = Formula::from_parameters(&formula, &params)?;
    Ok(IndicatorDefinition {
        name: name.to_string(),
        formula,
    })
}

fn read_trigger(
    config: &dyn ConfigPort,
    section: &str,
    side: &str,
) -> Result<Trigger, StockframeError> {
    let threshold = require_f64(config, section, side)?;
    let op = require_operator(config, section, &format!("{side}_operator"))?;
    let mut trigger = Trigger::new(op, threshold);
    if let Some(limit) = optional_f64(config, section, &format!("{side}_max"))? {
        let cap_op =
            optional_operator(config, section, &format!("{side}_max_operator"), Comparator::Gt)?;
        trigger = trigger.capped(cap_op, limit);
    }
    Ok(trigger)
}

fn read_threshold(
    config: &dyn ConfigPort,
    section: &str,
    indicator: &str,
) -> Result<Condition, StockframeError> {
    if indicator.is_empty() {
        return Err(invalid(section, "section", "missing indicator name"));
    }
    Ok(Condition::threshold(
        indicator,
        read_trigger(config, section, "buy")?,
        read_trigger(config, section, "sell")?,
    ))
}

/// `left` defaults to `default_left` when given (ticker sections name their
/// indicator in the section header). Both sides are lowercased to match
/// indicator section names.
fn read_comparison(
    config: &dyn ConfigPort,
    section: &str,
    default_left: Option<&str>,
) -> Result<Condition, StockframeError> {
    let left = match (config.get_string(section, "left"), default_left) {
        (Some(left), _) => left.trim().to_lowercase(),
        (None, Some(left)) => left.to_lowercase(),
        (None, None) => require_string(config, section, "left")?.to_lowercase(),
    };
    let right = require_string(config, section, "right")?.to_lowercase();
    Ok(Condition::comparison(
        &left,
        &right,
        require_operator(config, section, "buy_operator")?,
        require_operator(config, section, "sell_operator")?,
    ))
}

fn read_ticker_rule(
    config: &dyn ConfigPort,
    section: &str,
    rest: &str,
) -> Result<TickerRule, StockframeError> {
    let Some((ticker, indicator)) = rest.split_once('.') else {
        return Err(invalid(
            section,
            "section",
            "expected ticker.<TICKER>.<indicator>",
        ));
    };
    if ticker.is_empty() || indicator.is_empty() {
        return Err(invalid(
            section,
            "section",
            "expected ticker.<TICKER>.<indicator>",
        ));
    }

    let condition = if config.get_string(section, "right").is_some() {
        read_comparison(config, section, Some(indicator))?
    } else {
        read_threshold(config, section, indicator)?
    };

    let buy_cash_quantity = require_f64(config, section, "buy_cash_quantity")?;
    if buy_cash_quantity < 0.0 {
        return Err(invalid(
            section,
            "buy_cash_quantity",
            "buy_cash_quantity must be non-negative",
        ));
    }

    Ok(TickerRule {
        ticker: ticker.to_uppercase(),
        condition,
        buy_cash_quantity,
        close_position_when_sell: config.get_bool(section, "close_position_when_sell", false),
    })
}
