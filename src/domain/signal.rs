//! Signal rule types.
//!
//! - `Comparator`: closed set of binary predicates over indicator values
//! - `Trigger`: one side (buy or sell) of a threshold rule, with optional cap
//! - `Condition`: threshold or indicator-vs-indicator comparison
//! - `TickerRule`: a condition scoped to one ticker with sizing metadata
//! - `Decisions` / `TickerDecisions`: evaluator output

use crate::domain::error::StockframeError;
use crate::domain::store::Row;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

const EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Comparator {
    Gt,
    Ge,
    Lt,
    Le,
    Eq,
}

impl Comparator {
    /// Apply the predicate. Any NaN operand yields `false`.
    pub fn holds(self, lhs: f64, rhs: f64) -> bool {
        if lhs.is_nan() || rhs.is_nan() {
            return false;
        }
        match self {
            Comparator::Gt => lhs > rhs,
            Comparator::Ge => lhs >= rhs,
            Comparator::Lt => lhs < rhs,
            Comparator::Le => lhs <= rhs,
            Comparator::Eq => (lhs - rhs).abs() < EPSILON,
        }
    }

    /// Apply the predicate to possibly undefined values; undefined never
    /// satisfies.
    pub fn holds_for(self, lhs: Option<f64>, rhs: Option<f64>) -> bool {
        match (lhs, rhs) {
            (Some(lhs), Some(rhs)) => self.holds(lhs, rhs),
            _ => false,
        }
    }
}

impl FromStr for Comparator {
    type Err = StockframeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            ">" | "gt" => Ok(Comparator::Gt),
            ">=" | "≥" | "ge" => Ok(Comparator::Ge),
            "<" | "lt" => Ok(Comparator::Lt),
            "<=" | "≤" | "le" => Ok(Comparator::Le),
            "==" | "=" | "eq" => Ok(Comparator::Eq),
            other => Err(StockframeError::ConfigInvalid {
                section: "operator".to_string(),
                key: other.to_string(),
                reason: "expected one of >, >=, <, <=, ==".to_string(),
            }),
        }
    }
}

impl fmt::Display for Comparator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            Comparator::Gt => ">",
            Comparator::Ge => ">=",
            Comparator::Lt => "<",
            Comparator::Le => "<=",
            Comparator::Eq => "==",
        };
        f.write_str(symbol)
    }
}

/// Upper guard on a trigger: when `op(value, limit)` holds the trigger is
/// suppressed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cap {
    pub op: Comparator,
    pub limit: f64,
}

/// One side of a threshold rule: fires when `op(value, threshold)` holds and
/// the cap, if any, does not.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Trigger {
    pub op: Comparator,
    pub threshold: f64,
    pub cap: Option<Cap>,
}

impl Trigger {
    pub fn new(op: Comparator, threshold: f64) -> Self {
        Self {
            op,
            threshold,
            cap: None,
        }
    }

    pub fn capped(mut self, op: Comparator, limit: f64) -> Self {
        self.cap = Some(Cap { op, limit });
        self
    }

    pub fn fires(&self, value: Option<f64>) -> bool {
        let Some(value) = value else {
            return false;
        };
        if !self.op.holds(value, self.threshold) {
            return false;
        }
        match self.cap {
            Some(cap) => !cap.op.holds(value, cap.limit),
            None => true,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// One indicator against fixed bounds.
    Threshold {
        indicator: String,
        buy: Trigger,
        sell: Trigger,
    },
    /// `buy_op(left, right)` / `sell_op(left, right)`.
    Comparison {
        left: String,
        right: String,
        buy_op: Comparator,
        sell_op: Comparator,
    },
}

/// Which sides of a condition fired on a row.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Signal {
    pub buy: bool,
    pub sell: bool,
}

impl Condition {
    pub fn threshold(indicator: &str, buy: Trigger, sell: Trigger) -> Self {
        Condition::Threshold {
            indicator: indicator.to_string(),
            buy,
            sell,
        }
    }

    pub fn comparison(left: &str, right: &str, buy_op: Comparator, sell_op: Comparator) -> Self {
        Condition::Comparison {
            left: left.to_string(),
            right: right.to_string(),
            buy_op,
            sell_op,
        }
    }

    /// Registration key: the indicator name for thresholds,
    /// `"{left}_comp_{right}"` for comparisons.
    pub fn key(&self) -> String {
        match self {
            Condition::Threshold { indicator, .. } => indicator.clone(),
            Condition::Comparison { left, right, .. } => format!("{left}_comp_{right}"),
        }
    }

    /// Indicator columns the condition reads.
    pub fn columns(&self) -> Vec<&str> {
        match self {
            Condition::Threshold { indicator, .. } => vec![indicator.as_str()],
            Condition::Comparison { left, right, .. } => vec![left.as_str(), right.as_str()],
        }
    }

    pub fn check(&self, row: &Row<'_>) -> Signal {
        match self {
            Condition::Threshold {
                indicator,
                buy,
                sell,
            } => {
                let value = row.value(indicator);
                Signal {
                    buy: buy.fires(value),
                    sell: sell.fires(value),
                }
            }
            Condition::Comparison {
                left,
                right,
                buy_op,
                sell_op,
            } => {
                let lhs = row.value(left);
                let rhs = row.value(right);
                Signal {
                    buy: buy_op.holds_for(lhs, rhs),
                    sell: sell_op.holds_for(lhs, rhs),
                }
            }
        }
    }
}

/// A condition scoped to one ticker, carrying position sizing.
#[derive(Debug, Clone, PartialEq)]
pub struct TickerRule {
    pub ticker: String,
    pub condition: Condition,
    /// Cash to commit when the buy side fires.
    pub buy_cash_quantity: f64,
    pub close_position_when_sell: bool,
}

impl TickerRule {
    pub fn key(&self) -> (String, String) {
        (self.ticker.clone(), self.condition.key())
    }
}

/// Symbols with at least one firing buy or sell condition.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Decisions {
    pub buys: BTreeSet<String>,
    pub sells: BTreeSet<String>,
}

impl Decisions {
    pub fn is_empty(&self) -> bool {
        self.buys.is_empty() && self.sells.is_empty()
    }
}

/// Ticker decisions: buy cash per ticker, close-position flag per ticker.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickerDecisions {
    pub buys: BTreeMap<String, f64>,
    pub sells: BTreeMap<String, bool>,
}

impl TickerDecisions {
    pub fn is_empty(&self) -> bool {
        self.buys.is_empty() && self.sells.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn comparator_parse_forms() {
        assert_eq!(">".parse::<Comparator>().unwrap(), Comparator::Gt);
        assert_eq!(" >= ".parse::<Comparator>().unwrap(), Comparator::Ge);
        assert_eq!("≤".parse::<Comparator>().unwrap(), Comparator::Le);
        assert_eq!("LT".parse::<Comparator>().unwrap(), Comparator::Lt);
        assert_eq!("eq".parse::<Comparator>().unwrap(), Comparator::Eq);
        assert!("=>".parse::<Comparator>().is_err());
    }

    #[test]
    fn comparator_display_round_trip() {
        for op in [
            Comparator::Gt,
            Comparator::Ge,
            Comparator::Lt,
            Comparator::Le,
            Comparator::Eq,
        ] {
            assert_eq!(op.to_string().parse::<Comparator>().unwrap(), op);
        }
    }

    #[test]
    fn comparator_nan_never_holds() {
        for op in [Comparator::Gt, Comparator::Ge, Comparator::Lt, Comparator::Le, Comparator::Eq] {
            assert!(!op.holds(f64::NAN, 1.0));
            assert!(!op.holds(1.0, f64::NAN));
            assert!(!op.holds_for(None, Some(1.0)));
        }
    }

    #[test]
    fn comparator_eq_uses_tolerance() {
        assert!(Comparator::Eq.holds(1.0, 1.0 + 1e-12));
        assert!(!Comparator::Eq.holds(1.0, 1.001));
    }

    #[test]
    fn trigger_fires_on_threshold() {
        let buy = Trigger::new(Comparator::Le, 30.0);
        assert!(buy.fires(Some(30.0)));
        assert!(buy.fires(Some(12.0)));
        assert!(!buy.fires(Some(31.0)));
        assert!(!buy.fires(None));
    }

    #[test]
    fn trigger_cap_suppresses() {
        let buy = Trigger::new(Comparator::Le, 30.0).capped(Comparator::Gt, 25.0);
        assert!(!buy.fires(Some(28.0)));
        assert!(buy.fires(Some(20.0)));
        assert!(buy.fires(Some(25.0)));
    }

    #[test]
    fn condition_keys() {
        let threshold = Condition::threshold(
            "rsi",
            Trigger::new(Comparator::Le, 30.0),
            Trigger::new(Comparator::Ge, 70.0),
        );
        assert_eq!(threshold.key(), "rsi");
        assert_eq!(threshold.columns(), vec!["rsi"]);

        let comparison = Condition::comparison("sma_5", "sma_20", Comparator::Gt, Comparator::Lt);
        assert_eq!(comparison.key(), "sma_5_comp_sma_20");
        assert_eq!(comparison.columns(), vec!["sma_5", "sma_20"]);
    }

    #[test]
    fn ticker_rule_key() {
        let rule = TickerRule {
            ticker: "AAPL".into(),
            condition: Condition::comparison("macd", "macd_signal", Comparator::Gt, Comparator::Lt),
            buy_cash_quantity: 100.0,
            close_position_when_sell: true,
        };
        assert_eq!(
            rule.key(),
            ("AAPL".to_string(), "macd_comp_macd_signal".to_string())
        );
    }
}
