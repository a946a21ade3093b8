//! Signal rule evaluator.
//!
//! Holds threshold/comparison rules (applied to every symbol) and ticker
//! rules (applied to one symbol each) and scans the last row of the store
//! to produce buy/sell decisions.
//!
//! # Aggregation
//!
//! - `evaluate`: a symbol is a buy if any rule's buy side fires, likewise
//!   for sells. Both sets may contain the same symbol.
//! - `evaluate_ticker`: when several rules fire a buy for one ticker the
//!   largest `buy_cash_quantity` wins; a sell closes the position if any
//!   firing rule asks for it.

use crate::domain::error::StockframeError;
use crate::domain::signal::{
    Comparator, Condition, Decisions, TickerDecisions, TickerRule, Trigger,
};
use crate::domain::store::TimeSeriesStore;
use std::collections::BTreeSet;
use tracing::debug;

#[derive(Debug, Clone, Default)]
pub struct SignalEvaluator {
    rules: Vec<Condition>,
    ticker_rules: Vec<TickerRule>,
}

impl SignalEvaluator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a threshold rule keyed by `indicator`.
    pub fn add_threshold_rule(&mut self, indicator: &str, buy: Trigger, sell: Trigger) -> String {
        self.add_rule(Condition::threshold(indicator, buy, sell))
    }

    /// Register a comparison rule keyed by `"{left}_comp_{right}"`.
    pub fn add_comparison_rule(
        &mut self,
        left: &str,
        right: &str,
        buy_op: Comparator,
        sell_op: Comparator,
    ) -> String {
        self.add_rule(Condition::comparison(left, right, buy_op, sell_op))
    }

    /// Register a condition, replacing any rule with the same key. Returns
    /// the key.
    pub fn add_rule(&mut self, condition: Condition) -> String {
        let key = condition.key();
        match self.rules.iter_mut().find(|r| r.key() == key) {
            Some(existing) => {
                debug!(rule = %key, "replaced signal rule");
                *existing = condition;
            }
            None => {
                debug!(rule = %key, "registered signal rule");
                self.rules.push(condition);
            }
        }
        key
    }

    pub fn add_ticker_rule(&mut self, rule: TickerRule) {
        let key = rule.key();
        match self.ticker_rules.iter_mut().find(|r| r.key() == key) {
            Some(existing) => {
                debug!(ticker = %key.0, rule = %key.1, "replaced ticker rule");
                *existing = rule;
            }
            None => {
                debug!(ticker = %key.0, rule = %key.1, "registered ticker rule");
                self.ticker_rules.push(rule);
            }
        }
    }

    pub fn rules(&self) -> &[Condition] {
        &self.rules
    }

    pub fn get_rule(&self, key: &str) -> Option<&Condition> {
        self.rules.iter().find(|r| r.key() == key)
    }

    pub fn ticker_rules(&self) -> &[TickerRule] {
        &self.ticker_rules
    }

    pub fn get_ticker_rule(&self, ticker: &str, key: &str) -> Option<&TickerRule> {
        self.ticker_rules
            .iter()
            .find(|r| r.ticker == ticker && r.condition.key() == key)
    }

    /// Apply every rule to the last row of every symbol.
    pub fn evaluate(&self, store: &TimeSeriesStore) -> Result<Decisions, StockframeError> {
        for rule in &self.rules {
            store
                .columns_exist(&rule.columns())
                .map_err(|err| referenced_by(err, &rule.key()))?;
        }

        let mut decisions = Decisions::default();
        for row in store.last_row_per_symbol() {
            for rule in &self.rules {
                let signal = rule.check(&row);
                if signal.buy {
                    decisions.buys.insert(row.symbol().to_string());
                }
                if signal.sell {
                    decisions.sells.insert(row.symbol().to_string());
                }
            }
        }

        debug!(
            rules = self.rules.len(),
            buys = decisions.buys.len(),
            sells = decisions.sells.len(),
            "evaluated signal rules"
        );
        Ok(decisions)
    }

    /// Apply each ticker rule to the last row of its ticker.
    pub fn evaluate_ticker(
        &self,
        store: &TimeSeriesStore,
    ) -> Result<TickerDecisions, StockframeError> {
        self.evaluate_ticker_awaiting(store, &BTreeSet::new())
    }

    /// Like [`evaluate_ticker`](Self::evaluate_ticker), but rules for a
    /// ticker in `awaiting` are skipped while the store has no bars for it.
    pub fn evaluate_ticker_awaiting(
        &self,
        store: &TimeSeriesStore,
        awaiting: &BTreeSet<String>,
    ) -> Result<TickerDecisions, StockframeError> {
        let mut decisions = TickerDecisions::default();
        for rule in &self.ticker_rules {
            if awaiting.contains(&rule.ticker) && store.group(&rule.ticker).is_none() {
                debug!(ticker = %rule.ticker, "no bars yet, skipping ticker rule");
                continue;
            }
            let row = store.last_row_for_symbol(&rule.ticker)?;
            store
                .columns_exist_for_symbol(&rule.ticker, &rule.condition.columns())
                .map_err(|err| referenced_by(err, &rule.condition.key()))?;

            let signal = rule.condition.check(&row);
            if signal.buy {
                decisions
                    .buys
                    .entry(rule.ticker.clone())
                    .and_modify(|cash| *cash = cash.max(rule.buy_cash_quantity))
                    .or_insert(rule.buy_cash_quantity);
            }
            if signal.sell {
                let close = decisions.sells.entry(rule.ticker.clone()).or_insert(false);
                *close |= rule.close_position_when_sell;
            }
        }

        debug!(
            rules = self.ticker_rules.len(),
            buys = decisions.buys.len(),
            sells = decisions.sells.len(),
            "evaluated ticker rules"
        );
        Ok(decisions)
    }
}

fn referenced_by(err: StockframeError, key: &str) -> StockframeError {
    match err {
        StockframeError::MissingColumn { missing } => StockframeError::UnknownIndicator {
            context: format!("referenced by rule {key}"),
            missing,
        },
        other => other,
    }
}
