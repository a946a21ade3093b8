//! Trading session: the single owner of the store, the indicator engine and
//! the signal evaluator.
//!
//! Every new batch of bars goes through [`Session::ingest`], which appends,
//! refreshes all indicators and evaluates all rules before returning.

use crate::domain::engine::IndicatorEngine;
use crate::domain::error::StockframeError;
use crate::domain::evaluator::SignalEvaluator;
use crate::domain::ohlcv::Bar;
use crate::domain::signal::{Decisions, TickerDecisions};
use crate::domain::store::TimeSeriesStore;
use std::collections::BTreeSet;
use tracing::info;

/// Output of one evaluation pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Evaluation {
    pub decisions: Decisions,
    pub ticker_decisions: TickerDecisions,
}

#[derive(Debug, Default)]
pub struct Session {
    store: TimeSeriesStore,
    engine: IndicatorEngine,
    evaluator: SignalEvaluator,
    /// Symbols whose bars arrive later; their ticker rules wait for them.
    awaiting: BTreeSet<String>,
}

impl Session {
    pub fn new(history: Vec<Bar>) -> Result<Self, StockframeError> {
        Ok(Self {
            store: TimeSeriesStore::create(history)?,
            engine: IndicatorEngine::new(),
            evaluator: SignalEvaluator::new(),
            awaiting: BTreeSet::new(),
        })
    }

    pub fn store(&self) -> &TimeSeriesStore {
        &self.store
    }

    pub fn engine_mut(&mut self) -> &mut IndicatorEngine {
        &mut self.engine
    }

    pub fn evaluator_mut(&mut self) -> &mut SignalEvaluator {
        &mut self.evaluator
    }

    /// Both registries at once, for installing a strategy.
    pub fn parts_mut(&mut self) -> (&mut IndicatorEngine, &mut SignalEvaluator) {
        (&mut self.engine, &mut self.evaluator)
    }

    /// Declare symbols that will only show up through [`Session::ingest`].
    pub fn await_symbols<I: IntoIterator<Item = String>>(&mut self, symbols: I) {
        self.awaiting.extend(symbols);
    }

    pub fn refresh(&mut self) {
        self.engine.refresh(&mut self.store);
    }

    pub fn evaluate(&self) -> Result<Evaluation, StockframeError> {
        Ok(Evaluation {
            decisions: self.evaluator.evaluate(&self.store)?,
            ticker_decisions: self
                .evaluator
                .evaluate_ticker_awaiting(&self.store, &self.awaiting)?,
        })
    }

    /// Append `bars`, replay every indicator and evaluate every rule.
    pub fn ingest(&mut self, bars: Vec<Bar>) -> Result<Evaluation, StockframeError> {
        let count = bars.len();
        self.store.append(bars);
        self.refresh();
        let evaluation = self.evaluate()?;
        info!(
            bars = count,
            buys = evaluation.decisions.buys.len(),
            sells = evaluation.decisions.sells.len(),
            ticker_buys = evaluation.ticker_decisions.buys.len(),
            ticker_sells = evaluation.ticker_decisions.sells.len(),
            "ingested bars"
        );
        Ok(evaluation)
    }
}
