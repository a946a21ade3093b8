//! Indicator engine: an ordered registry of named formulas replayed against
//! the store on every refresh.
//!
//! Registering a name that already exists replaces its definition in place,
//! keeping the original registration slot. Nothing is computed until
//! [`IndicatorEngine::compute`] or [`IndicatorEngine::refresh`] runs.

use crate::domain::error::StockframeError;
use crate::domain::indicator::{Formula, IndicatorDefinition, Parameters};
use crate::domain::store::{Column, TimeSeriesStore};
use tracing::{debug, info};

#[derive(Debug, Clone, Default)]
pub struct IndicatorEngine {
    definitions: Vec<IndicatorDefinition>,
}

impl IndicatorEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: &str, formula: Formula) -> Result<(), StockframeError> {
        formula.validate()?;
        let definition = IndicatorDefinition {
            name: name.to_string(),
            formula,
        };
        match self.definitions.iter_mut().find(|d| d.name == name) {
            Some(existing) => {
                debug!(indicator = name, %formula, "replaced indicator definition");
                *existing = definition;
            }
            None => {
                debug!(indicator = name, %formula, "registered indicator");
                self.definitions.push(definition);
            }
        }
        Ok(())
    }

    /// Register by formula name, e.g. `("rsi", {period: 14})`.
    pub fn register_with_parameters(
        &mut self,
        name: &str,
        formula: &str,
        params: &Parameters,
    ) -> Result<(), StockframeError> {
        let formula = Formula::from_parameters(formula, params)?;
        self.register(name, formula)
    }

    pub fn definitions(&self) -> &[IndicatorDefinition] {
        &self.definitions
    }

    pub fn definition(&self, name: &str) -> Option<&IndicatorDefinition> {
        self.definitions.iter().find(|d| d.name == name)
    }

    /// Run one registered definition and overwrite its columns.
    pub fn compute(&self, name: &str, store: &mut TimeSeriesStore) -> Result<(), StockframeError> {
        let definition = self
            .definition(name)
            .ok_or_else(|| StockframeError::UnknownIndicator {
                context: "not registered".to_string(),
                missing: vec![name.to_string()],
            })?;
        let staged = stage(definition, store);
        store.commit_columns(staged);
        Ok(())
    }

    /// Replay every definition in registration order. All columns are
    /// computed before any is written back.
    pub fn refresh(&self, store: &mut TimeSeriesStore) {
        let view: &TimeSeriesStore = store;
        let staged: Vec<_> = self
            .definitions
            .iter()
            .flat_map(|definition| stage(definition, view))
            .collect();
        let columns = staged.len();
        store.commit_columns(staged);
        info!(
            indicators = self.definitions.len(),
            columns,
            rows = store.len(),
            "refreshed indicators"
        );
    }
}

fn stage(definition: &IndicatorDefinition, store: &TimeSeriesStore) -> Vec<(String, String, Column)> {
    store
        .group_by_symbol()
        .flat_map(|group| {
            definition
                .formula
                .compute(&definition.name, &group)
                .into_iter()
                .map(move |series| (group.symbol.to_string(), series.column, series.values))
        })
        .collect()
}
