//! Grouped time-series store.
//!
//! Bars are partitioned by symbol on insertion, so the symbol grouping is
//! maintained incrementally rather than recomputed. Within a symbol, bars
//! are kept in ascending timestamp order after every mutation and
//! `(symbol, timestamp)` is unique.
//!
//! Indicator columns live next to the bars of each symbol. They are written
//! only by the indicator engine and are dropped for a symbol as soon as that
//! symbol's bars change, so a column is either absent or aligned with every
//! bar of the symbol.

use crate::domain::error::StockframeError;
use crate::domain::ohlcv::Bar;
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// One indicator cell per bar; `None` is the undefined state (warmup,
/// zero denominators).
pub type Column = Vec<Option<f64>>;

#[derive(Debug, Clone, Default)]
struct SymbolSeries {
    bars: Vec<Bar>,
    columns: BTreeMap<String, Column>,
}

impl SymbolSeries {
    /// Insert or replace by timestamp. Returns `true` when an existing bar
    /// was replaced.
    fn upsert(&mut self, bar: Bar) -> bool {
        match self.bars.binary_search_by_key(&bar.timestamp, |b| b.timestamp) {
            Ok(i) => {
                self.bars[i] = bar;
                true
            }
            Err(i) => {
                self.bars.insert(i, bar);
                false
            }
        }
    }
}

/// Read view over the bars of one symbol, in ascending timestamp order.
#[derive(Debug, Clone, Copy)]
pub struct SymbolGroup<'a> {
    pub symbol: &'a str,
    pub bars: &'a [Bar],
}

/// A single stored bar together with its indicator cells.
#[derive(Debug, Clone, Copy)]
pub struct Row<'a> {
    series: &'a SymbolSeries,
    index: usize,
}

impl<'a> Row<'a> {
    pub fn bar(&self) -> &'a Bar {
        &self.series.bars[self.index]
    }

    pub fn symbol(&self) -> &'a str {
        &self.bar().symbol
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.series.columns.contains_key(column)
    }

    /// The indicator value at this row. `None` when the column is absent or
    /// the cell is undefined.
    pub fn value(&self, column: &str) -> Option<f64> {
        self.series
            .columns
            .get(column)
            .and_then(|values| values.get(self.index).copied().flatten())
    }
}

#[derive(Debug, Clone, Default)]
pub struct TimeSeriesStore {
    series: BTreeMap<String, SymbolSeries>,
}

impl TimeSeriesStore {
    /// Build the store from an initial batch.
    ///
    /// The batch may arrive in any order, but two bars sharing
    /// `(symbol, timestamp)` make it ambiguous and are rejected.
    pub fn create(rows: Vec<Bar>) -> Result<Self, StockframeError> {
        let mut series: BTreeMap<String, SymbolSeries> = BTreeMap::new();
        for bar in rows {
            series.entry(bar.symbol.clone()).or_default().bars.push(bar);
        }

        for s in series.values_mut() {
            s.bars.sort_by_key(|b| b.timestamp);
            if let Some(pair) = s.bars.windows(2).find(|w| w[0].timestamp == w[1].timestamp) {
                return Err(StockframeError::DuplicateKey {
                    symbol: pair[0].symbol.clone(),
                    timestamp: pair[0].timestamp,
                });
            }
        }

        let store = Self { series };
        debug!(
            symbols = store.series.len(),
            rows = store.len(),
            "created time-series store"
        );
        Ok(store)
    }

    /// Upsert each bar by `(symbol, timestamp)`; the last write wins.
    ///
    /// Indicator columns of every touched symbol are dropped until the next
    /// refresh.
    pub fn append<I>(&mut self, rows: I)
    where
        I: IntoIterator<Item = Bar>,
    {
        let mut inserted = 0usize;
        let mut replaced = 0usize;
        let mut touched = BTreeSet::new();

        for bar in rows {
            touched.insert(bar.symbol.clone());
            let series = self.series.entry(bar.symbol.clone()).or_default();
            if series.upsert(bar) {
                replaced += 1;
            } else {
                inserted += 1;
            }
        }

        for symbol in &touched {
            if let Some(series) = self.series.get_mut(symbol) {
                series.columns.clear();
            }
        }

        debug!(inserted, replaced, symbols = touched.len(), "appended bars");
    }

    pub fn len(&self) -> usize {
        self.series.values().map(|s| s.bars.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.series.values().all(|s| s.bars.is_empty())
    }

    pub fn symbols(&self) -> impl Iterator<Item = &str> {
        self.series.keys().map(String::as_str)
    }

    /// One ordered view per distinct symbol, symbols in ascending order.
    pub fn group_by_symbol(&self) -> impl Iterator<Item = SymbolGroup<'_>> {
        self.series.iter().map(|(symbol, s)| SymbolGroup {
            symbol,
            bars: &s.bars,
        })
    }

    pub fn group(&self, symbol: &str) -> Option<SymbolGroup<'_>> {
        self.series.get_key_value(symbol).map(|(symbol, s)| SymbolGroup {
            symbol,
            bars: &s.bars,
        })
    }

    /// Succeeds iff every name is a present column on every row.
    pub fn columns_exist<S: AsRef<str>>(&self, names: &[S]) -> Result<(), StockframeError> {
        let missing: BTreeSet<String> = names
            .iter()
            .map(|name| name.as_ref())
            .filter(|name| {
                self.series
                    .values()
                    .any(|s| !s.bars.is_empty() && !s.columns.contains_key(*name))
            })
            .map(str::to_string)
            .collect();
        missing_to_result(missing)
    }

    /// As [`columns_exist`](Self::columns_exist), scoped to one symbol.
    pub fn columns_exist_for_symbol<S: AsRef<str>>(
        &self,
        symbol: &str,
        names: &[S],
    ) -> Result<(), StockframeError> {
        let series = self.non_empty_series(symbol)?;
        let missing: BTreeSet<String> = names
            .iter()
            .map(|name| name.as_ref())
            .filter(|name| !series.columns.contains_key(*name))
            .map(str::to_string)
            .collect();
        missing_to_result(missing)
    }

    /// Names of the columns present on every row.
    pub fn column_names(&self) -> BTreeSet<&str> {
        let mut populated = self.series.values().filter(|s| !s.bars.is_empty());
        let Some(first) = populated.next() else {
            return BTreeSet::new();
        };
        let mut names: BTreeSet<&str> = first.columns.keys().map(String::as_str).collect();
        for s in populated {
            names.retain(|name| s.columns.contains_key(*name));
        }
        names
    }

    pub fn column(&self, symbol: &str, name: &str) -> Option<&[Option<f64>]> {
        self.series
            .get(symbol)
            .and_then(|s| s.columns.get(name))
            .map(Vec::as_slice)
    }

    /// The last (maximum timestamp) row of every symbol.
    pub fn last_row_per_symbol(&self) -> Vec<Row<'_>> {
        self.series
            .values()
            .filter(|s| !s.bars.is_empty())
            .map(|s| Row {
                series: s,
                index: s.bars.len() - 1,
            })
            .collect()
    }

    pub fn last_row_for_symbol(&self, symbol: &str) -> Result<Row<'_>, StockframeError> {
        let series = self.non_empty_series(symbol)?;
        Ok(Row {
            series,
            index: series.bars.len() - 1,
        })
    }

    /// Replace indicator columns in one step. Values that came out as NaN
    /// are stored as undefined.
    pub(crate) fn commit_columns(&mut self, staged: Vec<(String, String, Column)>) {
        for (symbol, name, values) in staged {
            let Some(series) = self.series.get_mut(&symbol) else {
                continue;
            };
            debug_assert_eq!(values.len(), series.bars.len());
            let values = values
                .into_iter()
                .map(|v| v.filter(|x| !x.is_nan()))
                .collect();
            series.columns.insert(name, values);
        }
    }

    fn non_empty_series(&self, symbol: &str) -> Result<&SymbolSeries, StockframeError> {
        self.series
            .get(symbol)
            .filter(|s| !s.bars.is_empty())
            .ok_or_else(|| StockframeError::UnknownSymbol {
                symbol: symbol.to_string(),
            })
    }
}

fn missing_to_result(missing: BTreeSet<String>) -> Result<(), StockframeError> {
    if missing.is_empty() {
        Ok(())
    } else {
        Err(StockframeError::MissingColumn {
            missing: missing.into_iter().collect(),
        })
    }
}
