//! Simple Moving Average of close.
//!
//! Trailing arithmetic mean over `period` bars. The first (period-1) bars
//! are undefined. Each window uses a running mean, so a constant series
//! yields the constant exactly.

use crate::domain::ohlcv::Bar;
use crate::domain::store::Column;

pub fn calculate_sma(bars: &[Bar], period: usize) -> Column {
    if period == 0 {
        return vec![None; bars.len()];
    }

    (0..bars.len())
        .map(|i| {
            if i + 1 < period {
                return None;
            }
            let window = &bars[i + 1 - period..=i];
            let mean = window
                .iter()
                .enumerate()
                .fold(0.0, |mean, (k, b)| mean + (b.close - mean) / (k + 1) as f64);
            Some(mean)
        })
        .collect()
}
