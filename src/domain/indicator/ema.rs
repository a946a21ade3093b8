//! Exponential Moving Average of close.
//!
//! Span-based weighting: alpha = 2/(span+1). Each output is the weighted mean
//! of all observations so far with weights (1-alpha)^age, normalised by the
//! sum of weights, so the series is defined from the first bar and converges
//! to the recursive form as history grows:
//!
//! num[i] = x[i] + (1-alpha)*num[i-1]
//! den[i] = 1    + (1-alpha)*den[i-1]
//! ema[i] = num[i] / den[i]

use crate::domain::ohlcv::Bar;
use crate::domain::store::Column;

pub fn calculate_ema(bars: &[Bar], period: usize) -> Column {
    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    ewm_mean(&closes, period, 1)
}

/// Span-weighted exponential mean; cells before `min_periods` observations
/// are undefined.
pub fn ewm_mean(values: &[f64], span: usize, min_periods: usize) -> Column {
    if span == 0 {
        return vec![None; values.len()];
    }

    let alpha = 2.0 / (span as f64 + 1.0);
    let decay = 1.0 - alpha;
    let mut num = 0.0;
    let mut den = 0.0;

    values
        .iter()
        .enumerate()
        .map(|(i, &x)| {
            num = x + decay * num;
            den = 1.0 + decay * den;
            if i + 1 >= min_periods {
                Some(num / den)
            } else {
                None
            }
        })
        .collect()
}
