//! RSI (Relative Strength Index).
//!
//! The change in close is split into gains `max(change, 0)` and losses
//! `max(-change, 0)`; both are smoothed with the span-weighted exponential
//! mean (span = period).
//!
//! Formula: RSI = 100 - (100 / (1 + avg_gain / avg_loss))
//! If avg_loss == 0: RSI = 100
//!
//! The first bar has no change and is undefined; smoothing starts at the
//! second bar.

use crate::domain::indicator::ema::ewm_mean;
use crate::domain::ohlcv::Bar;
use crate::domain::store::Column;

pub fn calculate_rsi(bars: &[Bar], period: usize) -> Column {
    if period == 0 || bars.len() < 2 {
        return vec![None; bars.len()];
    }

    let (gains, losses): (Vec<f64>, Vec<f64>) = bars
        .windows(2)
        .map(|w| {
            let change = w[1].close - w[0].close;
            (change.max(0.0), (-change).max(0.0))
        })
        .unzip();

    let avg_gain = ewm_mean(&gains, period, 1);
    let avg_loss = ewm_mean(&losses, period, 1);

    let mut values = Vec::with_capacity(bars.len());
    values.push(None);
    values.extend(
        avg_gain
            .into_iter()
            .zip(avg_loss)
            .map(|(gain, loss)| match (gain, loss) {
                (Some(gain), Some(loss)) => Some(rsi_from_averages(gain, loss)),
                _ => None,
            }),
    );
    values
}

fn rsi_from_averages(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 {
        return 100.0;
    }
    let rsi = 100.0 - (100.0 / (1.0 + avg_gain / avg_loss));
    rsi.clamp(0.0, 100.0)
}
