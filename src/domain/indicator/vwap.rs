//! Volume-Weighted Average Price, cumulative from the first bar.
//!
//! VWAP[i] = sum(volume * typical_price)[0..=i] / sum(volume)[0..=i]
//! Undefined while cumulative volume is zero.

use crate::domain::ohlcv::Bar;
use crate::domain::store::Column;

pub fn calculate_vwap(bars: &[Bar]) -> Column {
    let mut cum_pv = 0.0;
    let mut cum_volume = 0.0;

    bars.iter()
        .map(|bar| {
            cum_pv += bar.volume * bar.typical_price();
            cum_volume += bar.volume;
            if cum_volume == 0.0 {
                None
            } else {
                Some(cum_pv / cum_volume)
            }
        })
        .collect()
}
