//! Change in price: `close[i] - close[i-1]`, undefined for the first bar.

use crate::domain::ohlcv::Bar;
use crate::domain::store::Column;

pub fn calculate_change_in_price(bars: &[Bar]) -> Column {
    let mut values = Vec::with_capacity(bars.len());
    if !bars.is_empty() {
        values.push(None);
    }
    values.extend(bars.windows(2).map(|w| Some(w[1].close - w[0].close)));
    values
}
