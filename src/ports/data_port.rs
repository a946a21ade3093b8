//! Bar source port trait.

use crate::domain::error::StockframeError;
use crate::domain::ohlcv::Bar;

pub trait DataPort {
    /// Every bar for `symbol`, ascending by timestamp.
    fn fetch_bars(&self, symbol: &str) -> Result<Vec<Bar>, StockframeError>;

    fn list_symbols(&self) -> Result<Vec<String>, StockframeError>;
}
