//! MACD (Moving Average Convergence Divergence).
//!
//! MACD Line = EMA(fast) - EMA(slow)
//! Signal Line = EMA(9) of MACD Line, defined once 8 line values exist
//! Histogram = MACD Line - Signal Line
//!
//! Default parameters: fast=12, slow=26

use crate::domain::indicator::ema::{calculate_ema, ewm_mean};
use crate::domain::ohlcv::Bar;
use crate::domain::store::Column;

pub const DEFAULT_FAST: usize = 12;
pub const DEFAULT_SLOW: usize = 26;
pub const SIGNAL_SPAN: usize = 9;
pub const SIGNAL_MIN_PERIODS: usize = 8;

#[derive(Debug, Clone, PartialEq)]
pub struct MacdColumns {
    pub fast: Column,
    pub slow: Column,
    pub line: Column,
    pub signal: Column,
    pub histogram: Column,
}

pub fn calculate_macd(bars: &[Bar], fast: usize, slow: usize) -> MacdColumns {
    let ema_fast = calculate_ema(bars, fast);
    let ema_slow = calculate_ema(bars, slow);

    let line: Column = ema_fast
        .iter()
        .zip(&ema_slow)
        .map(|(f, s)| Some((*f)? - (*s)?))
        .collect();

    // The line is defined from the first bar whenever both periods are
    // non-zero; a leading undefined run only happens for a zero period.
    let defined_from = line.iter().position(Option::is_some).unwrap_or(line.len());
    let raw: Vec<f64> = line[defined_from..].iter().flatten().copied().collect();
    let mut signal = vec![None; defined_from];
    signal.extend(ewm_mean(&raw, SIGNAL_SPAN, SIGNAL_MIN_PERIODS));

    let histogram = line
        .iter()
        .zip(&signal)
        .map(|(l, s)| Some((*l)? - (*s)?))
        .collect();

    MacdColumns {
        fast: ema_fast,
        slow: ema_slow,
        line,
        signal,
        histogram,
    }
}

pub fn calculate_macd_default(bars: &[Bar]) -> MacdColumns {
    calculate_macd(bars, DEFAULT_FAST, DEFAULT_SLOW)
}
