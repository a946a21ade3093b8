//! stockframe: grouped OHLCV time-series store, incremental indicator engine
//! and buy/sell signal evaluator.
//!
//! Hexagonal architecture: domain logic in [`domain`], port traits in [`ports`],
//! concrete implementations in [`adapters`].

pub mod domain;
pub mod ports;
pub mod adapters;
pub mod cli;
