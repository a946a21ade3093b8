//! Core domain types and logic.

pub mod ohlcv;
pub mod store;
pub mod indicator;
pub mod engine;
pub mod signal;
pub mod evaluator;
pub mod session;
pub mod strategy;
pub mod config_validation;
pub mod error;
