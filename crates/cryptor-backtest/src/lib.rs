//! Backtesting engine.
//!
//! Replays a recorded bar history through [`cryptor_engine::Engine`] with a
//! paper exchange and summarizes the trades and equity it produced.

mod engine;
mod statistics;
mod report;

pub use engine::{BacktestEngine, BacktestConfig};
pub use statistics::{BacktestStats, TradeRecord};
pub use report::BacktestReport;
