//! Core types and traits for the cryptor decision engine.
//!
//! This crate provides the foundational building blocks including:
//! - Market data types (Bar, MarketSnapshot, Timeframe)
//! - Order, balance and position types
//! - Cycle request/result types shared by the engine and its callers
//! - Port traits for the exchange, market data, text feeds and models

pub mod error;
pub mod traits;
pub mod types;

pub use error::{CycleError, DataError, EngineError, IndicatorError, PortError, StoreError};
pub use traits::*;
pub use types::*;
