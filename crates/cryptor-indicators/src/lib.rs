//! Technical indicators for the cryptor decision engine.
//!
//! This crate provides batch implementations of the indicators a cycle reads:
//! - Moving averages (SMA, EMA)
//! - Momentum indicators (RSI, MACD)
//! - Volatility indicators (Bollinger Bands, Standard Deviation)
//!
//! [`IndicatorParams::compute`] bundles them into the per-cycle
//! [`IndicatorSet`](cryptor_core::types::IndicatorSet).

pub mod momentum;
pub mod moving_average;
pub mod set;
pub mod volatility;

pub use momentum::{Macd, MacdOutput, Rsi, RsiSmoothing};
pub use moving_average::{Ema, EmaSeed, Sma};
pub use set::IndicatorParams;
pub use volatility::{BollingerBands, BollingerOutput, StdDev, Variance};
