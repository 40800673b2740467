//! Core data types for the decision engine.

mod account;
mod cycle;
mod indicators;
mod market;
mod ohlcv;
mod order;
mod position;
mod sentiment;
mod timeframe;

pub use account::Balances;
pub use cycle::{CycleAction, CycleRequest, CycleResult, ExitReason};
pub use indicators::{IndicatorPoint, IndicatorSet, VolatilityProfile};
pub use market::{Market, OptionKind, OptionParams, SymbolPair};
pub use ohlcv::{Bar, MarketSnapshot};
pub use order::{Fill, Order, OrderRequest, OrderStatus, Side};
pub use position::{Position, PositionSide, ProtectiveLevels, MAX_LEVERAGE, MIN_LEVERAGE};
pub use sentiment::{FreshTexts, SentimentScore};
pub use timeframe::Timeframe;
