//! Core traits: indicators and the external ports consumed by the engine.

mod deadline;
mod exchange;
mod indicator;
mod market_data;
mod models;

pub use deadline::with_timeout;
pub use exchange::Exchange;
pub use indicator::{Indicator, MultiOutputIndicator};
pub use market_data::MarketData;
pub use models::{Forecaster, NoTexts, SentimentModel, TextFeed, TextScorer};
