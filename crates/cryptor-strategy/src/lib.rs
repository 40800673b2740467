//! Signal fusion, entry/exit decisions and sentiment tracking.
//!
//! - [`SignalFusion`]: weighted technical/forecast/sentiment confidences
//! - [`DecisionEngine`]: candidate action and balance gates
//! - [`SentimentTracker`]: smoothed per-asset sentiment over a text scorer
//! - [`LinearTrendForecaster`]: baseline next-bar price forecast

pub mod decision;
pub mod forecast;
pub mod fusion;
pub mod sentiment;

pub use decision::{Candidate, DecisionEngine, Gate};
pub use forecast::LinearTrendForecaster;
pub use fusion::{FusedSignal, FusionConfig, FusionWeights, SignalComponents, SignalFusion};
pub use sentiment::{LexiconScorer, SentimentConfig, SentimentTracker};
