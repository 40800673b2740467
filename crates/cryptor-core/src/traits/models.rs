//! Text feed, sentiment and forecast ports.

use async_trait::async_trait;

use crate::error::PortError;
use crate::types::{FreshTexts, MarketSnapshot, SentimentScore};

/// Source of social and news texts about an asset.
#[async_trait]
pub trait TextFeed: Send + Sync {
    /// Texts published since the previous call for `asset`.
    async fn fetch_texts(&self, asset: &str) -> Result<FreshTexts, PortError>;
}

/// Scores individual texts in [-1, 1].
#[async_trait]
pub trait TextScorer: Send + Sync {
    async fn score_texts(&self, texts: &[String]) -> Result<Vec<f64>, PortError>;
}

/// Smoothed per-asset sentiment.
///
/// With no fresh texts the previous smoothed score is returned unchanged.
#[async_trait]
pub trait SentimentModel: Send + Sync {
    async fn sentiment(&self, asset: &str, texts: &FreshTexts) -> Result<SentimentScore, PortError>;
}

/// Next-bar close forecast.
#[async_trait]
pub trait Forecaster: Send + Sync {
    async fn forecast_next(&self, snapshot: &MarketSnapshot) -> Result<f64, PortError>;
}

/// Text feed that never has anything new.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoTexts;

#[async_trait]
impl TextFeed for NoTexts {
    async fn fetch_texts(&self, _asset: &str) -> Result<FreshTexts, PortError> {
        Ok(FreshTexts::default())
    }
}
