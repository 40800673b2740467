//! Per-asset smoothed sentiment.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use cryptor_core::error::PortError;
use cryptor_core::traits::{SentimentModel, TextScorer};
use cryptor_core::types::{FreshTexts, SentimentScore};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Weights and smoothing for [`SentimentTracker`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SentimentConfig {
    pub social_weight: f64,
    pub news_weight: f64,
    /// Weight of a new observation in the exponential smoothing
    pub alpha: f64,
}

impl Default for SentimentConfig {
    fn default() -> Self {
        Self {
            social_weight: 0.6,
            news_weight: 0.4,
            alpha: 0.3,
        }
    }
}

impl SentimentConfig {
    pub fn validate(&self) -> Result<(), String> {
        if !(0.0..=1.0).contains(&self.alpha) || self.alpha == 0.0 {
            return Err(format!("sentiment alpha must be in (0, 1], got {}", self.alpha));
        }
        if self.social_weight < 0.0 || self.news_weight < 0.0 {
            return Err("sentiment weights must be non-negative".to_string());
        }
        Ok(())
    }
}

/// Folds scored social and news texts into a smoothed score per asset.
///
/// The first observation for an asset is taken as-is; later ones are blended
/// as `(1 - alpha) * prior + alpha * observation`. A call without texts
/// returns the prior score unchanged.
pub struct SentimentTracker<S> {
    scorer: S,
    config: SentimentConfig,
    scores: Mutex<HashMap<String, SentimentScore>>,
}

impl<S: TextScorer> SentimentTracker<S> {
    pub fn new(scorer: S, config: SentimentConfig) -> Self {
        Self {
            scorer,
            config,
            scores: Mutex::new(HashMap::new()),
        }
    }

    /// Current score for `asset` without updating it.
    pub fn current(&self, asset: &str) -> SentimentScore {
        self.scores
            .lock()
            .ok()
            .and_then(|scores| scores.get(asset).copied())
            .unwrap_or_default()
    }

    async fn mean_score(&self, texts: &[String]) -> Result<f64, PortError> {
        if texts.is_empty() {
            return Ok(0.0);
        }
        let scores = self.scorer.score_texts(texts).await?;
        if scores.is_empty() {
            return Ok(0.0);
        }
        Ok(scores.iter().sum::<f64>() / scores.len() as f64)
    }
}

#[async_trait]
impl<S: TextScorer> SentimentModel for SentimentTracker<S> {
    async fn sentiment(&self, asset: &str, texts: &FreshTexts) -> Result<SentimentScore, PortError> {
        if texts.is_empty() {
            return Ok(self.current(asset));
        }

        let social = self.mean_score(&texts.social).await?;
        let news = self.mean_score(&texts.news).await?;
        let observation = self.config.social_weight * social + self.config.news_weight * news;

        let mut scores = self
            .scores
            .lock()
            .map_err(|_| PortError::Unavailable("sentiment state poisoned".to_string()))?;
        let prior = scores.get(asset).copied().unwrap_or_default();
        let value = if prior.observations > 0 {
            (1.0 - self.config.alpha) * prior.value + self.config.alpha * observation
        } else {
            observation
        };
        let updated = SentimentScore::new(value, prior.observations + 1, Utc::now());
        scores.insert(asset.to_string(), updated);

        debug!(
            asset,
            social,
            news,
            observation,
            score = updated.value,
            observations = updated.observations,
            "Sentiment updated"
        );
        Ok(updated)
    }
}

/// Word-list scorer: +1 per bullish word, -1 per bearish word, squashed into [-1, 1].
#[derive(Debug, Clone)]
pub struct LexiconScorer {
    bullish: Vec<String>,
    bearish: Vec<String>,
}

impl Default for LexiconScorer {
    fn default() -> Self {
        let words = |list: &[&str]| list.iter().map(|w| w.to_string()).collect();
        Self {
            bullish: words(&[
                "bull", "bullish", "moon", "pump", "rally", "surge", "gain", "gains", "breakout", "buy",
                "up", "ath", "adoption", "approval",
            ]),
            bearish: words(&[
                "bear", "bearish", "dump", "crash", "drop", "plunge", "loss", "losses", "sell", "down",
                "hack", "ban", "fraud", "lawsuit",
            ]),
        }
    }
}

impl LexiconScorer {
    pub fn score(&self, text: &str) -> f64 {
        let mut tally = 0i32;
        for word in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
            .map(str::to_lowercase)
        {
            if self.bullish.contains(&word) {
                tally += 1;
            } else if self.bearish.contains(&word) {
                tally -= 1;
            }
        }
        (tally as f64 / 2.0).tanh()
    }
}

#[async_trait]
impl TextScorer for LexiconScorer {
    async fn score_texts(&self, texts: &[String]) -> Result<Vec<f64>, PortError> {
        Ok(texts.iter().map(|t| self.score(t)).collect())
    }
}
