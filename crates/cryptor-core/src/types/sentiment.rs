//! Sentiment score and the texts it is derived from.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Smoothed market sentiment for one asset, in [-1, 1]. Negative is bearish.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SentimentScore {
    pub value: f64,
    /// Number of text batches folded into the score so far
    pub observations: u64,
    pub updated_at: Option<DateTime<Utc>>,
}

impl SentimentScore {
    /// Score with no observations behind it.
    pub fn neutral() -> Self {
        Self {
            value: 0.0,
            observations: 0,
            updated_at: None,
        }
    }

    /// Build a score, clamping the value into [-1, 1].
    pub fn new(value: f64, observations: u64, updated_at: DateTime<Utc>) -> Self {
        let value = if value.is_finite() { value.clamp(-1.0, 1.0) } else { 0.0 };
        Self {
            value,
            observations,
            updated_at: Some(updated_at),
        }
    }

    /// Magnitude used to scale signal confidence.
    #[inline]
    pub fn weight(&self) -> f64 {
        self.value.abs()
    }
}

impl Default for SentimentScore {
    fn default() -> Self {
        Self::neutral()
    }
}

/// Texts collected for an asset since the previous cycle.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FreshTexts {
    pub social: Vec<String>,
    pub news: Vec<String>,
}

impl FreshTexts {
    pub fn is_empty(&self) -> bool {
        self.social.is_empty() && self.news.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_score_is_clamped() {
        assert_eq!(SentimentScore::new(1.7, 1, Utc::now()).value, 1.0);
        assert_eq!(SentimentScore::new(-3.0, 1, Utc::now()).value, -1.0);
        assert_eq!(SentimentScore::new(f64::NAN, 1, Utc::now()).value, 0.0);
        assert_eq!(SentimentScore::new(-0.4, 1, Utc::now()).weight(), 0.4);
    }

    #[test]
    fn test_fresh_texts_empty() {
        assert!(FreshTexts::default().is_empty());
        let texts = FreshTexts {
            social: vec!["btc to the moon".into()],
            news: vec![],
        };
        assert!(!texts.is_empty());
    }
}
