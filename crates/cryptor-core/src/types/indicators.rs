//! Derived indicator values and the volatility profile.

use serde::{Deserialize, Serialize};

/// Indicator values at one bar.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct IndicatorPoint {
    pub sma_short: f64,
    pub sma_long: f64,
    /// Oscillator (RSI), 0 to 100
    pub rsi: f64,
    pub ema_fast: f64,
    pub ema_slow: f64,
    /// Fast minus slow exponential average
    pub macd: f64,
    pub macd_signal: f64,
    pub band_middle: f64,
    pub band_upper: f64,
    pub band_lower: f64,
    pub band_std: f64,
}

/// Indicator values for the latest bar and the bar before it.
///
/// Recomputed every cycle from the snapshot; never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct IndicatorSet {
    pub current: IndicatorPoint,
    pub previous: IndicatorPoint,
}

/// Rolling standard deviation of returns over three windows.
///
/// A window is `None` until the series is long enough to fill it; `average`
/// is only defined once all three windows are.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct VolatilityProfile {
    pub short_term: Option<f64>,
    pub medium_term: Option<f64>,
    pub long_term: Option<f64>,
    pub average: Option<f64>,
}

impl VolatilityProfile {
    /// Build a profile, deriving the average from the three windows.
    pub fn from_windows(short_term: Option<f64>, medium_term: Option<f64>, long_term: Option<f64>) -> Self {
        let average = match (short_term, medium_term, long_term) {
            (Some(s), Some(m), Some(l)) => Some((s + m + l) / 3.0),
            _ => None,
        };
        Self {
            short_term,
            medium_term,
            long_term,
            average,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.average.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_average_requires_all_windows() {
        let partial = VolatilityProfile::from_windows(Some(0.01), Some(0.02), None);
        assert!(partial.average.is_none());
        assert!(!partial.is_complete());

        let full = VolatilityProfile::from_windows(Some(0.01), Some(0.02), Some(0.03));
        assert!((full.average.unwrap() - 0.02).abs() < 1e-12);
    }
}
