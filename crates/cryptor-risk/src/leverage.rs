//! Dynamic futures leverage.

use cryptor_core::types::{MAX_LEVERAGE, MIN_LEVERAGE};
use serde::{Deserialize, Serialize};

/// Leverage bounds and baseline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LeverageConfig {
    pub base: u32,
    pub min: u32,
    pub max: u32,
}

impl Default for LeverageConfig {
    fn default() -> Self {
        Self {
            base: 5,
            min: MIN_LEVERAGE,
            max: MAX_LEVERAGE,
        }
    }
}

/// Maps volatility and sentiment into a bounded leverage.
///
/// `leverage = baseline * (1 + s/2) / clamp(avg_vol * 100, 0.5, 2.0)`, rounded
/// and clamped into `[min, max]`. The baseline is the leverage last applied to
/// the symbol, or the configured base before the first application.
#[derive(Debug, Clone)]
pub struct LeverageController {
    base: u32,
    min: u32,
    max: u32,
}

impl LeverageController {
    /// Build a controller. Bounds are narrowed to the global leverage range.
    pub fn new(config: &LeverageConfig) -> Self {
        let min = config.min.clamp(MIN_LEVERAGE, MAX_LEVERAGE);
        let max = config.max.clamp(min, MAX_LEVERAGE);
        Self {
            base: config.base.clamp(min, max),
            min,
            max,
        }
    }

    pub fn volatility_factor(average_volatility: f64) -> f64 {
        if !average_volatility.is_finite() {
            return 2.0;
        }
        (average_volatility * 100.0).clamp(0.5, 2.0)
    }

    pub fn sentiment_factor(sentiment: f64) -> f64 {
        let sentiment = if sentiment.is_finite() { sentiment.clamp(-1.0, 1.0) } else { 0.0 };
        1.0 + sentiment * 0.5
    }

    /// Leverage scaled from `baseline` by the average volatility and sentiment score.
    pub fn dynamic(&self, baseline: u32, average_volatility: f64, sentiment: f64) -> u32 {
        let raw = baseline as f64 * Self::sentiment_factor(sentiment) / Self::volatility_factor(average_volatility);
        (raw.round() as u32).clamp(self.min, self.max)
    }

    /// Leverage to apply this cycle: an explicit request wins, clamped to bounds.
    pub fn resolve(&self, explicit: Option<u32>, baseline: u32, average_volatility: f64, sentiment: f64) -> u32 {
        match explicit {
            Some(requested) => requested.clamp(self.min, self.max),
            None => self.dynamic(baseline, average_volatility, sentiment),
        }
    }

    /// Baseline for a symbol that has no applied leverage yet.
    pub fn base(&self) -> u32 {
        self.base
    }

    pub fn bounds(&self) -> (u32, u32) {
        (self.min, self.max)
    }
}

impl Default for LeverageController {
    fn default() -> Self {
        Self::new(&LeverageConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_case() {
        let controller = LeverageController::default();
        assert_eq!(LeverageController::volatility_factor(0.01), 1.0);
        assert!((LeverageController::sentiment_factor(0.4) - 1.2).abs() < 1e-12);
        assert_eq!(controller.dynamic(controller.base(), 0.01, 0.4), 6);
    }

    #[test]
    fn test_volatility_factor_clamped() {
        assert_eq!(LeverageController::volatility_factor(0.0), 0.5);
        assert_eq!(LeverageController::volatility_factor(0.5), 2.0);
        assert_eq!(LeverageController::volatility_factor(f64::NAN), 2.0);
    }

    #[test]
    fn test_always_within_bounds() {
        let controller = LeverageController::new(&LeverageConfig {
            base: 50,
            min: 1,
            max: 20,
        });
        for vol in [0.0, 0.001, 0.005, 0.01, 0.02, 0.1, 10.0] {
            for s in [-5.0, -1.0, -0.5, 0.0, 0.5, 1.0, 5.0] {
                let leverage = controller.dynamic(50, vol, s);
                assert!((1..=20).contains(&leverage), "vol {} s {} -> {}", vol, s, leverage);
            }
        }
    }

    #[test]
    fn test_monotonic() {
        let controller = LeverageController::default();
        let sentiments = [-1.0, -0.6, -0.2, 0.0, 0.3, 0.7, 1.0];
        for pair in sentiments.windows(2) {
            assert!(controller.dynamic(5, 0.01, pair[0]) <= controller.dynamic(5, 0.01, pair[1]));
        }
        let vols = [0.001, 0.005, 0.008, 0.012, 0.015, 0.02, 0.03];
        for pair in vols.windows(2) {
            assert!(controller.dynamic(5, pair[0], 0.5) >= controller.dynamic(5, pair[1], 0.5));
        }
    }

    #[test]
    fn test_explicit_override_is_clamped() {
        let controller = LeverageController::default();
        assert_eq!(controller.resolve(Some(10), 5, 0.01, 0.0), 10);
        assert_eq!(controller.resolve(Some(50), 5, 0.01, 0.0), 20);
        assert_eq!(controller.resolve(Some(0), 5, 0.01, 0.0), 1);
        assert_eq!(controller.resolve(None, 5, 0.01, 0.4), 6);
    }

    #[test]
    fn test_scales_from_previous_leverage() {
        let controller = LeverageController::default();
        // calm market: each application doubles the previous one until the cap
        let mut applied = Vec::new();
        let mut baseline = controller.base();
        for _ in 0..3 {
            baseline = controller.resolve(None, baseline, 0.001, 0.0);
            applied.push(baseline);
        }
        assert_eq!(applied, vec![10, 20, 20]);

        // an explicit value becomes the next baseline too
        let explicit = controller.resolve(Some(3), baseline, 0.001, 0.0);
        assert_eq!(controller.resolve(None, explicit, 0.001, 0.0), 6);
    }

    #[test]
    fn test_config_bounds_narrowed() {
        let controller = LeverageController::new(&LeverageConfig {
            base: 5,
            min: 0,
            max: 40,
        });
        assert_eq!(controller.bounds(), (1, 20));
        assert_eq!(controller.base(), 5);
    }
}
