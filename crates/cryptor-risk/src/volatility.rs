//! Return volatility over short, medium and long windows.

use cryptor_core::types::VolatilityProfile;
use cryptor_indicators::StdDev;

/// Rolling sample standard deviation of percentage returns.
#[derive(Debug, Clone)]
pub struct VolatilityEstimator {
    short: StdDev,
    medium: StdDev,
    long: StdDev,
    long_window: usize,
}

impl Default for VolatilityEstimator {
    fn default() -> Self {
        Self::new(5, 20, 50)
    }
}

impl VolatilityEstimator {
    pub fn new(short: usize, medium: usize, long: usize) -> Self {
        assert!(short < medium && medium < long, "Windows must be increasing");
        Self {
            short: StdDev::sample(short),
            medium: StdDev::sample(medium),
            long: StdDev::sample(long),
            long_window: long,
        }
    }

    /// Closes needed before every window is defined.
    pub fn required_closes(&self) -> usize {
        self.long_window + 1
    }

    /// Profile for the latest bar of `closes`.
    ///
    /// Windows that cannot be filled yet, or that contain a non-finite
    /// return, are reported as `None`.
    pub fn estimate(&self, closes: &[f64]) -> VolatilityProfile {
        let returns = pct_change(closes);
        let window = |std: &StdDev| std.last(&returns).filter(|v| v.is_finite());

        VolatilityProfile::from_windows(window(&self.short), window(&self.medium), window(&self.long))
    }
}

/// Percentage change between consecutive values.
pub fn pct_change(values: &[f64]) -> Vec<f64> {
    values.windows(2).map(|w| (w[1] - w[0]) / w[0]).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pct_change() {
        let returns = pct_change(&[100.0, 110.0, 99.0]);
        assert_eq!(returns.len(), 2);
        assert!((returns[0] - 0.10).abs() < 1e-12);
        assert!((returns[1] + 0.10).abs() < 1e-12);
    }

    #[test]
    fn test_short_history_leaves_long_window_undefined() {
        let estimator = VolatilityEstimator::default();
        let closes: Vec<f64> = (0..30).map(|i| 100.0 + (i % 3) as f64).collect();
        let profile = estimator.estimate(&closes);

        assert!(profile.short_term.is_some());
        assert!(profile.medium_term.is_some());
        assert!(profile.long_term.is_none());
        assert!(profile.average.is_none());
    }

    #[test]
    fn test_full_profile() {
        let estimator = VolatilityEstimator::default();
        let closes: Vec<f64> = (0..estimator.required_closes())
            .map(|i| if i % 2 == 0 { 100.0 } else { 101.0 })
            .collect();
        let profile = estimator.estimate(&closes);

        let average = profile.average.unwrap();
        let mean = (profile.short_term.unwrap() + profile.medium_term.unwrap() + profile.long_term.unwrap()) / 3.0;
        assert!((average - mean).abs() < 1e-12);
        assert!(average > 0.0);
    }

    #[test]
    fn test_constant_prices_have_zero_volatility() {
        let estimator = VolatilityEstimator::default();
        let profile = estimator.estimate(&[250.0; 60]);
        assert_eq!(profile.average, Some(0.0));
    }

    #[test]
    fn test_zero_price_makes_window_undefined() {
        let estimator = VolatilityEstimator::new(2, 3, 4);
        let profile = estimator.estimate(&[1.0, 2.0, 0.0, 1.0, 2.0, 3.0]);
        // returns: 1.0, -1.0, inf, 1.0, 0.5
        assert!(profile.short_term.is_some());
        assert!(profile.medium_term.is_none());
        assert!(profile.average.is_none());
    }
}
