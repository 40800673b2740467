//! Volatility indicators.

use cryptor_core::traits::{Indicator, MultiOutputIndicator};
use serde::{Deserialize, Serialize};

/// Divisor used for variance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Variance {
    /// Divide by N
    #[default]
    Population,
    /// Divide by N - 1
    Sample,
}

impl Variance {
    fn std_dev(self, window: &[f64]) -> (f64, f64) {
        let n = window.len() as f64;
        let mean = window.iter().sum::<f64>() / n;
        let squares = window.iter().map(|x| (x - mean).powi(2)).sum::<f64>();
        let divisor = match self {
            Variance::Population => n,
            Variance::Sample => n - 1.0,
        };
        (mean, (squares / divisor).sqrt())
    }
}

/// Rolling standard deviation.
#[derive(Debug, Clone)]
pub struct StdDev {
    period: usize,
    variance: Variance,
}

impl StdDev {
    /// Create a new population standard deviation indicator.
    pub fn new(period: usize) -> Self {
        assert!(period > 1, "Period must be greater than 1");
        Self {
            period,
            variance: Variance::Population,
        }
    }

    /// Sample (N - 1) standard deviation.
    pub fn sample(period: usize) -> Self {
        Self {
            variance: Variance::Sample,
            ..Self::new(period)
        }
    }

    /// Standard deviation of the last `period` values, if there are enough.
    pub fn last(&self, data: &[f64]) -> Option<f64> {
        if data.len() < self.period {
            return None;
        }
        Some(self.variance.std_dev(&data[data.len() - self.period..]).1)
    }
}

impl Indicator for StdDev {
    type Output = f64;

    fn calculate(&self, data: &[f64]) -> Vec<f64> {
        if data.len() < self.period {
            return vec![];
        }

        data.windows(self.period)
            .map(|window| self.variance.std_dev(window).1)
            .collect()
    }

    fn period(&self) -> usize {
        self.period
    }

    fn name(&self) -> &str {
        "StdDev"
    }
}

/// Bollinger Bands output.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BollingerOutput {
    pub upper: f64,
    /// Middle band (SMA)
    pub middle: f64,
    pub lower: f64,
    /// Standard deviation of the window
    pub std_dev: f64,
    /// %B ((price - lower) / (upper - lower))
    pub percent_b: f64,
}

impl BollingerOutput {
    /// Check if price is above upper band.
    pub fn is_overbought(&self, price: f64) -> bool {
        price > self.upper
    }

    /// Check if price is below lower band.
    pub fn is_oversold(&self, price: f64) -> bool {
        price < self.lower
    }
}

/// Bollinger Bands.
///
/// Consists of a middle band (SMA) with upper and lower bands
/// at a specified number of standard deviations.
#[derive(Debug, Clone)]
pub struct BollingerBands {
    period: usize,
    std_dev_multiplier: f64,
    variance: Variance,
}

impl BollingerBands {
    /// Create new Bollinger Bands with default parameters (20, 2.0).
    pub fn new() -> Self {
        Self::with_params(20, 2.0)
    }

    /// Create Bollinger Bands with custom parameters.
    pub fn with_params(period: usize, std_dev_multiplier: f64) -> Self {
        assert!(period > 1, "Period must be greater than 1");
        assert!(
            std_dev_multiplier > 0.0,
            "Std dev multiplier must be positive"
        );
        Self {
            period,
            std_dev_multiplier,
            variance: Variance::Population,
        }
    }

    pub fn with_variance(mut self, variance: Variance) -> Self {
        self.variance = variance;
        self
    }
}

impl Default for BollingerBands {
    fn default() -> Self {
        Self::new()
    }
}

impl MultiOutputIndicator for BollingerBands {
    type Outputs = BollingerOutput;

    fn calculate(&self, data: &[f64]) -> Vec<BollingerOutput> {
        if data.len() < self.period {
            return vec![];
        }

        data.windows(self.period)
            .enumerate()
            .map(|(i, window)| {
                let (mean, std_dev) = self.variance.std_dev(window);
                let upper = mean + self.std_dev_multiplier * std_dev;
                let lower = mean - self.std_dev_multiplier * std_dev;

                let price = data[self.period - 1 + i];
                let percent_b = if upper != lower {
                    (price - lower) / (upper - lower)
                } else {
                    0.5
                };

                BollingerOutput {
                    upper,
                    middle: mean,
                    lower,
                    std_dev,
                    percent_b,
                }
            })
            .collect()
    }

    fn period(&self) -> usize {
        self.period
    }

    fn name(&self) -> &str {
        "Bollinger Bands"
    }
}
