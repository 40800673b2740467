//! Moving average indicators.

use cryptor_core::traits::Indicator;

/// Simple Moving Average (SMA).
///
/// Calculates the arithmetic mean of the last N values.
#[derive(Debug, Clone)]
pub struct Sma {
    period: usize,
}

impl Sma {
    /// Create a new SMA with the specified period.
    pub fn new(period: usize) -> Self {
        assert!(period > 0, "Period must be greater than 0");
        Self { period }
    }
}

impl Indicator for Sma {
    type Output = f64;

    fn calculate(&self, data: &[f64]) -> Vec<f64> {
        if data.len() < self.period {
            return vec![];
        }

        let mut result = Vec::with_capacity(data.len() - self.period + 1);
        let period_f64 = self.period as f64;

        let mut sum: f64 = data[..self.period].iter().sum();
        result.push(sum / period_f64);

        // Sliding window
        for i in self.period..data.len() {
            sum = sum - data[i - self.period] + data[i];
            result.push(sum / period_f64);
        }

        result
    }

    fn period(&self) -> usize {
        self.period
    }

    fn name(&self) -> &str {
        "SMA"
    }
}

/// How an EMA picks its first value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EmaSeed {
    /// Start from the SMA of the first `period` values; output starts at bar `period - 1`.
    #[default]
    Sma,
    /// Start from the first value; one output per input bar.
    FirstValue,
}

/// Exponential Moving Average (EMA) with `alpha = 2 / (period + 1)`.
#[derive(Debug, Clone)]
pub struct Ema {
    period: usize,
    multiplier: f64,
    seed: EmaSeed,
}

impl Ema {
    /// Create a new SMA-seeded EMA with the specified period.
    pub fn new(period: usize) -> Self {
        assert!(period > 0, "Period must be greater than 0");
        let multiplier = 2.0 / (period as f64 + 1.0);
        Self {
            period,
            multiplier,
            seed: EmaSeed::Sma,
        }
    }

    /// Change the seeding rule.
    pub fn seeded(mut self, seed: EmaSeed) -> Self {
        self.seed = seed;
        self
    }

    pub fn seed(&self) -> EmaSeed {
        self.seed
    }
}

impl Indicator for Ema {
    type Output = f64;

    fn calculate(&self, data: &[f64]) -> Vec<f64> {
        let (mut ema, rest) = match self.seed {
            EmaSeed::Sma => {
                if data.len() < self.period {
                    return vec![];
                }
                let initial = data[..self.period].iter().sum::<f64>() / self.period as f64;
                (initial, &data[self.period..])
            }
            EmaSeed::FirstValue => match data.split_first() {
                Some((first, rest)) => (*first, rest),
                None => return vec![],
            },
        };

        let mut result = Vec::with_capacity(rest.len() + 1);
        result.push(ema);

        let one_minus_mult = 1.0 - self.multiplier;
        for &price in rest {
            ema = price * self.multiplier + ema * one_minus_mult;
            result.push(ema);
        }

        result
    }

    fn period(&self) -> usize {
        self.period
    }

    fn name(&self) -> &str {
        "EMA"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sma() {
        let sma = Sma::new(3);
        let data = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        let result = sma.calculate(&data);

        assert_eq!(result.len(), 3);
        assert!((result[0] - 2.0).abs() < 1e-10); // (1+2+3)/3
        assert!((result[1] - 3.0).abs() < 1e-10); // (2+3+4)/3
        assert!((result[2] - 4.0).abs() < 1e-10); // (3+4+5)/3
    }

    #[test]
    fn test_sma_insufficient_data() {
        let sma = Sma::new(5);
        let result = sma.calculate(&[1.0, 2.0, 3.0]);

        assert!(result.is_empty());
    }

    #[test]
    fn test_ema_sma_seed() {
        let ema = Ema::new(3);
        let data = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        let result = ema.calculate(&data);

        assert_eq!(result.len(), 3);
        assert!((result[0] - 2.0).abs() < 1e-10);
        // mult = 2/(3+1) = 0.5, 4 * 0.5 + 2 * 0.5 = 3.0
        assert!((result[1] - 3.0).abs() < 1e-10);
    }

    #[test]
    fn test_ema_first_value_seed() {
        let ema = Ema::new(3).seeded(EmaSeed::FirstValue);
        let data = vec![2.0, 4.0, 6.0];
        let result = ema.calculate(&data);

        assert_eq!(result.len(), 3);
        assert!((result[0] - 2.0).abs() < 1e-10);
        assert!((result[1] - 3.0).abs() < 1e-10); // 4*0.5 + 2*0.5
        assert!((result[2] - 4.5).abs() < 1e-10); // 6*0.5 + 3*0.5
    }

    #[test]
    fn test_ema_empty_input() {
        assert!(Ema::new(3).seeded(EmaSeed::FirstValue).calculate(&[]).is_empty());
    }
}
