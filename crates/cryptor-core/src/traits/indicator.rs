//! Indicator trait definitions.

use crate::error::IndicatorError;

/// A pure batch indicator over a numeric series.
///
/// `calculate` returns one value per complete look-back window, so the output
/// is `period() - 1` values shorter than the input.
pub trait Indicator: Send + Sync {
    type Output: Copy;

    fn calculate(&self, data: &[f64]) -> Vec<Self::Output>;

    /// Minimum data points required for one output value.
    fn period(&self) -> usize;

    fn name(&self) -> &str;

    fn validate_data(&self, data: &[f64]) -> Result<(), IndicatorError> {
        check_len(data.len(), self.period())
    }

    /// Values at the last two bars, newest first.
    fn latest_pair(&self, data: &[f64]) -> Result<(Self::Output, Self::Output), IndicatorError> {
        check_len(data.len(), self.period() + 1)?;
        tail_pair(&self.calculate(data), self.period() + 1, data.len())
    }
}

/// Indicator producing several related values per bar (MACD, Bollinger Bands).
pub trait MultiOutputIndicator: Send + Sync {
    type Outputs: Copy;

    fn calculate(&self, data: &[f64]) -> Vec<Self::Outputs>;

    fn period(&self) -> usize;

    fn name(&self) -> &str;

    fn validate_data(&self, data: &[f64]) -> Result<(), IndicatorError> {
        check_len(data.len(), self.period())
    }

    /// Values at the last two bars, newest first.
    fn latest_pair(&self, data: &[f64]) -> Result<(Self::Outputs, Self::Outputs), IndicatorError> {
        check_len(data.len(), self.period() + 1)?;
        tail_pair(&self.calculate(data), self.period() + 1, data.len())
    }
}

fn check_len(available: usize, required: usize) -> Result<(), IndicatorError> {
    if available < required {
        return Err(IndicatorError::InsufficientData {
            required,
            available,
        });
    }
    Ok(())
}

fn tail_pair<T: Copy>(values: &[T], required: usize, available: usize) -> Result<(T, T), IndicatorError> {
    match values {
        [.., previous, current] => Ok((*current, *previous)),
        _ => Err(IndicatorError::InsufficientData {
            required,
            available,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct WindowSum {
        period: usize,
    }

    impl Indicator for WindowSum {
        type Output = f64;

        fn calculate(&self, data: &[f64]) -> Vec<f64> {
            if data.len() < self.period {
                return vec![];
            }
            data.windows(self.period).map(|w| w.iter().sum()).collect()
        }

        fn period(&self) -> usize {
            self.period
        }

        fn name(&self) -> &str {
            "window-sum"
        }
    }

    #[test]
    fn test_indicator_validation() {
        let indicator = WindowSum { period: 5 };

        assert!(indicator.validate_data(&[1.0, 2.0, 3.0]).is_err());
        assert!(indicator.validate_data(&[1.0, 2.0, 3.0, 4.0, 5.0]).is_ok());
    }

    #[test]
    fn test_latest_pair() {
        let indicator = WindowSum { period: 3 };
        let (current, previous) = indicator.latest_pair(&[1.0, 2.0, 3.0, 4.0, 5.0]).unwrap();

        assert!((current - 12.0).abs() < 1e-9); // 3+4+5
        assert!((previous - 9.0).abs() < 1e-9); // 2+3+4
    }

    #[test]
    fn test_latest_pair_needs_one_extra_bar() {
        let indicator = WindowSum { period: 3 };
        let err = indicator.latest_pair(&[1.0, 2.0, 3.0]).unwrap_err();
        assert_eq!(
            err,
            IndicatorError::InsufficientData {
                required: 4,
                available: 3
            }
        );
    }
}
