//! Baseline price forecaster.

use async_trait::async_trait;
use cryptor_core::error::PortError;
use cryptor_core::traits::Forecaster;
use cryptor_core::types::MarketSnapshot;

/// Ordinary least squares fit of close against bar index over the last
/// `lookback` bars, extrapolated one bar ahead.
#[derive(Debug, Clone, Copy)]
pub struct LinearTrendForecaster {
    lookback: usize,
}

impl Default for LinearTrendForecaster {
    fn default() -> Self {
        Self { lookback: 24 }
    }
}

impl LinearTrendForecaster {
    pub fn new(lookback: usize) -> Self {
        Self {
            lookback: lookback.max(2),
        }
    }

    /// Next-bar projection for `closes`, or `None` with fewer than two points.
    pub fn project(&self, closes: &[f64]) -> Option<f64> {
        let window = &closes[closes.len().saturating_sub(self.lookback)..];
        let n = window.len();
        if n < 2 {
            return None;
        }

        let nf = n as f64;
        let mean_x = (nf - 1.0) / 2.0;
        let mean_y = window.iter().sum::<f64>() / nf;
        let (mut sxy, mut sxx) = (0.0, 0.0);
        for (i, y) in window.iter().enumerate() {
            let dx = i as f64 - mean_x;
            sxy += dx * (y - mean_y);
            sxx += dx * dx;
        }
        let slope = sxy / sxx;
        let projected = mean_y + slope * (nf - mean_x);
        projected.is_finite().then_some(projected)
    }
}

#[async_trait]
impl Forecaster for LinearTrendForecaster {
    async fn forecast_next(&self, snapshot: &MarketSnapshot) -> Result<f64, PortError> {
        self.project(&snapshot.closes()).ok_or_else(|| {
            PortError::Unavailable(format!("not enough bars to forecast {}", snapshot.symbol))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_projects_linear_series() {
        let closes: Vec<f64> = (0..30).map(|i| 100.0 + 2.0 * i as f64).collect();
        let next = LinearTrendForecaster::default().project(&closes).unwrap();
        assert!((next - 160.0).abs() < 1e-9);
    }

    #[test]
    fn test_flat_series() {
        let next = LinearTrendForecaster::new(5).project(&[50.0; 10]).unwrap();
        assert!((next - 50.0).abs() < 1e-12);
    }

    #[test]
    fn test_too_short() {
        assert!(LinearTrendForecaster::default().project(&[1.0]).is_none());
    }
}
