//! The indicator bundle evaluated every cycle.

use cryptor_core::error::IndicatorError;
use cryptor_core::traits::{Indicator, MultiOutputIndicator};
use cryptor_core::types::{IndicatorPoint, IndicatorSet};
use serde::{Deserialize, Serialize};

use crate::momentum::{Macd, MacdOutput, Rsi, RsiSmoothing};
use crate::moving_average::{EmaSeed, Sma};
use crate::volatility::{BollingerBands, BollingerOutput, Variance};

/// Look-back parameters for [`IndicatorSet`] computation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndicatorParams {
    pub sma_short: usize,
    pub sma_long: usize,
    pub rsi_period: usize,
    pub ema_fast: usize,
    pub ema_slow: usize,
    pub macd_signal: usize,
    pub band_period: usize,
    pub band_width: f64,
}

impl Default for IndicatorParams {
    fn default() -> Self {
        Self {
            sma_short: 10,
            sma_long: 50,
            rsi_period: 14,
            ema_fast: 12,
            ema_slow: 26,
            macd_signal: 9,
            band_period: 20,
            band_width: 2.0,
        }
    }
}

impl IndicatorParams {
    pub fn validate(&self) -> Result<(), IndicatorError> {
        if self.sma_short == 0 || self.sma_short >= self.sma_long {
            return Err(IndicatorError::InvalidParameter(format!(
                "moving averages need 0 < short < long, got {} / {}",
                self.sma_short, self.sma_long
            )));
        }
        if self.ema_fast == 0 || self.ema_fast >= self.ema_slow || self.macd_signal == 0 {
            return Err(IndicatorError::InvalidParameter(format!(
                "MACD needs 0 < fast < slow and a signal period, got {}/{}/{}",
                self.ema_fast, self.ema_slow, self.macd_signal
            )));
        }
        if self.rsi_period == 0 || self.band_period < 2 || self.band_width <= 0.0 {
            return Err(IndicatorError::InvalidParameter(
                "RSI period, band period and band width must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Bars needed to evaluate the current and the previous bar.
    pub fn required_bars(&self) -> usize {
        self.sma_long
            .max(self.rsi_period + 1)
            .max(self.ema_slow)
            .max(self.band_period)
            + 1
    }

    fn rsi(&self) -> Rsi {
        Rsi::new(self.rsi_period).with_smoothing(RsiSmoothing::Simple)
    }

    fn macd(&self) -> Macd {
        Macd::with_periods(self.ema_fast, self.ema_slow, self.macd_signal).seeded(EmaSeed::FirstValue)
    }

    fn bands(&self) -> BollingerBands {
        BollingerBands::with_params(self.band_period, self.band_width).with_variance(Variance::Sample)
    }

    /// Compute the indicator values at the last two bars of `closes`.
    pub fn compute(&self, closes: &[f64]) -> Result<IndicatorSet, IndicatorError> {
        let required = self.required_bars();
        if closes.len() < required {
            return Err(IndicatorError::InsufficientData {
                required,
                available: closes.len(),
            });
        }

        let (short_now, short_prev) = Sma::new(self.sma_short).latest_pair(closes)?;
        let (long_now, long_prev) = Sma::new(self.sma_long).latest_pair(closes)?;
        let (rsi_now, rsi_prev) = self.rsi().latest_pair(closes)?;
        let (macd_now, macd_prev) = self.macd().latest_pair(closes)?;
        let (band_now, band_prev) = self.bands().latest_pair(closes)?;

        let point = |sma_short: f64, sma_long: f64, rsi: f64, macd: MacdOutput, band: BollingerOutput| IndicatorPoint {
            sma_short,
            sma_long,
            rsi,
            ema_fast: macd.fast_ema,
            ema_slow: macd.slow_ema,
            macd: macd.macd,
            macd_signal: macd.signal,
            band_middle: band.middle,
            band_upper: band.upper,
            band_lower: band.lower,
            band_std: band.std_dev,
        };

        let set = IndicatorSet {
            current: point(short_now, long_now, rsi_now, macd_now, band_now),
            previous: point(short_prev, long_prev, rsi_prev, macd_prev, band_prev),
        };

        for value in [set.current.sma_long, set.current.rsi, set.current.macd, set.current.band_middle] {
            if !value.is_finite() {
                return Err(IndicatorError::CalculationError(format!(
                    "non-finite indicator value {}",
                    value
                )));
            }
        }

        Ok(set)
    }
}
