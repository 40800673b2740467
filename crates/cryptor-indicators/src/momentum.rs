//! Momentum indicators.

use cryptor_core::traits::{Indicator, MultiOutputIndicator};
use serde::{Deserialize, Serialize};

use crate::moving_average::{Ema, EmaSeed, Sma};

/// Averaging applied to gains and losses in [`Rsi`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RsiSmoothing {
    /// Wilder's recursive smoothing.
    #[default]
    Wilder,
    /// Plain rolling mean over the last `period` changes.
    Simple,
}

/// Relative Strength Index (RSI).
///
/// Measures the speed and magnitude of recent price changes
/// to evaluate overbought or oversold conditions.
#[derive(Debug, Clone)]
pub struct Rsi {
    period: usize,
    smoothing: RsiSmoothing,
}

impl Rsi {
    /// Create a new Wilder-smoothed RSI.
    ///
    /// Common periods are 14 (default) or 9.
    pub fn new(period: usize) -> Self {
        assert!(period > 0, "Period must be greater than 0");
        Self {
            period,
            smoothing: RsiSmoothing::Wilder,
        }
    }

    pub fn with_smoothing(mut self, smoothing: RsiSmoothing) -> Self {
        self.smoothing = smoothing;
        self
    }

    fn wilder_smooth(values: &[f64], period: usize) -> Vec<f64> {
        if values.len() < period {
            return vec![];
        }

        let mut result = Vec::with_capacity(values.len() - period + 1);
        let period_f64 = period as f64;

        let mut avg: f64 = values[..period].iter().sum::<f64>() / period_f64;
        result.push(avg);

        // avg = (prev_avg * (period-1) + value) / period
        for &value in &values[period..] {
            avg = (avg * (period_f64 - 1.0) + value) / period_f64;
            result.push(avg);
        }

        result
    }

    fn smooth(&self, values: &[f64]) -> Vec<f64> {
        match self.smoothing {
            RsiSmoothing::Wilder => Self::wilder_smooth(values, self.period),
            RsiSmoothing::Simple => Sma::new(self.period).calculate(values),
        }
    }
}

impl Indicator for Rsi {
    type Output = f64;

    fn calculate(&self, data: &[f64]) -> Vec<f64> {
        if data.len() <= self.period {
            return vec![];
        }

        let (gains, losses): (Vec<f64>, Vec<f64>) = data
            .windows(2)
            .map(|w| {
                let change = w[1] - w[0];
                if change > 0.0 {
                    (change, 0.0)
                } else {
                    (0.0, -change)
                }
            })
            .unzip();

        let avg_gains = self.smooth(&gains);
        let avg_losses = self.smooth(&losses);

        avg_gains
            .iter()
            .zip(avg_losses.iter())
            .map(|(&gain, &loss)| {
                if loss == 0.0 {
                    // flat window reads as neutral
                    if gain == 0.0 {
                        50.0
                    } else {
                        100.0
                    }
                } else {
                    100.0 - (100.0 / (1.0 + gain / loss))
                }
            })
            .collect()
    }

    fn period(&self) -> usize {
        self.period + 1
    }

    fn name(&self) -> &str {
        "RSI"
    }
}

/// MACD (Moving Average Convergence Divergence) output.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MacdOutput {
    pub fast_ema: f64,
    pub slow_ema: f64,
    /// MACD line (fast EMA - slow EMA)
    pub macd: f64,
    /// Signal line (EMA of MACD)
    pub signal: f64,
    /// Histogram (MACD - Signal)
    pub histogram: f64,
}

/// MACD indicator.
///
/// Uses two EMAs to identify trend direction and momentum.
#[derive(Debug, Clone)]
pub struct Macd {
    fast_period: usize,
    slow_period: usize,
    signal_period: usize,
    seed: EmaSeed,
}

impl Macd {
    /// Create a new MACD with default parameters (12, 26, 9).
    pub fn new() -> Self {
        Self::with_periods(12, 26, 9)
    }

    /// Create a MACD with custom periods.
    pub fn with_periods(fast: usize, slow: usize, signal: usize) -> Self {
        assert!(fast > 0 && slow > 0 && signal > 0);
        assert!(fast < slow, "Fast period must be less than slow period");
        Self {
            fast_period: fast,
            slow_period: slow,
            signal_period: signal,
            seed: EmaSeed::Sma,
        }
    }

    /// Seeding rule shared by all three EMAs.
    pub fn seeded(mut self, seed: EmaSeed) -> Self {
        self.seed = seed;
        self
    }

    fn ema(&self, period: usize) -> Ema {
        Ema::new(period).seeded(self.seed)
    }
}

impl Default for Macd {
    fn default() -> Self {
        Self::new()
    }
}

impl MultiOutputIndicator for Macd {
    type Outputs = MacdOutput;

    fn calculate(&self, data: &[f64]) -> Vec<MacdOutput> {
        if data.len() < self.period() {
            return vec![];
        }

        let fast_ema = self.ema(self.fast_period).calculate(data);
        let slow_ema = self.ema(self.slow_period).calculate(data);

        // Align the EMAs on the last bar (fast may have more values)
        let fast_ema = &fast_ema[fast_ema.len() - slow_ema.len()..];

        let macd_line: Vec<f64> = fast_ema
            .iter()
            .zip(slow_ema.iter())
            .map(|(f, s)| f - s)
            .collect();

        let signal_line = self.ema(self.signal_period).calculate(&macd_line);
        if signal_line.is_empty() {
            return vec![];
        }

        let offset = macd_line.len() - signal_line.len();
        macd_line[offset..]
            .iter()
            .zip(&fast_ema[offset..])
            .zip(&slow_ema[offset..])
            .zip(signal_line.iter())
            .map(|(((&macd, &fast_ema), &slow_ema), &signal)| MacdOutput {
                fast_ema,
                slow_ema,
                macd,
                signal,
                histogram: macd - signal,
            })
            .collect()
    }

    fn period(&self) -> usize {
        match self.seed {
            EmaSeed::Sma => self.slow_period + self.signal_period,
            EmaSeed::FirstValue => self.slow_period,
        }
    }

    fn name(&self) -> &str {
        "MACD"
    }
}
