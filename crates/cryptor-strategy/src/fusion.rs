//! Confidence-weighted signal fusion.
//!
//! Each component is a predicate over the indicator set, the forecast and the
//! current price. A true predicate contributes its weight; the weighted sum is
//! then scaled by `1 + |sentiment|`. Confidences are not capped at 1.

use cryptor_core::types::{IndicatorPoint, IndicatorSet};
use serde::{Deserialize, Serialize};

/// Weight of each signal component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FusionWeights {
    pub crossover: f64,
    pub oscillator: f64,
    pub macd: f64,
    pub band: f64,
    pub momentum: f64,
    pub reversion: f64,
}

impl Default for FusionWeights {
    fn default() -> Self {
        Self {
            crossover: 0.3,
            oscillator: 0.2,
            macd: 0.2,
            band: 0.3,
            momentum: 0.2,
            reversion: 0.1,
        }
    }
}

/// Thresholds and weights for [`SignalFusion`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FusionConfig {
    pub weights: FusionWeights,
    /// Confidence a side must exceed to signal
    pub signal_threshold: f64,
    pub oversold: f64,
    pub overbought: f64,
    /// Minimum forecast return counted as momentum
    pub momentum_threshold: f64,
    /// Minimum band-std distance counted as reversion
    pub reversion_threshold: f64,
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            weights: FusionWeights::default(),
            signal_threshold: 0.7,
            oversold: 30.0,
            overbought: 70.0,
            momentum_threshold: 0.015,
            reversion_threshold: 1.0,
        }
    }
}

impl FusionConfig {
    pub fn validate(&self) -> Result<(), String> {
        let w = &self.weights;
        if [w.crossover, w.oscillator, w.macd, w.band, w.momentum, w.reversion]
            .iter()
            .any(|v| !v.is_finite() || *v < 0.0)
        {
            return Err("fusion weights must be finite and non-negative".to_string());
        }
        if self.oversold >= self.overbought {
            return Err(format!(
                "oversold ({}) must be below overbought ({})",
                self.oversold, self.overbought
            ));
        }
        Ok(())
    }
}

/// Raw predicate values of one fusion.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SignalComponents {
    pub sma_cross_buy: bool,
    pub sma_cross_sell: bool,
    pub oscillator_buy: bool,
    pub oscillator_sell: bool,
    pub macd_buy: bool,
    pub macd_sell: bool,
    pub band_buy: bool,
    pub band_sell: bool,
    pub momentum_score: f64,
    /// Zero when the band std is zero or not finite
    pub reversion_score: f64,
}

/// Fused confidences and the resulting discrete signals.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct FusedSignal {
    pub components: SignalComponents,
    pub sentiment_weight: f64,
    pub buy_confidence: f64,
    pub sell_confidence: f64,
    pub buy_signal: bool,
    pub sell_signal: bool,
}

/// Pure fusion of technical, forecast and sentiment inputs.
#[derive(Debug, Clone, Default)]
pub struct SignalFusion {
    config: FusionConfig,
}

fn crosses_above(previous: (f64, f64), current: (f64, f64)) -> bool {
    previous.0 < previous.1 && current.0 > current.1
}

fn crosses_below(previous: (f64, f64), current: (f64, f64)) -> bool {
    previous.0 > previous.1 && current.0 < current.1
}

#[inline]
fn weight_if(flag: bool, weight: f64) -> f64 {
    if flag {
        weight
    } else {
        0.0
    }
}

impl SignalFusion {
    pub fn new(config: FusionConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &FusionConfig {
        &self.config
    }

    /// Evaluate the component predicates.
    pub fn components(&self, indicators: &IndicatorSet, price: f64, forecast: f64) -> SignalComponents {
        let IndicatorSet { current, previous } = indicators;
        let sma = |p: &IndicatorPoint| (p.sma_short, p.sma_long);
        let macd = |p: &IndicatorPoint| (p.macd, p.macd_signal);

        let momentum_score = if price > 0.0 { (forecast - price) / price } else { 0.0 };
        let reversion_score = if current.band_std > 0.0 && current.band_std.is_finite() {
            (current.band_middle - price) / current.band_std
        } else {
            0.0
        };

        SignalComponents {
            sma_cross_buy: crosses_above(sma(previous), sma(current)),
            sma_cross_sell: crosses_below(sma(previous), sma(current)),
            oscillator_buy: current.rsi < self.config.oversold,
            oscillator_sell: current.rsi > self.config.overbought,
            macd_buy: crosses_above(macd(previous), macd(current)),
            macd_sell: crosses_below(macd(previous), macd(current)),
            band_buy: price < current.band_lower,
            band_sell: price > current.band_upper,
            momentum_score: if momentum_score.is_finite() { momentum_score } else { 0.0 },
            reversion_score,
        }
    }

    /// Fuse the inputs into confidences and signals.
    pub fn fuse(&self, indicators: &IndicatorSet, price: f64, forecast: f64, sentiment: f64) -> FusedSignal {
        let c = self.components(indicators, price, forecast);
        let w = &self.config.weights;
        let sentiment_weight = if sentiment.is_finite() { sentiment.abs().min(1.0) } else { 0.0 };
        let scale = 1.0 + sentiment_weight;

        let buy_raw = weight_if(c.sma_cross_buy, w.crossover)
            + weight_if(c.oscillator_buy, w.oscillator)
            + weight_if(c.macd_buy, w.macd)
            + weight_if(c.band_buy, w.band)
            + weight_if(c.momentum_score > self.config.momentum_threshold, w.momentum)
            + weight_if(c.reversion_score > self.config.reversion_threshold, w.reversion);

        let sell_raw = weight_if(c.sma_cross_sell, w.crossover)
            + weight_if(c.oscillator_sell, w.oscillator)
            + weight_if(c.macd_sell, w.macd)
            + weight_if(c.band_sell, w.band)
            + weight_if(c.momentum_score < -self.config.momentum_threshold, w.momentum)
            + weight_if(c.reversion_score < -self.config.reversion_threshold, w.reversion);

        let buy_confidence = buy_raw * scale;
        let sell_confidence = sell_raw * scale;

        FusedSignal {
            components: c,
            sentiment_weight,
            buy_confidence,
            sell_confidence,
            buy_signal: buy_confidence > self.config.signal_threshold,
            sell_signal: sell_confidence > self.config.signal_threshold,
        }
    }
}
