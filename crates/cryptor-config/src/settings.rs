//! Configuration structures.

use cryptor_backtest::BacktestConfig;
use cryptor_engine::{EngineConfig, ScheduleConfig};
use cryptor_strategy::SentimentConfig;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub app: AppSettings,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub schedule: ScheduleConfig,
    #[serde(default)]
    pub sentiment: SentimentConfig,
    #[serde(default)]
    pub backtest: BacktestConfig,
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), SettingsError> {
        self.engine
            .validate()
            .map_err(|e| SettingsError::Invalid(e.to_string()))?;
        self.sentiment.validate().map_err(SettingsError::Invalid)?;
        if self.schedule.cycle_interval_secs == 0 || self.schedule.retry_interval_secs == 0 {
            return Err(SettingsError::Invalid(
                "schedule intervals must be positive".to_string(),
            ));
        }
        if self.backtest.initial_balance <= Decimal::ZERO {
            return Err(SettingsError::Invalid(format!(
                "backtest initial_balance must be positive, got {}",
                self.backtest.initial_balance
            )));
        }
        if self.backtest.fee_rate < Decimal::ZERO {
            return Err(SettingsError::Invalid("backtest fee_rate is negative".to_string()));
        }
        match self.logging.format.as_str() {
            "pretty" | "json" => Ok(()),
            other => Err(SettingsError::Invalid(format!(
                "logging format must be pretty or json, got {}",
                other
            ))),
        }
    }
}

/// General app settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppSettings {
    pub name: String,
    pub environment: String,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            name: "cryptor".to_string(),
            environment: "development".to_string(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
    /// Daily-rolling log file
    pub file: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
            file: None,
        }
    }
}
