//! Configuration management.

mod settings;

pub use settings::{AppConfig, AppSettings, LoggingConfig, SettingsError};

use config::{Config, Environment, File};
use std::path::Path;

/// Load configuration from file and environment.
///
/// Environment variables prefixed `CRYPTOR` override file values, with `__`
/// between nested keys: `CRYPTOR__ENGINE__TRADE_AMOUNT=0.01`.
pub fn load_config(path: &Path) -> Result<AppConfig, SettingsError> {
    let config = Config::builder()
        .add_source(File::from(path).required(true))
        .add_source(
            Environment::with_prefix("CRYPTOR")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    let app: AppConfig = config.try_deserialize()?;
    app.validate()?;
    Ok(app)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cryptor_engine::FillPolicy;
    use rust_decimal_macros::dec;
    use std::path::PathBuf;

    fn write_temp(name: &str, contents: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("cryptor-{}-{}.toml", name, std::process::id()));
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let path = write_temp(
            "partial",
            r#"
[engine]
history_limit = 300
fill_policy = "optimistic"

[engine.leverage]
base = 3

[schedule]
cycle_interval_secs = 900
"#,
        );
        let config = load_config(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(config.engine.history_limit, 300);
        assert_eq!(config.engine.fill_policy, FillPolicy::Optimistic);
        assert_eq!(config.engine.leverage.base, 3);
        assert_eq!(config.engine.leverage.max, 20);
        assert_eq!(config.engine.protection.stop_loss_pct, dec!(0.02));
        assert_eq!(config.schedule.cycle_interval_secs, 900);
        assert_eq!(config.schedule.retry_interval_secs, 60);
        assert_eq!(config.sentiment.social_weight, 0.6);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let path = write_temp(
            "invalid",
            r#"
[engine.leverage]
min = 10
max = 2
"#,
        );
        let result = load_config(&path);
        std::fs::remove_file(&path).ok();
        assert!(matches!(result, Err(SettingsError::Invalid(_))));
    }

    #[test]
    fn test_missing_file() {
        let result = load_config(Path::new("/nonexistent/cryptor.toml"));
        assert!(matches!(result, Err(SettingsError::Load(_))));
    }

    #[test]
    fn test_shipped_default_file_is_valid() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../config/default.toml");
        let config = load_config(&path).unwrap();
        assert_eq!(config.engine, cryptor_engine::EngineConfig::default());
        assert_eq!(config.app.name, "cryptor");
    }
}
