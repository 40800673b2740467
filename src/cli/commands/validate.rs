//! Validate configuration command.

use anyhow::Result;
use cryptor_config::load_config;
use std::path::Path;

pub async fn run(config_path: &Path) -> Result<()> {
    println!("Validating configuration: {:?}", config_path);

    match load_config(config_path) {
        Ok(config) => {
            println!("Configuration is valid!");
            println!();
            println!("App: {}", config.app.name);
            println!("Environment: {}", config.app.environment);
            println!("Log level: {}", config.logging.level);
            println!("Trade amount: {}", config.engine.trade_amount);
            println!("Timeframe: {} ({} bars)", config.engine.timeframe, config.engine.history_limit);
            println!(
                "Leverage: base {}x, range {}-{}x",
                config.engine.leverage.base, config.engine.leverage.min, config.engine.leverage.max
            );
            println!(
                "Stop loss / take profit: {} / {}",
                config.engine.protection.stop_loss_pct, config.engine.protection.take_profit_pct
            );
            println!("Fill policy: {:?}", config.engine.fill_policy);
            println!("Cycle interval: {}s", config.schedule.cycle_interval_secs);
        }
        Err(e) => {
            println!("Configuration error: {}", e);
            return Err(e.into());
        }
    }

    Ok(())
}
