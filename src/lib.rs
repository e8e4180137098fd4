pub mod backfill;
pub mod cli;
pub mod core;
pub mod providers;
pub mod store;

use crate::core::config::{AppConfig, BackfillConfig};
use crate::core::window::today_utc;
use anyhow::Result;
use chrono::NaiveDate;
use tracing::{debug, info};

/// Command-line adjustments to the `backfill` section of the config.
#[derive(Debug, Clone, Default)]
pub struct BackfillOverrides {
    pub days: Option<u32>,
    pub chunk_size: Option<usize>,
    pub delay_ms: Option<u64>,
    /// Reference date; the window ends the day before. Defaults to the UTC date.
    pub today: Option<NaiveDate>,
}

impl BackfillOverrides {
    fn apply(&self, config: &mut BackfillConfig) {
        if let Some(days) = self.days {
            config.days = days;
        }
        if let Some(chunk_size) = self.chunk_size {
            config.chunk_size = chunk_size;
        }
        if let Some(delay_ms) = self.delay_ms {
            config.delay_ms = delay_ms;
        }
    }
}

pub enum AppCommand {
    Backfill(BackfillOverrides),
    Latest,
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    info!("fxseed starting...");

    let mut config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    config.apply_env_fallbacks(|key| std::env::var(key).ok());
    if let AppCommand::Backfill(overrides) = &command {
        overrides.apply(&mut config.backfill);
    }
    config.validate()?;
    debug!(base = %config.base, days = config.backfill.days, "Loaded config");

    let source = providers::CurrencyApiProvider::from_config(&config)?;
    let store = store::open(&config)?;

    match command {
        AppCommand::Backfill(overrides) => {
            let today = overrides.today.unwrap_or_else(today_utc);
            cli::backfill::run(&config, today, &source, store.as_ref()).await
        }
        AppCommand::Latest => cli::latest::run(&config, &source, store.as_ref()).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overrides_replace_only_given_values() {
        let mut config = BackfillConfig::default();
        let overrides = BackfillOverrides {
            days: Some(7),
            delay_ms: Some(0),
            ..Default::default()
        };

        overrides.apply(&mut config);

        assert_eq!(config.days, 7);
        assert_eq!(config.chunk_size, 5);
        assert_eq!(config.delay_ms, 0);
    }
}
