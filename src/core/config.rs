use anyhow::{Context, Result, bail};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf, time::Duration};
use tracing::debug;

pub const DEFAULT_BASE: &str = "KRW";
pub const DEFAULT_SOURCE_URL: &str = "https://cdn.jsdelivr.net/npm/@fawazahmed0/currency-api";

pub const SUPABASE_URL_ENV: &str = "SUPABASE_URL";
pub const SUPABASE_KEY_ENV: &str = "SUPABASE_SERVICE_ROLE_KEY";

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct SourceConfig {
    pub base_url: String,
    pub timeout_secs: u64,
    pub rate_limit_retries: usize,
}

impl Default for SourceConfig {
    fn default() -> Self {
        SourceConfig {
            base_url: DEFAULT_SOURCE_URL.to_string(),
            timeout_secs: 30,
            rate_limit_retries: 2,
        }
    }
}

impl SourceConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct SupabaseConfig {
    pub url: Option<String>,
    pub service_role_key: Option<String>,
    pub history_table: String,
    pub latest_table: String,
}

impl Default for SupabaseConfig {
    fn default() -> Self {
        SupabaseConfig {
            url: None,
            service_role_key: None,
            history_table: "fx_history".to_string(),
            latest_table: "fx_latest_cache".to_string(),
        }
    }
}

impl SupabaseConfig {
    /// The project URL, if one is configured and non-blank.
    pub fn url(&self) -> Option<&str> {
        self.url.as_deref().filter(|url| !url.trim().is_empty())
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
#[serde(default)]
pub struct DiskConfig {
    pub path: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum StoreConfig {
    Supabase(SupabaseConfig),
    Disk(DiskConfig),
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig::Supabase(SupabaseConfig::default())
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct BackfillConfig {
    pub days: u32,
    pub chunk_size: usize,
    pub delay_ms: u64,
}

impl Default for BackfillConfig {
    fn default() -> Self {
        BackfillConfig {
            days: 365,
            chunk_size: 5,
            delay_ms: 500,
        }
    }
}

impl BackfillConfig {
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    #[serde(default = "default_base")]
    pub base: String,
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub backfill: BackfillConfig,
}

fn default_base() -> String {
    DEFAULT_BASE.to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            base: default_base(),
            source: SourceConfig::default(),
            store: StoreConfig::default(),
            backfill: BackfillConfig::default(),
        }
    }
}

impl AppConfig {
    /// Loads the config from the default location, or falls back to defaults
    /// when no file has been set up there.
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        if !config_path.exists() {
            debug!(path = %config_path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }
        Self::load_from_path(&config_path)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("dev", "fxseed", "fxseed")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    pub fn default_data_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("dev", "fxseed", "fxseed")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.data_dir().join("fx"))
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        debug!("Successfully loaded config");
        Ok(config)
    }

    /// Fills Supabase settings the file left unset from `lookup` (normally the
    /// process environment).
    pub fn apply_env_fallbacks<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let StoreConfig::Supabase(supabase) = &mut self.store {
            if supabase.url.is_none() {
                supabase.url = lookup(SUPABASE_URL_ENV).filter(|v| !v.is_empty());
            }
            if supabase.service_role_key.is_none() {
                supabase.service_role_key = lookup(SUPABASE_KEY_ENV).filter(|v| !v.is_empty());
            }
        }
    }

    /// Rejects configurations no run can start with.
    pub fn validate(&self) -> Result<()> {
        if self.base.is_empty() || !self.base.chars().all(|c| c.is_ascii_alphabetic()) {
            bail!("Invalid base currency code: {:?}", self.base);
        }
        if self.backfill.chunk_size == 0 {
            bail!("backfill.chunk_size must be at least 1");
        }
        if let StoreConfig::Supabase(supabase) = &self.store {
            if supabase
                .service_role_key
                .as_deref()
                .is_none_or(|key| key.trim().is_empty())
            {
                bail!("Missing {SUPABASE_KEY_ENV}: set it in the environment or under store.service_role_key");
            }
            if supabase.url().is_none() {
                bail!("Missing {SUPABASE_URL_ENV}: set it in the environment or under store.url");
            }
        }
        Ok(())
    }

    /// Directory of the local store, when `store.kind` is `disk`.
    pub fn disk_path(disk: &DiskConfig) -> Result<PathBuf> {
        match &disk.path {
            Some(path) => Ok(path.clone()),
            None => Self::default_data_path(),
        }
    }
}
