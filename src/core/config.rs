use crate::core::history::HistoryMetric;
use crate::core::portfolio::UnresolvedCostPolicy;
use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf};
use tracing::debug;

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct SteamProviderConfig {
    pub base_url: String,
    /// Two letter country code sent with every lookup.
    pub country: String,
    /// Numeric market currency code (6 = PLN).
    pub currency: u32,
    /// Market application id (730 = Counter-Strike).
    pub app_id: u32,
    pub timeout_secs: u64,
    pub retries: usize,
    pub retry_delay_ms: u64,
}

impl Default for SteamProviderConfig {
    fn default() -> Self {
        SteamProviderConfig {
            base_url: "https://steamcommunity.com".to_string(),
            country: "PL".to_string(),
            currency: 6,
            app_id: 730,
            timeout_secs: 5,
            retries: 2,
            retry_delay_ms: 500,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq, Eq)]
pub struct ProvidersConfig {
    #[serde(default)]
    pub steam: SteamProviderConfig,
}

fn default_cache_ttl_secs() -> u64 {
    300
}

fn default_max_concurrent_fetches() -> usize {
    1
}

fn default_currency_symbol() -> String {
    "zł".to_string()
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct AppConfig {
    #[serde(default)]
    pub providers: ProvidersConfig,
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
    #[serde(default = "default_max_concurrent_fetches")]
    pub max_concurrent_fetches: usize,
    #[serde(default)]
    pub unresolved_cost: UnresolvedCostPolicy,
    #[serde(default)]
    pub history_metric: HistoryMetric,
    #[serde(default = "default_currency_symbol")]
    pub currency_symbol: String,
    pub data_path: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            providers: ProvidersConfig::default(),
            cache_ttl_secs: default_cache_ttl_secs(),
            max_concurrent_fetches: default_max_concurrent_fetches(),
            unresolved_cost: UnresolvedCostPolicy::default(),
            history_metric: HistoryMetric::default(),
            currency_symbol: default_currency_symbol(),
            data_path: None,
        }
    }
}

impl AppConfig {
    /// Loads the config at the default location, falling back to defaults
    /// when no file has been written yet.
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        if !config_path.exists() {
            debug!(
                "No config at {}, using defaults",
                config_path.display()
            );
            return Ok(Self::default());
        }
        Self::load_from_path(&config_path)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("io", "skinfolio", "skinfolio")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    pub fn data_dir(&self) -> Result<PathBuf> {
        if let Some(custom_path) = &self.data_path {
            return Ok(PathBuf::from(custom_path));
        }
        let proj_dirs = ProjectDirs::from("io", "skinfolio", "skinfolio")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.data_dir().to_path_buf())
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        config.cache_ttl()?;
        debug!("Successfully loaded config");
        Ok(config)
    }

    pub fn cache_ttl(&self) -> Result<chrono::Duration> {
        i64::try_from(self.cache_ttl_secs)
            .ok()
            .and_then(chrono::Duration::try_seconds)
            .with_context(|| format!("cache_ttl_secs is out of range: {}", self.cache_ttl_secs))
    }
}
