use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf};
use tracing::debug;

pub const DEFAULT_BCV_URL: &str = "https://www.bcv.org.ve";
pub const DEFAULT_BINANCE_URL: &str = "https://p2p.binance.com";
pub const DEFAULT_COINMARKETCAP_URL: &str = "https://pro-api.coinmarketcap.com";

const DEFAULT_FETCH_INTERVAL_MINUTES: u64 = 15;

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ProviderConfig {
    pub base_url: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ProvidersConfig {
    pub bcv: Option<ProviderConfig>,
    pub binance: Option<ProviderConfig>,
    pub coinmarketcap: Option<ProviderConfig>,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        ProvidersConfig {
            bcv: Some(ProviderConfig {
                base_url: DEFAULT_BCV_URL.to_string(),
            }),
            binance: Some(ProviderConfig {
                base_url: DEFAULT_BINANCE_URL.to_string(),
            }),
            coinmarketcap: Some(ProviderConfig {
                base_url: DEFAULT_COINMARKETCAP_URL.to_string(),
            }),
        }
    }
}

fn default_fetch_interval() -> u64 {
    DEFAULT_FETCH_INTERVAL_MINUTES
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    #[serde(default)]
    pub providers: ProvidersConfig,
    /// Watch-mode fetch period in minutes.
    #[serde(default = "default_fetch_interval")]
    pub fetch_interval_minutes: u64,
    /// Overrides the platform data directory (used by tests).
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            providers: ProvidersConfig::default(),
            fetch_interval_minutes: DEFAULT_FETCH_INTERVAL_MINUTES,
            data_dir: None,
        }
    }
}

impl AppConfig {
    /// Loads the default config file, or built-in defaults when none exists.
    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path()?;
        if !config_path.exists() {
            debug!("No config file at {}, using defaults", config_path.display());
            return Ok(Self::default());
        }
        Self::load_from_path(&config_path)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("in", "codito", "vesrates")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    pub fn default_data_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("in", "codito", "vesrates")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.data_dir().to_path_buf())
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        debug!("Successfully loaded config");
        Ok(config)
    }

    /// Resolved store location: explicit override, else the platform data dir.
    pub fn data_path(&self) -> Result<PathBuf> {
        match &self.data_dir {
            Some(dir) => Ok(dir.clone()),
            None => Ok(Self::default_data_path()?.join("store")),
        }
    }
}
