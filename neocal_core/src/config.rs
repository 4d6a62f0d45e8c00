//! Configuration file support for neocal.
//!
//! Configuration is loaded from `$XDG_CONFIG_HOME/neocal/config.toml`.
//! Clinical thresholds are not configured here; they live in settings
//! profiles (see [`crate::profiles`]).

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const APP_DIR: &str = "neocal";
const RECORDS_FILE: &str = "records.jsonl";
const PROFILES_FILE: &str = "profiles.json";

/// Application configuration
#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub data: DataConfig,

    #[serde(default)]
    pub sync: SyncConfig,
}

/// Data storage configuration
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct DataConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

/// Connectivity configuration.
///
/// When `online` is false every new record is flagged for reconciliation.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct SyncConfig {
    #[serde(default = "default_online")]
    pub online: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            online: default_online(),
        }
    }
}

fn home_fallback(rest: &str) -> PathBuf {
    base_under(std::env::var_os("HOME").map(PathBuf::from), rest)
}

/// `rest` under `home`, or under the working directory without one
fn base_under(home: Option<PathBuf>, rest: &str) -> PathBuf {
    home.unwrap_or_else(|| PathBuf::from(".")).join(rest)
}

fn default_data_dir() -> PathBuf {
    let base = dirs::data_local_dir().unwrap_or_else(|| home_fallback(".local/share"));
    base.join(APP_DIR)
}

fn default_online() -> bool {
    true
}

impl Config {
    /// Load configuration from the standard config path
    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path();
        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            tracing::info!("No config file found at {:?}, using defaults", config_path);
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        tracing::info!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        let base = dirs::config_dir().unwrap_or_else(|| home_fallback(".config"));
        base.join(APP_DIR).join("config.toml")
    }

    /// Save the current configuration to the default path
    pub fn save(&self) -> Result<()> {
        let config_path = Self::default_config_path();
        self.save_to(&config_path)
    }

    /// Save the current configuration to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, contents)?;
        tracing::info!("Saved config to {:?}", path);
        Ok(())
    }

    /// Calculation history file
    pub fn records_path(&self) -> PathBuf {
        self.data.data_dir.join(RECORDS_FILE)
    }

    /// Settings profile file
    pub fn profiles_path(&self) -> PathBuf {
        self.data.data_dir.join(PROFILES_FILE)
    }
}
