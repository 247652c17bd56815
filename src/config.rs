//! Application configuration management.
//!
//! This module handles loading and saving the application configuration:
//! the backend base URL, the last used username, and the last used storage
//! partition id.
//!
//! Configuration is stored at `~/.config/fieldstock/config.json`. The base
//! URL can be overridden per-invocation with `FIELDSTOCK_API_URL`.

use std::path::PathBuf;

use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Application name used for config/cache directory paths
const APP_NAME: &str = "fieldstock";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Environment variable overriding the backend base URL
const API_URL_ENV: &str = "FIELDSTOCK_API_URL";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    pub api_url: Option<String>,
    pub last_username: Option<String>,
    pub last_partition: Option<String>,
}

impl Config {
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        if path.exists() {
            let contents = std::fs::read_to_string(&path)?;
            Ok(serde_json::from_str(&contents)?)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Resolve the backend base URL: env override, then config, then error.
    pub fn resolve_api_url(&self) -> Result<String> {
        if let Ok(url) = std::env::var(API_URL_ENV) {
            if !url.is_empty() {
                return Ok(url);
            }
        }
        self.api_url
            .clone()
            .ok_or_else(|| anyhow::anyhow!("No API URL configured. Set {} or api_url in config", API_URL_ENV))
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    pub fn cache_dir(&self) -> Result<PathBuf> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME))
    }
}
