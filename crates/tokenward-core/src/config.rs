//! Application configuration management.
//!
//! This module handles loading and saving the client configuration: the API
//! base URL, refresh period, optional request deadline, logout behaviour,
//! session directory, and the last used username.
//!
//! Configuration is stored at `~/.config/tokenward/config.json`. The base URL
//! can be overridden with the `TOKENWARD_API_URL` environment variable.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::api::ApiClient;
use crate::auth::{SessionOptions, DEFAULT_REFRESH_INTERVAL};

/// Application name used for config/state directory paths
const APP_NAME: &str = "tokenward";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Environment variable overriding `api_url`
pub const API_URL_ENV: &str = "TOKENWARD_API_URL";

/// Backend used when nothing else is configured
pub const DEFAULT_API_URL: &str = "http://localhost:8000";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_url: String,
    pub refresh_interval_secs: u64,
    /// Per-request deadline; unset means requests wait indefinitely.
    pub request_timeout_secs: Option<u64>,
    pub clear_user_on_logout: bool,
    pub last_username: Option<String>,
    /// Where session.json lives; defaults to the platform data directory.
    pub state_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            refresh_interval_secs: DEFAULT_REFRESH_INTERVAL.as_secs(),
            request_timeout_secs: None,
            clear_user_on_logout: false,
            last_username: None,
            state_dir: None,
        }
    }
}

impl Config {
    /// Load from the default location, then apply environment overrides
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from(&Self::config_path()?)?;
        config.apply_api_url_override(std::env::var(API_URL_ENV).ok());
        Ok(config)
    }

    /// Load from an explicit path; a missing file yields defaults
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse config file {}", path.display()))
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Replace `api_url` with a non-empty override
    pub fn apply_api_url_override(&mut self, value: Option<String>) {
        if let Some(url) = value.filter(|u| !u.trim().is_empty()) {
            self.api_url = url.trim().to_string();
        }
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    /// Directory holding the persisted session
    pub fn state_dir(&self) -> Result<PathBuf> {
        if let Some(ref dir) = self.state_dir {
            return Ok(dir.clone());
        }
        let data_dir = dirs::data_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find data directory"))?;
        Ok(data_dir.join(APP_NAME))
    }

    pub fn api_client(&self) -> Result<ApiClient> {
        match self.request_timeout_secs {
            Some(secs) => ApiClient::with_timeout(&self.api_url, Duration::from_secs(secs)),
            None => ApiClient::new(&self.api_url),
        }
    }

    pub fn session_options(&self) -> SessionOptions {
        SessionOptions {
            refresh_interval: Duration::from_secs(self.refresh_interval_secs),
            clear_user_on_logout: self.clear_user_on_logout,
        }
    }
}
