//! Configuration loading and management
//!
//! Configuration is loaded from `~/.config/lexiscope/config.toml`, then
//! overridden by the `CLICKHOUSE_*` environment variables used by existing
//! deployments.
//!
//! This module follows the XDG Base Directory Specification:
//! - Config: `$XDG_CONFIG_HOME/lexiscope/` (~/.config/lexiscope/)
//! - State/Logs: `$XDG_STATE_HOME/lexiscope/` (~/.local/state/lexiscope/)

use crate::error::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Returns a best-effort home directory path.
fn home_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Returns XDG_CONFIG_HOME or ~/.config
fn xdg_config_home() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".config"))
}

/// Returns XDG_STATE_HOME or ~/.local/state
fn xdg_state_home() -> PathBuf {
    std::env::var("XDG_STATE_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".local/state"))
}

/// Main configuration struct
#[derive(Debug, Deserialize, Default)]
pub struct Config {
    /// Analytics store connection
    #[serde(default)]
    pub store: StoreConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Analytics store (ClickHouse HTTP interface) configuration
#[derive(Debug, Deserialize, Clone)]
pub struct StoreConfig {
    /// Base URL of the HTTP interface
    #[serde(default = "default_store_url")]
    pub url: String,

    /// Store user
    #[serde(default = "default_store_user")]
    pub user: String,

    /// Store password
    #[serde(default)]
    pub password: String,

    /// Database holding the `Word` and `Message` tables
    #[serde(default = "default_store_database")]
    pub database: String,

    /// Delay between connection handshakes while the store is unreachable
    #[serde(default = "default_retry_interval_ms")]
    pub retry_interval_ms: u64,

    /// HTTP client timeout in seconds
    #[serde(default = "default_store_timeout")]
    pub timeout_secs: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            url: default_store_url(),
            user: default_store_user(),
            password: String::new(),
            database: default_store_database(),
            retry_interval_ms: default_retry_interval_ms(),
            timeout_secs: default_store_timeout(),
        }
    }
}

fn default_store_url() -> String {
    "http://localhost:8123".to_string()
}

fn default_store_user() -> String {
    "default".to_string()
}

fn default_store_database() -> String {
    "VKM".to_string()
}

fn default_retry_interval_ms() -> u64 {
    1000
}

fn default_store_timeout() -> u64 {
    60
}

impl StoreConfig {
    /// Interval between handshake attempts
    pub fn retry_interval(&self) -> Duration {
        Duration::from_millis(self.retry_interval_ms)
    }

    /// Apply `CLICKHOUSE_HOST`, `CLICKHOUSE_USER`, `CLICKHOUSE_PASSWORD` and
    /// `CLICKHOUSE_DATABASE` overrides.
    ///
    /// `lookup` is the variable source, `std::env::var` in production.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("CLICKHOUSE_HOST") {
            self.url = url;
        }
        if let Some(user) = lookup("CLICKHOUSE_USER") {
            self.user = user;
        }
        if let Some(password) = lookup("CLICKHOUSE_PASSWORD") {
            self.password = password;
        }
        if let Some(database) = lookup("CLICKHOUSE_DATABASE") {
            self.database = database;
        }
    }

    /// Validate configuration, returning error message if invalid
    pub fn validate(&self) -> Result<()> {
        if self.url.trim().is_empty() {
            return Err(Error::Config("store.url must not be empty".to_string()));
        }
        if self.database.is_empty() {
            return Err(Error::Config(
                "store.database must not be empty".to_string(),
            ));
        }
        // The database name is rendered into bootstrap DDL.
        if !self
            .database
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            return Err(Error::Config(format!(
                "store.database must be a plain identifier, got {:?}",
                self.database
            )));
        }
        if self.retry_interval_ms == 0 {
            return Err(Error::Config(
                "store.retry_interval_ms must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Logging configuration
#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Maximum number of log files to keep
    #[serde(default = "default_max_log_files")]
    pub max_files: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            max_files: default_max_log_files(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_max_log_files() -> usize {
    5
}

impl Config {
    /// Load configuration from the default path, then apply env overrides
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        let mut config = if config_path.exists() {
            Self::load_from(&config_path)?
        } else {
            tracing::info!("No config file found at {:?}, using defaults", config_path);
            Config::default()
        };

        config
            .store
            .apply_env_overrides(|key| std::env::var(key).ok());
        config.store.validate()?;

        Ok(config)
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read config file {:?}: {}", path, e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("failed to parse config: {}", e)))?;

        Ok(config)
    }

    /// Returns the default config file path
    ///
    /// `$XDG_CONFIG_HOME/lexiscope/config.toml` (~/.config/lexiscope/config.toml)
    pub fn config_path() -> PathBuf {
        xdg_config_home().join("lexiscope").join("config.toml")
    }

    /// Returns the state directory path (for logs)
    ///
    /// `$XDG_STATE_HOME/lexiscope/` (~/.local/state/lexiscope/)
    pub fn state_dir() -> PathBuf {
        xdg_state_home().join("lexiscope")
    }

    /// Returns the log file path
    pub fn log_path() -> PathBuf {
        Self::state_dir().join("lexiscope.log")
    }
}
