//! Configuration loading and management
//!
//! Configuration is loaded from `~/.config/trackgate/config.toml`
//!
//! This module follows the XDG Base Directory Specification:
//! - Config: `$XDG_CONFIG_HOME/trackgate/` (~/.config/trackgate/)
//! - Data: `$XDG_DATA_HOME/trackgate/` (~/.local/share/trackgate/)
//! - State/Logs: `$XDG_STATE_HOME/trackgate/` (~/.local/state/trackgate/)

use crate::error::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Upper bound on the worker pool size
pub const MAX_WORKERS: usize = 32;

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

/// Returns XDG_DATA_HOME or ~/.local/share
fn xdg_data_home() -> PathBuf {
    std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".local/share"))
}

/// Returns XDG_STATE_HOME or ~/.local/state
fn xdg_state_home() -> PathBuf {
    std::env::var("XDG_STATE_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".local/state"))
}

/// Main configuration struct
#[derive(Debug, Deserialize, Default, Clone)]
pub struct Config {
    /// Tracker connection settings
    #[serde(default)]
    pub tracker: TrackerConfig,

    /// Background dispatch settings
    #[serde(default)]
    pub dispatch: DispatchConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Tracker connection settings
#[derive(Debug, Deserialize, Clone)]
pub struct TrackerConfig {
    /// Analytics account key (e.g. "UA-12345-1")
    pub tracking_key: Option<String>,

    /// Network timeout handed to the tracker when it starts
    #[serde(default = "default_network_timeout")]
    pub network_timeout_secs: u64,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            tracking_key: None,
            network_timeout_secs: default_network_timeout(),
        }
    }
}

impl TrackerConfig {
    pub fn network_timeout(&self) -> Duration {
        Duration::from_secs(self.network_timeout_secs)
    }
}

fn default_network_timeout() -> u64 {
    300
}

/// Background dispatch settings
#[derive(Debug, Deserialize, Clone)]
pub struct DispatchConfig {
    /// Initial state of the enable switch
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Hits that may wait in the queue before new ones are dropped
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Number of worker tasks draining the queue
    #[serde(default = "default_workers")]
    pub workers: usize,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            queue_capacity: default_queue_capacity(),
            workers: default_workers(),
        }
    }
}

impl DispatchConfig {
    /// Validate configuration, returning error message if invalid
    pub fn validate(&self) -> Result<()> {
        if self.queue_capacity == 0 {
            return Err(Error::Config(
                "dispatch.queue_capacity must be at least 1".to_string(),
            ));
        }
        if self.workers == 0 || self.workers > MAX_WORKERS {
            return Err(Error::Config(format!(
                "dispatch.workers must be between 1 and {}",
                MAX_WORKERS
            )));
        }
        Ok(())
    }
}

fn default_enabled() -> bool {
    true
}

fn default_queue_capacity() -> usize {
    256
}

fn default_workers() -> usize {
    2
}

/// Logging configuration
#[derive(Debug, Deserialize, Clone)]
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
    /// Load configuration from the default path
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        if !config_path.exists() {
            tracing::info!("No config file found at {:?}, using defaults", config_path);
            return Ok(Config::default());
        }

        Self::load_from(&config_path)
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read config file {:?}: {}", path, e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("failed to parse config: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Check every section for values the dispatcher cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.tracker.network_timeout_secs == 0 {
            return Err(Error::Config(
                "tracker.network_timeout_secs must be at least 1".to_string(),
            ));
        }
        self.dispatch.validate()
    }

    /// Returns the configured tracking key or a configuration error
    pub fn tracking_key(&self) -> Result<&str> {
        self.tracker
            .tracking_key
            .as_deref()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| Error::Config("tracker.tracking_key is not set".to_string()))
    }

    /// Returns the default config file path
    ///
    /// `$XDG_CONFIG_HOME/trackgate/config.toml` (~/.config/trackgate/config.toml)
    pub fn config_path() -> PathBuf {
        xdg_config_home().join("trackgate").join("config.toml")
    }

    /// Returns the data directory path (for the SQLite hit store)
    pub fn data_dir() -> PathBuf {
        xdg_data_home().join("trackgate")
    }

    /// Returns the state directory path (for logs)
    pub fn state_dir() -> PathBuf {
        xdg_state_home().join("trackgate")
    }

    /// Returns the database file path
    ///
    /// `$XDG_DATA_HOME/trackgate/hits.db` (~/.local/share/trackgate/hits.db)
    pub fn database_path() -> PathBuf {
        Self::data_dir().join("hits.db")
    }

    /// Returns the log file path
    pub fn log_path() -> PathBuf {
        Self::state_dir().join("trackgate.log")
    }

    /// Ensure XDG base directory environment variables are set.
    ///
    /// This is mainly for CLI binaries that want explicit, stable path behavior
    /// before invoking other components that read these env vars.
    pub fn ensure_xdg_env() {
        let home = home_dir();

        if std::env::var("XDG_DATA_HOME").is_err() {
            std::env::set_var("XDG_DATA_HOME", home.join(".local/share"));
        }

        if std::env::var("XDG_STATE_HOME").is_err() {
            std::env::set_var("XDG_STATE_HOME", home.join(".local/state"));
        }

        if std::env::var("XDG_CONFIG_HOME").is_err() {
            std::env::set_var("XDG_CONFIG_HOME", home.join(".config"));
        }
    }
}
