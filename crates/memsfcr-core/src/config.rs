//! Application configuration
//!
//! Settings are stored as pretty-printed JSON. Missing fields take their defaults so
//! older files keep loading as settings are added.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::diagnostics::DEFAULT_WINDOW_SIZE;
use crate::protocol::{DEFAULT_BAUD_RATE, DEFAULT_TIMEOUT_MS};

/// Name of the application folder under the home directory
pub const APP_FOLDER: &str = "memsfcr";

/// Errors from loading or saving configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Reading or writing the file
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed configuration
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Settings for connecting to and polling an ECU
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemsConfig {
    /// Serial port name, `loopback`, or a `.csv`/`.fcr` scenario
    pub connection: String,
    /// Serial speed
    pub baud_rate: u32,
    /// How long a read waits for the ECU
    pub read_timeout_ms: u64,
    /// Delay between dataframe polls
    pub poll_interval_ms: u64,
    /// Samples held by the diagnostics window
    pub window_size: usize,
    /// Where logs are written and relative scenario names are looked up
    pub log_folder: PathBuf,
    /// Write a CSV log while polling
    pub log_to_file: bool,
}

impl Default for MemsConfig {
    fn default() -> Self {
        Self {
            connection: "loopback".to_string(),
            baud_rate: DEFAULT_BAUD_RATE,
            read_timeout_ms: DEFAULT_TIMEOUT_MS,
            poll_interval_ms: 500,
            window_size: DEFAULT_WINDOW_SIZE,
            log_folder: default_log_folder(),
            log_to_file: true,
        }
    }
}

/// `~/memsfcr/logs`, or `./memsfcr/logs` when there is no home directory
pub fn default_log_folder() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_FOLDER)
        .join("logs")
}

/// `~/memsfcr/config.json`
pub fn default_config_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_FOLDER)
        .join("config.json")
}

impl MemsConfig {
    /// Load from a JSON file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path.as_ref())?;
        let mut config: MemsConfig = serde_json::from_str(&content)?;
        config.window_size = config.window_size.max(1);
        Ok(config)
    }

    /// Load from a JSON file, falling back to defaults if it is missing or unreadable
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        if !path.exists() {
            info!(path = %path.display(), "no configuration file, using defaults");
            return Self::default();
        }

        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(
                    path = %path.display(),
                    "unable to read configuration, using defaults: {}", e
                );
                Self::default()
            }
        }
    }

    /// Save as pretty JSON, creating the parent folder if needed
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        info!(path = %path.display(), "configuration saved");
        Ok(())
    }

    /// Resolve a scenario name: used as given when it exists, otherwise looked up in
    /// the log folder
    pub fn resolve_scenario_path(&self, name: &str) -> PathBuf {
        let given = PathBuf::from(name);
        if given.exists() || given.is_absolute() {
            given
        } else {
            self.log_folder.join(given)
        }
    }
}
