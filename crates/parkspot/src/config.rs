//! Configuration management for parkspot.
//!
//! This module provides configuration loading and validation using figment,
//! supporting TOML config files, environment variables, and defaults.

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::photo::{DEFAULT_MAX_DIMENSION_PX, DEFAULT_QUALITY};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Default data directory name.
const DATA_DIR_NAME: &str = "parkspot";

/// Default database file name.
const DATABASE_FILE_NAME: &str = "parking.db";

/// Prefix for environment variable overrides.
const ENV_PREFIX: &str = "PARKSPOT_";

/// Application configuration.
///
/// Configuration is loaded from (in order of precedence, highest first):
/// 1. Environment variables (prefixed with `PARKSPOT_`, `__` between levels,
///    e.g. `PARKSPOT_LOCATION__TIMEOUT_MS`)
/// 2. TOML config file at `~/.config/parkspot/config.toml`
/// 3. Default values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Storage configuration.
    pub storage: StorageConfig,
    /// Position query configuration.
    pub location: LocationConfig,
    /// Photo compression configuration.
    pub photo: PhotoConfig,
    /// Notification configuration.
    pub notifications: NotificationConfig,
}

/// Storage-related configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Path to the database file.
    /// Defaults to `~/.local/share/parkspot/parking.db`
    pub database_path: Option<PathBuf>,
    /// Push every newly saved record onto the history, instead of pushing
    /// the record it replaces.
    pub record_current_in_history: bool,
}

/// Position query configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocationConfig {
    /// Ask for the most accurate fix available.
    pub high_accuracy: bool,
    /// Give up on a position query after this many milliseconds.
    pub timeout_ms: u64,
    /// Reuse a previous fix up to this old. 0 always asks for a new one.
    pub max_cache_age_ms: u64,
}

/// Photo compression configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhotoConfig {
    /// Bound for the longer side of stored photos, in pixels.
    pub max_dimension_px: u32,
    /// JPEG quality in (0, 1].
    pub quality: f32,
}

/// Notification configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationConfig {
    /// Show confirmation and reminder notifications.
    pub enabled: bool,
    /// Cancel the pending reminder when its record is deleted.
    pub cancel_reminder_on_delete: bool,
}

impl Default for LocationConfig {
    fn default() -> Self {
        Self {
            high_accuracy: true,
            timeout_ms: 10_000,
            max_cache_age_ms: 0,
        }
    }
}

impl Default for PhotoConfig {
    fn default() -> Self {
        Self {
            max_dimension_px: DEFAULT_MAX_DIMENSION_PX,
            quality: DEFAULT_QUALITY,
        }
    }
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            cancel_reminder_on_delete: true,
        }
    }
}

impl Config {
    /// Load configuration from all sources.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration with an optional custom config path.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        let config_file = config_path.unwrap_or_else(Self::default_config_path);

        let figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&config_file))
            .merge(Env::prefixed(ENV_PREFIX).split("__"));

        let config: Config = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default configuration file path.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(DATA_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    /// Get the default data directory path.
    #[must_use]
    pub fn default_data_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from(".local/share"))
            .join(DATA_DIR_NAME)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<()> {
        if self.location.timeout_ms == 0 {
            return Err(Error::ConfigValidation {
                message: "location.timeout_ms must be greater than 0".to_string(),
            });
        }

        if self.photo.max_dimension_px == 0 {
            return Err(Error::ConfigValidation {
                message: "photo.max_dimension_px must be greater than 0".to_string(),
            });
        }

        if !(self.photo.quality > 0.0 && self.photo.quality <= 1.0) {
            return Err(Error::ConfigValidation {
                message: format!(
                    "photo.quality must be in (0, 1], got {}",
                    self.photo.quality
                ),
            });
        }

        Ok(())
    }

    /// Get the database path, resolving defaults if not set.
    #[must_use]
    pub fn database_path(&self) -> PathBuf {
        self.storage
            .database_path
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join(DATABASE_FILE_NAME))
    }

    /// Get the position query timeout as a Duration.
    #[must_use]
    pub fn location_timeout(&self) -> Duration {
        Duration::from_millis(self.location.timeout_ms)
    }
}
