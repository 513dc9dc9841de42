//! TOML Configuration Loading
//!
//! Resolves the configuration file, reads it and applies environment
//! overrides. The file is optional and never written.

use std::fs;
use std::path::{Path, PathBuf};

use crate::models::settings::AppConfig;
use crate::utils::error::{AppError, AppResult};

/// Application directory name under the platform config directory.
pub const APP_DIR_NAME: &str = "rule-pilot";

/// Configuration file name.
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Default config file path (`<config_dir>/rule-pilot/config.toml`)
pub fn default_config_path() -> AppResult<PathBuf> {
    dirs::config_dir()
        .map(|dir| dir.join(APP_DIR_NAME).join(CONFIG_FILE_NAME))
        .ok_or_else(|| AppError::config("Could not determine config directory"))
}

/// Loads configuration from disk and the environment.
#[derive(Debug)]
pub struct ConfigService {
    config_path: Option<PathBuf>,
    config: AppConfig,
}

impl ConfigService {
    /// Load configuration.
    ///
    /// An explicit path must exist. Without one, the default path is read
    /// when present and defaults are used otherwise. Environment overrides
    /// from the process environment are applied last.
    pub fn load(explicit_path: Option<&Path>) -> AppResult<Self> {
        Self::load_with_env(explicit_path, |key| std::env::var(key).ok())
    }

    /// Same as [`ConfigService::load`] with a custom environment lookup.
    pub fn load_with_env<F>(explicit_path: Option<&Path>, env: F) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let config_path = match explicit_path {
            Some(path) => {
                if !path.exists() {
                    return Err(AppError::config(format!(
                        "Config file not found: {}",
                        path.display()
                    )));
                }
                Some(path.to_path_buf())
            }
            None => default_config_path().ok().filter(|path| path.exists()),
        };

        let mut config = match &config_path {
            Some(path) => {
                tracing::debug!(path = %path.display(), "loading config file");
                Self::load_from_file(path)?
            }
            None => AppConfig::default(),
        };

        config.apply_env(env)?;
        config.validate().map_err(AppError::validation)?;

        Ok(Self {
            config_path,
            config,
        })
    }

    /// Load configuration from a file
    fn load_from_file(path: &Path) -> AppResult<AppConfig> {
        let content = fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Get the current configuration
    pub fn get_config(&self) -> &AppConfig {
        &self.config
    }

    /// Consume the service, keeping the configuration
    pub fn into_config(self) -> AppConfig {
        self.config
    }

    /// Path the configuration was read from, if any
    pub fn config_path(&self) -> Option<&Path> {
        self.config_path.as_deref()
    }
}
