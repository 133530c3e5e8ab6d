//! Configuration handling for tsk
//!
//! Configuration is stored in `.tsk/config.toml` (tracker) and
//! `~/.config/tsk/config.toml` (global).

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::store::StoreOptions;

/// Name of the directory that marks a tracker root
pub const TSK_DIR: &str = ".tsk";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Failed to parse configuration: {0}")]
    Parse(String),
}

/// Tracker-level configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
    /// Fixed author for new tasks; skips git and $USER lookup
    pub author: Option<String>,

    /// Milliseconds a write waits on a competing writer
    pub busy_timeout_ms: u64,

    /// Default row limit for `tsk list` (0 = unlimited)
    pub list_limit: usize,

    /// Database file name inside `.tsk/`
    pub database: String,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            author: None,
            busy_timeout_ms: 5000,
            list_limit: 0,
            database: "tasks.db".to_string(),
        }
    }
}

impl ProjectConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let database = self.database.trim();
        if database.is_empty() {
            return Err(ConfigError::Invalid("database must not be empty".to_string()));
        }
        if Path::new(database).components().count() != 1 {
            return Err(ConfigError::Invalid(format!(
                "database must be a file name inside {}, got '{}'",
                TSK_DIR, self.database
            )));
        }
        Ok(())
    }

    pub fn store_options(&self) -> StoreOptions {
        StoreOptions {
            busy_timeout: Duration::from_millis(self.busy_timeout_ms),
        }
    }
}

/// Global user configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct GlobalConfig {
    /// Default output format (text or json)
    pub default_format: OutputFormat,
}

/// Output format for commands
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Combined configuration (global + tracker)
#[derive(Debug, Clone)]
pub struct Config {
    pub project: ProjectConfig,
    pub global: GlobalConfig,
}

impl Config {
    /// Loads configuration for a specific tracker
    pub fn for_project(project_root: &Path) -> Result<Self> {
        let global = Self::load_global()?;
        let project = Self::load_project_config(project_root)?;

        Ok(Self { project, global })
    }

    /// Returns the global config directory
    pub fn global_config_dir() -> Option<PathBuf> {
        ProjectDirs::from("dev", "tsk", "tsk").map(|dirs| dirs.config_dir().to_path_buf())
    }

    /// Loads global configuration
    pub fn load_global() -> Result<GlobalConfig> {
        let config_dir = match Self::global_config_dir() {
            Some(dir) => dir,
            None => return Ok(GlobalConfig::default()),
        };

        let config_path = config_dir.join("config.toml");
        if !config_path.exists() {
            return Ok(GlobalConfig::default());
        }

        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read global config: {}", config_path.display()))?;

        toml::from_str(&content)
            .map_err(|e| ConfigError::Parse(e.to_string()))
            .context("Failed to parse global config")
    }

    /// Loads tracker configuration from a specific root
    fn load_project_config(project_root: &Path) -> Result<ProjectConfig> {
        let config_path = project_root.join(TSK_DIR).join("config.toml");

        if !config_path.exists() {
            return Ok(ProjectConfig::default());
        }

        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read tracker config: {}", config_path.display()))?;

        Self::parse_project_config(&content).context("Failed to parse tracker config")
    }

    fn parse_project_config(content: &str) -> Result<ProjectConfig, ConfigError> {
        let config: ProjectConfig =
            toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Finds the tracker root by looking for `.tsk/` from the current directory up
    pub fn find_project_root() -> Option<PathBuf> {
        let current = std::env::current_dir().ok()?;
        Self::find_project_root_from(&current)
    }

    pub fn find_project_root_from(start: &Path) -> Option<PathBuf> {
        let mut current = start.to_path_buf();

        loop {
            if current.join(TSK_DIR).is_dir() {
                return Some(current);
            }

            if !current.pop() {
                return None;
            }
        }
    }
}
