//! Configuration management for Opsy.
//!
//! Handles loading configuration from a TOML file and resolving the SOP and
//! log directories.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Errors raised while loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The config file exists but could not be read.
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The config file is not valid TOML for [`Config`].
    #[error("invalid config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Base directory holding SOP markdown files
    pub sop_dir: PathBuf,

    /// Root directory for execution logs
    pub log_dir: PathBuf,

    /// Operator name recorded in logs
    pub executed_by: String,

    /// Per-step timeout in seconds
    pub timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        let home = Self::opsy_home();
        Self {
            sop_dir: home.join("sops"),
            log_dir: home.join("logs"),
            executed_by: current_user(),
            timeout_secs: 30,
        }
    }
}

impl Config {
    /// Load configuration.
    ///
    /// An explicit `path` must exist. Without one, `~/.opsy/config.toml` is
    /// used when present, and defaults otherwise.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = path {
            return Self::load_from_file(path);
        }

        let global = Self::opsy_home().join("config.toml");
        if global.exists() {
            return Self::load_from_file(&global);
        }

        Ok(Self::default())
    }

    /// Load configuration from a specific file.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::Read { path: path.to_path_buf(), source })?;
        let config = Self::from_toml(&content)
            .map_err(|source| ConfigError::Parse { path: path.to_path_buf(), source })?;

        tracing::debug!(path = %path.display(), "Loaded config");
        Ok(config)
    }

    /// Parse configuration from TOML text, expanding `~` in directories.
    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        let mut config: Self = toml::from_str(content)?;
        config.sop_dir = expand(&config.sop_dir);
        config.log_dir = expand(&config.log_dir);
        Ok(config)
    }

    /// Override the directories, e.g. from command line flags.
    #[must_use]
    pub fn with_overrides(mut self, sop_dir: Option<PathBuf>, log_dir: Option<PathBuf>) -> Self {
        if let Some(dir) = sop_dir {
            self.sop_dir = expand(&dir);
        }
        if let Some(dir) = log_dir {
            self.log_dir = expand(&dir);
        }
        self
    }

    /// Step timeout as a duration.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Create the log directory if needed.
    pub fn ensure_log_dir(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.log_dir)
    }

    /// The `~/.opsy` directory (`./.opsy` when no home directory is known).
    pub fn opsy_home() -> PathBuf {
        dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")).join(".opsy")
    }
}

fn current_user() -> String {
    std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .ok()
        .filter(|u| !u.is_empty())
        .unwrap_or_else(|| "user".to_string())
}

fn expand(path: &Path) -> PathBuf {
    match path.to_str() {
        Some(s) => PathBuf::from(shellexpand::tilde(s).into_owned()),
        None => path.to_path_buf(),
    }
}
