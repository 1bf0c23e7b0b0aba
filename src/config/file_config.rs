//! Configuration file support for the europepmc client.
//!
//! # Configuration File Format
//!
//! ```toml
//! [client]
//! base_url = "https://www.ebi.ac.uk/europepmc/webservices/rest"
//! requests_per_second = 10.0
//! burst = 1
//! timeout_secs = 30
//! max_attempts = 3
//! backoff_base_ms = 1000
//!
//! [disambiguation]
//! default_threshold = 80
//! initials_bonus = 10
//!
//! [logging]
//! level = "info"
//! format = "json"
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::ClientConfig;
use crate::utils::disambiguation::{DEFAULT_THRESHOLD, INITIALS_BONUS};

/// File searched for in the working directory
pub const LOCAL_CONFIG_FILE: &str = "europepmc.toml";

/// Configuration file structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub client: ClientConfig,

    #[serde(default)]
    pub disambiguation: DisambiguationConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Author matching settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisambiguationConfig {
    /// Threshold for offline matching when none is given
    #[serde(default = "default_threshold")]
    pub default_threshold: u8,

    #[serde(default = "default_initials_bonus")]
    pub initials_bonus: u8,
}

impl Default for DisambiguationConfig {
    fn default() -> Self {
        Self {
            default_threshold: default_threshold(),
            initials_bonus: default_initials_bonus(),
        }
    }
}

fn default_threshold() -> u8 {
    DEFAULT_THRESHOLD
}

fn default_initials_bonus() -> u8 {
    INITIALS_BONUS
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    /// `json` for structured output; anything else is human-readable
    #[serde(default)]
    pub format: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: None,
        }
    }
}

impl LoggingConfig {
    pub fn is_json(&self) -> bool {
        self.format
            .as_deref()
            .is_some_and(|format| format.eq_ignore_ascii_case("json"))
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl ConfigFile {
    /// Render as TOML, in the layout [`load_config`](super::load_config) reads
    pub fn to_toml(&self) -> Result<String, ConfigFileError> {
        toml::to_string_pretty(self).map_err(|e| ConfigFileError::Serialize(e.to_string()))
    }

    /// Save configuration to a TOML file, creating parent directories
    pub fn save(&self, path: &Path) -> Result<(), ConfigFileError> {
        let content = self.to_toml()?;

        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| ConfigFileError::Io(e.to_string()))?;
        }
        std::fs::write(path, content).map_err(|e| ConfigFileError::Io(e.to_string()))
    }
}

/// Locate a configuration file.
///
/// Checks `./europepmc.toml`, then `<config dir>/europepmc/config.toml`.
pub fn find_config_file() -> Option<PathBuf> {
    let local = PathBuf::from(LOCAL_CONFIG_FILE);
    if local.is_file() {
        return Some(local);
    }

    user_config_file().filter(|path| path.is_file())
}

/// `<config dir>/europepmc/config.toml`, whether or not it exists
pub fn user_config_file() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("europepmc").join("config.toml"))
}

/// Configuration file errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigFileError {
    #[error("IO error: {0}")]
    Io(String),

    #[error("Serialize error: {0}")]
    Serialize(String),
}
