//! Configuration management.

mod file_config;

pub use file_config::{
    find_config_file, user_config_file, ConfigFile, ConfigFileError, DisambiguationConfig,
    LoggingConfig,
};

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::client::{ClientError, DEFAULT_USER_AGENT};
use crate::utils::{validate_base_url, RetryConfig, DEFAULT_BURST};

/// Production REST endpoint
pub const EUROPE_PMC_BASE_URL: &str = "https://www.ebi.ac.uk/europepmc/webservices/rest";

/// Test REST endpoint
pub const EUROPE_PMC_TEST_URL: &str = "https://www.ebi.ac.uk/europepmc/webservices/test/rest";

/// Prefix for environment variable overrides, e.g. `EUROPEPMC_CLIENT__BURST`
pub const ENV_PREFIX: &str = "EUROPEPMC";

/// Settings for one [`EuropePmcClient`](crate::EuropePmcClient)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Sustained request rate shared by all calls of one client
    #[serde(default = "default_requests_per_second")]
    pub requests_per_second: f64,

    /// Requests allowed back to back before the rate applies
    #[serde(default = "default_burst")]
    pub burst: u32,

    /// Per-request timeout
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    /// Total attempts per call, including the first
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay after the first failed attempt; doubles each retry
    #[serde(default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,

    #[serde(default = "default_max_backoff_secs")]
    pub max_backoff_secs: u64,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            requests_per_second: default_requests_per_second(),
            burst: default_burst(),
            timeout_secs: default_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
            max_attempts: default_max_attempts(),
            backoff_base_ms: default_backoff_base_ms(),
            max_backoff_secs: default_max_backoff_secs(),
            user_agent: default_user_agent(),
        }
    }
}

fn default_base_url() -> String {
    EUROPE_PMC_BASE_URL.to_string()
}

fn default_requests_per_second() -> f64 {
    10.0
}

fn default_burst() -> u32 {
    DEFAULT_BURST.get()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_max_attempts() -> u32 {
    3
}

fn default_backoff_base_ms() -> u64 {
    1000
}

fn default_max_backoff_secs() -> u64 {
    60
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

impl ClientConfig {
    /// Defaults pointed at the test endpoint
    pub fn test_api() -> Self {
        Self::default().base_url(EUROPE_PMC_TEST_URL)
    }

    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn requests_per_second(mut self, rate: f64) -> Self {
        self.requests_per_second = rate;
        self
    }

    pub fn burst(mut self, burst: u32) -> Self {
        self.burst = burst;
        self
    }

    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    pub fn backoff_base(mut self, delay: Duration) -> Self {
        self.backoff_base_ms = delay.as_millis().try_into().unwrap_or(u64::MAX);
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig::default()
            .max_attempts(self.max_attempts)
            .initial_delay(Duration::from_millis(self.backoff_base_ms))
            .max_delay(Duration::from_secs(self.max_backoff_secs))
    }

    /// Reject settings no client could run with
    pub fn validate(&self) -> Result<(), ClientError> {
        validate_base_url(&self.base_url)?;

        if !self.requests_per_second.is_finite() || self.requests_per_second <= 0.0 {
            return Err(ClientError::Config(format!(
                "requests_per_second must be positive, got {}",
                self.requests_per_second
            )));
        }
        if self.burst == 0 {
            return Err(ClientError::Config("burst must be at least 1".to_string()));
        }
        if self.max_attempts == 0 {
            return Err(ClientError::Config(
                "max_attempts must be at least 1".to_string(),
            ));
        }
        if self.timeout_secs == 0 {
            return Err(ClientError::Config(
                "timeout_secs must be at least 1".to_string(),
            ));
        }
        if self.user_agent.trim().is_empty() {
            return Err(ClientError::Config("user_agent must not be empty".to_string()));
        }

        Ok(())
    }
}

/// Load configuration from an optional file, then `EUROPEPMC_*` variables.
///
/// Nested keys use a double underscore: `EUROPEPMC_CLIENT__REQUESTS_PER_SECOND=5`.
pub fn load_config(path: Option<&Path>) -> Result<ConfigFile, config::ConfigError> {
    let mut builder = config::Config::builder();
    if let Some(path) = path {
        builder = builder.add_source(config::File::from(path));
    }

    let settings = builder
        .add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    settings.try_deserialize()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = ClientConfig::default();
        assert_eq!(config.base_url, EUROPE_PMC_BASE_URL);
        assert_eq!(config.requests_per_second, 10.0);
        assert_eq!(config.burst, 1);
        assert_eq!(config.timeout(), Duration::from_secs(30));
        assert_eq!(config.max_attempts, 3);
        assert!(config.validate().is_ok());

        let retry = config.retry_config();
        assert_eq!(retry.max_attempts, 3);
        assert_eq!(retry.initial_delay, Duration::from_secs(1));
        assert_eq!(retry.max_delay, Duration::from_secs(60));
    }

    #[test]
    fn test_test_api_endpoint() {
        assert_eq!(ClientConfig::test_api().base_url, EUROPE_PMC_TEST_URL);
    }

    #[test]
    fn test_invalid_configs() {
        let invalid = [
            ClientConfig::default().requests_per_second(0.0),
            ClientConfig::default().burst(0),
            ClientConfig::default().max_attempts(0),
            ClientConfig::default().timeout_secs(0),
            ClientConfig::default().base_url("ftp://example.org"),
            ClientConfig::default().user_agent(" "),
        ];
        for config in invalid {
            assert!(
                matches!(config.validate(), Err(ClientError::Config(_))),
                "{:?}",
                config
            );
        }
    }

    #[test]
    fn test_load_config_from_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("europepmc.toml");
        std::fs::write(
            &path,
            r#"
[client]
requests_per_second = 2.5
max_attempts = 5

[disambiguation]
default_threshold = 75
"#,
        )
        .unwrap();

        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.client.requests_per_second, 2.5);
        assert_eq!(config.client.max_attempts, 5);
        assert_eq!(config.client.burst, 1);
        assert_eq!(config.disambiguation.default_threshold, 75);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_load_config_missing_file() {
        let path = Path::new("/nonexistent/europepmc.toml");
        assert!(load_config(Some(path)).is_err());
    }
}
