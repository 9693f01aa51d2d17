//! Configuration file handling
//!
//! Values are layered: defaults, then `config.toml`, then the
//! `SERVICE1_URL` / `SERVICE2_URL` / `SERVICE_TIMEOUT` environment
//! variables, then command-line flags.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use super::paths::config_path;
use super::{Error, Result};

/// Environment variable overriding the primary service URL
pub const ENV_PRIMARY_URL: &str = "SERVICE1_URL";
/// Environment variable overriding the secondary service URL
pub const ENV_SECONDARY_URL: &str = "SERVICE2_URL";
/// Environment variable overriding the per-call timeout
pub const ENV_TIMEOUT: &str = "SERVICE_TIMEOUT";

/// Main configuration structure
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Config {
    /// Base URLs of the services under test
    #[serde(default)]
    pub services: ServicesConfig,

    /// Timeout settings
    #[serde(default)]
    pub timeouts: Timeouts,
}

/// One of the two services under test
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Service {
    /// The user service ("Service 1")
    Primary,
    /// The processing/analytics service ("Service 2")
    Secondary,
}

impl Service {
    /// Human-readable label used in result names and messages
    pub fn label(&self) -> &'static str {
        match self {
            Service::Primary => "Service 1",
            Service::Secondary => "Service 2",
        }
    }
}

impl std::fmt::Display for Service {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Service base URLs
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServicesConfig {
    #[serde(default = "default_primary_url")]
    pub primary_url: String,

    #[serde(default = "default_secondary_url")]
    pub secondary_url: String,
}

impl Default for ServicesConfig {
    fn default() -> Self {
        Self {
            primary_url: default_primary_url(),
            secondary_url: default_secondary_url(),
        }
    }
}

impl ServicesConfig {
    /// Base URL for a service, without a trailing slash
    pub fn base_url(&self, service: Service) -> &str {
        let url = match service {
            Service::Primary => &self.primary_url,
            Service::Secondary => &self.secondary_url,
        };
        url.trim_end_matches('/')
    }
}

fn default_primary_url() -> String {
    "http://localhost:8000".to_string()
}
fn default_secondary_url() -> String {
    "http://localhost:8001".to_string()
}

/// Timeout settings in seconds
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Timeouts {
    /// Deadline applied to every probe call
    #[serde(default = "default_request")]
    pub request_secs: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            request_secs: default_request(),
        }
    }
}

fn default_request() -> u64 {
    10
}

/// Values supplied on the command line
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub primary_url: Option<String>,
    pub secondary_url: Option<String>,
    pub timeout_secs: Option<u64>,
}

impl Config {
    /// Load configuration from the default config file
    ///
    /// Returns default configuration if file doesn't exist
    pub fn load() -> Result<Self> {
        if let Some(path) = config_path() {
            if path.exists() {
                return Self::load_from(&path);
            }
        }
        Ok(Self::default())
    }

    /// Load configuration from an explicit file
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::file_read(path, e))?;
        let config: Self =
            toml::from_str(&content).map_err(|e| Error::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from the process environment
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_env_with(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary variable lookup
    pub fn apply_env_with<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_PRIMARY_URL) {
            self.services.primary_url = url;
        }
        if let Some(url) = lookup(ENV_SECONDARY_URL) {
            self.services.secondary_url = url;
        }
        if let Some(raw) = lookup(ENV_TIMEOUT) {
            self.timeouts.request_secs = raw.trim().parse().map_err(|_| {
                Error::Config(format!("{} must be a whole number of seconds, got '{}'", ENV_TIMEOUT, raw))
            })?;
        }
        self.validate()
    }

    /// Apply command-line overrides
    pub fn apply_overrides(&mut self, overrides: Overrides) -> Result<()> {
        if let Some(url) = overrides.primary_url {
            self.services.primary_url = url;
        }
        if let Some(url) = overrides.secondary_url {
            self.services.secondary_url = url;
        }
        if let Some(secs) = overrides.timeout_secs {
            self.timeouts.request_secs = secs;
        }
        self.validate()
    }

    /// Per-call deadline
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.timeouts.request_secs)
    }

    fn validate(&self) -> Result<()> {
        for (name, url) in [
            ("primary_url", &self.services.primary_url),
            ("secondary_url", &self.services.secondary_url),
        ] {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(Error::Config(format!(
                    "{} must be an http(s) URL, got '{}'",
                    name, url
                )));
            }
        }
        if self.timeouts.request_secs == 0 {
            return Err(Error::Config("request timeout must be at least 1 second".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.services.base_url(Service::Primary), "http://localhost:8000");
        assert_eq!(config.services.base_url(Service::Secondary), "http://localhost:8001");
        assert_eq!(config.request_timeout(), Duration::from_secs(10));
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: Config = toml::from_str("[timeouts]\nrequest_secs = 3\n").unwrap();
        assert_eq!(config.timeouts.request_secs, 3);
        assert_eq!(config.services.primary_url, "http://localhost:8000");
    }

    #[test]
    fn test_base_url_trims_trailing_slash() {
        let mut config = Config::default();
        config.services.primary_url = "http://users.internal:9000/".to_string();
        assert_eq!(config.services.base_url(Service::Primary), "http://users.internal:9000");
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [
            (ENV_PRIMARY_URL, "http://one:1"),
            (ENV_SECONDARY_URL, "http://two:2"),
            (ENV_TIMEOUT, "4"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config
            .apply_env_with(|k| vars.get(k).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.services.primary_url, "http://one:1");
        assert_eq!(config.services.secondary_url, "http://two:2");
        assert_eq!(config.timeouts.request_secs, 4);
    }

    #[test]
    fn test_invalid_env_timeout() {
        let mut config = Config::default();
        let err = config
            .apply_env_with(|k| (k == ENV_TIMEOUT).then(|| "soon".to_string()))
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_overrides_win_and_are_validated() {
        let mut config = Config::default();
        config
            .apply_overrides(Overrides {
                primary_url: Some("https://users.example".into()),
                secondary_url: None,
                timeout_secs: Some(2),
            })
            .unwrap();
        assert_eq!(config.services.primary_url, "https://users.example");
        assert_eq!(config.timeouts.request_secs, 2);

        let err = config
            .apply_overrides(Overrides {
                secondary_url: Some("localhost:8001".into()),
                ..Default::default()
            })
            .unwrap_err();
        assert!(err.to_string().contains("secondary_url"));
    }
}
