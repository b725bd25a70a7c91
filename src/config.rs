//! Agent configuration.
//!
//! Resolution order: built-in defaults, then `config.json` in the user
//! config directory (if present), then `FLOWMON_*` environment variables.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default collector endpoint.
pub const DEFAULT_ENDPOINT: &str = "http://127.0.0.1:8000/biometric/";

/// Default local status server port.
pub const DEFAULT_STATUS_PORT: u16 = 13235;

/// Runtime settings for the telemetry agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Collector URL samples are POSTed to.
    pub endpoint: String,

    /// Aggregation cycle length in milliseconds.
    pub interval_ms: u64,

    /// Per-request timeout for the POST in milliseconds.
    pub request_timeout_ms: u64,

    /// Maximum concurrent POSTs, 0 for no limit.
    pub max_in_flight: usize,

    /// Port for the loopback status server.
    pub status_port: u16,

    /// Whether to start the status server at all.
    pub status_server: bool,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            interval_ms: 5000,
            request_timeout_ms: 3000,
            max_in_flight: 0,
            status_port: DEFAULT_STATUS_PORT,
            status_server: true,
        }
    }
}

impl AgentConfig {
    /// Loads the effective configuration for this user and process.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match default_config_path() {
            Some(path) if path.exists() => {
                tracing::info!(path = %path.display(), "Loading config file");
                Self::from_file(&path)?
            }
            _ => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Reads a JSON config file. Missing keys keep their defaults.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Applies `FLOWMON_*` overrides using `lookup` to read variables.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(endpoint) = lookup("FLOWMON_ENDPOINT") {
            self.endpoint = endpoint;
        }
        if let Some(raw) = lookup("FLOWMON_INTERVAL_MS") {
            self.interval_ms = parse_env("FLOWMON_INTERVAL_MS", &raw)?;
        }
        if let Some(raw) = lookup("FLOWMON_STATUS_PORT") {
            self.status_port = parse_env("FLOWMON_STATUS_PORT", &raw)?;
        }
        if let Some(raw) = lookup("FLOWMON_MAX_IN_FLIGHT") {
            self.max_in_flight = parse_env("FLOWMON_MAX_IN_FLIGHT", &raw)?;
        }
        Ok(())
    }

    /// Rejects settings the agent cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.interval_ms == 0 {
            return Err(ConfigError::Invalid {
                key: "interval_ms",
                reason: "must be greater than zero".to_string(),
            });
        }
        if !(self.endpoint.starts_with("http://") || self.endpoint.starts_with("https://")) {
            return Err(ConfigError::Invalid {
                key: "endpoint",
                reason: format!("expected an http(s) URL, got {:?}", self.endpoint),
            });
        }
        Ok(())
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

/// `<config dir>/flowmon/config.json`, e.g. `%APPDATA%\flowmon\config.json`.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("flowmon").join("config.json"))
}

fn parse_env<T: std::str::FromStr>(key: &'static str, raw: &str) -> Result<T, ConfigError> {
    raw.trim().parse().map_err(|_| ConfigError::Invalid {
        key,
        reason: format!("cannot parse {raw:?}"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = AgentConfig::default();
        assert_eq!(config.endpoint, DEFAULT_ENDPOINT);
        assert_eq!(config.interval(), Duration::from_secs(5));
        assert_eq!(config.max_in_flight, 0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config: AgentConfig = serde_json::from_str(r#"{"interval_ms": 1000}"#).unwrap();
        assert_eq!(config.interval_ms, 1000);
        assert_eq!(config.endpoint, DEFAULT_ENDPOINT);
        assert_eq!(config.status_port, DEFAULT_STATUS_PORT);
    }

    #[test]
    fn test_env_overrides() {
        let mut config = AgentConfig::default();
        config
            .apply_env(env(&[
                ("FLOWMON_ENDPOINT", "https://collector.local/ingest"),
                ("FLOWMON_INTERVAL_MS", "2500"),
                ("FLOWMON_MAX_IN_FLIGHT", " 4 "),
            ]))
            .unwrap();

        assert_eq!(config.endpoint, "https://collector.local/ingest");
        assert_eq!(config.interval_ms, 2500);
        assert_eq!(config.max_in_flight, 4);
        assert_eq!(config.status_port, DEFAULT_STATUS_PORT);
    }

    #[test]
    fn test_bad_env_value() {
        let mut config = AgentConfig::default();
        let err = config
            .apply_env(env(&[("FLOWMON_STATUS_PORT", "not-a-port")]))
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                key: "FLOWMON_STATUS_PORT",
                ..
            }
        ));
    }

    #[test]
    fn test_validate_rejects_zero_interval() {
        let config = AgentConfig {
            interval_ms: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_schemeless_endpoint() {
        let config = AgentConfig {
            endpoint: "127.0.0.1:8000/biometric/".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
