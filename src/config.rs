//! Session configuration: HTTP timeouts, user agent, and proxy.
//!
//! Values default to the behavior an update client expects out of the box
//! (30s connect, 5min read, 30s preflight resolution). A JSON file may
//! override any subset of fields; missing fields keep their defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::download::constants::{
    CONNECT_TIMEOUT_SECS, READ_TIMEOUT_SECS, RESOLVE_TIMEOUT_SECS,
};

/// Accepted range for every timeout field, in seconds.
const TIMEOUT_RANGE_SECS: std::ops::RangeInclusive<u64> = 1..=3600;

/// Errors produced while loading or validating a [`SessionConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("failed to read config file {path}: {source}")]
    Read {
        /// Path of the config file.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The config file is not valid JSON or has unknown fields.
    #[error("failed to parse config: {source}")]
    Parse {
        /// The underlying deserialization error.
        #[source]
        source: serde_json::Error,
    },

    /// A timeout value is outside the accepted range.
    #[error("invalid config value for `{field}`: {value}. Expected range: 1..=3600")]
    InvalidTimeout {
        /// Name of the offending field.
        field: &'static str,
        /// The rejected value.
        value: u64,
    },

    /// The proxy value is not an absolute URL.
    #[error("invalid config value for `proxy`: {value}")]
    InvalidProxy {
        /// The rejected value.
        value: String,
    },
}

/// Configuration shared by download sessions and the destination resolver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SessionConfig {
    /// HTTP connect timeout for transfers and resolution, in seconds.
    pub connect_timeout_secs: u64,
    /// Longest idle gap between body reads during a transfer, in seconds.
    pub read_timeout_secs: u64,
    /// Upper bound on a preflight HEAD request, in seconds.
    pub resolve_timeout_secs: u64,
    /// Overrides the default User-Agent header.
    pub user_agent: Option<String>,
    /// Routes all traffic through this proxy URL.
    pub proxy: Option<String>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: CONNECT_TIMEOUT_SECS,
            read_timeout_secs: READ_TIMEOUT_SECS,
            resolve_timeout_secs: RESOLVE_TIMEOUT_SECS,
            user_agent: None,
            proxy: None,
        }
    }
}

impl SessionConfig {
    /// Loads and validates a config from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read, does not parse,
    /// or holds out-of-range values.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&raw)
    }

    /// Parses and validates a config from a JSON string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] on malformed input, or a validation
    /// error from [`validate`](Self::validate).
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(raw).map_err(|source| ConfigError::Parse { source })?;
        config.validate()?;
        Ok(config)
    }

    /// Checks timeouts and proxy against runtime constraints.
    ///
    /// # Errors
    ///
    /// Returns the first invalid field found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_timeout_secs("connect_timeout_secs", self.connect_timeout_secs)?;
        validate_timeout_secs("read_timeout_secs", self.read_timeout_secs)?;
        validate_timeout_secs("resolve_timeout_secs", self.resolve_timeout_secs)?;
        if let Some(proxy) = &self.proxy
            && Url::parse(proxy).is_err()
        {
            return Err(ConfigError::InvalidProxy {
                value: proxy.clone(),
            });
        }
        Ok(())
    }

    /// Connect timeout as a [`Duration`].
    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    /// Transfer timeout as a [`Duration`].
    #[must_use]
    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.read_timeout_secs)
    }

    /// Resolution timeout as a [`Duration`].
    #[must_use]
    pub fn resolve_timeout(&self) -> Duration {
        Duration::from_secs(self.resolve_timeout_secs)
    }
}

fn validate_timeout_secs(field: &'static str, value: u64) -> Result<(), ConfigError> {
    if TIMEOUT_RANGE_SECS.contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::InvalidTimeout { field, value })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_matches_constants() {
        let config = SessionConfig::default();
        assert_eq!(config.connect_timeout_secs, 30);
        assert_eq!(config.read_timeout_secs, 300);
        assert_eq!(config.resolve_timeout_secs, 30);
        assert!(config.user_agent.is_none());
        assert!(config.proxy.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = SessionConfig::from_json_str(r#"{ "resolve_timeout_secs": 5 }"#).unwrap();
        assert_eq!(config.resolve_timeout(), Duration::from_secs(5));
        assert_eq!(config.read_timeout_secs, 300);
    }

    #[test]
    fn test_unknown_field_is_rejected() {
        let result = SessionConfig::from_json_str(r#"{ "concurrency": 4 }"#);
        assert!(matches!(result, Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn test_zero_timeout_is_rejected() {
        let result = SessionConfig::from_json_str(r#"{ "connect_timeout_secs": 0 }"#);
        match result {
            Err(ConfigError::InvalidTimeout { field, value }) => {
                assert_eq!(field, "connect_timeout_secs");
                assert_eq!(value, 0);
            }
            other => panic!("expected InvalidTimeout, got {other:?}"),
        }
    }

    #[test]
    fn test_invalid_proxy_is_rejected() {
        let config = SessionConfig {
            proxy: Some("not a url".to_string()),
            ..SessionConfig::default()
        };
        let msg = config.validate().unwrap_err().to_string();
        assert!(msg.contains("proxy"), "Expected field name in: {msg}");
    }

    #[test]
    fn test_load_reads_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{ "user_agent": "custom/1.0" }"#).unwrap();

        let config = SessionConfig::load(&path).unwrap();
        assert_eq!(config.user_agent.as_deref(), Some("custom/1.0"));
    }

    #[test]
    fn test_load_missing_file_reports_path() {
        let result = SessionConfig::load(Path::new("/nonexistent/update-downloader.json"));
        let msg = result.unwrap_err().to_string();
        assert!(
            msg.contains("/nonexistent/update-downloader.json"),
            "Expected path in: {msg}"
        );
    }
}
