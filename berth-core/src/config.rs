//! Connection configuration
//!
//! Jobs read the daemon address, TLS policy and credentials through the
//! [`Configuration`] trait. Every method has the Docker default, so an empty
//! implementation talks to `http://localhost:2375`.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default remote host
pub const DEFAULT_HOST: &str = "localhost";

/// Default Docker daemon TCP port
pub const DEFAULT_PORT: u16 = 2375;

/// Errors raised while loading or validating a configuration
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// An environment variable holds a value that can not be parsed
    #[error("invalid value '{value}' for {var}")]
    InvalidValue { var: String, value: String },

    /// Host is empty
    #[error("host cannot be empty")]
    EmptyHost,

    /// Port is zero
    #[error("port must be greater than 0")]
    ZeroPort,
}

/// Read-only view on the settings used to reach the Docker daemon
pub trait Configuration: Send + Sync + std::fmt::Debug {
    /// Username for operations that require authentication
    fn username(&self) -> String {
        String::new()
    }

    /// Password for operations that require authentication
    fn password(&self) -> String {
        String::new()
    }

    /// Remote host name or address
    fn host(&self) -> String {
        DEFAULT_HOST.to_string()
    }

    /// Remote TCP port
    fn port(&self) -> u16 {
        DEFAULT_PORT
    }

    /// Use `https` instead of `http`
    fn use_ssl(&self) -> bool {
        false
    }

    /// Accept invalid TLS certificates
    fn ignore_ssl_errors(&self) -> bool {
        false
    }
}

/// Plain value configuration
///
/// Can be built in code, deserialized, or loaded from `BERTH_*` environment
/// variables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StaticConfiguration {
    pub host: String,
    pub port: u16,
    pub use_ssl: bool,
    pub ignore_ssl_errors: bool,
    pub username: String,
    pub password: String,
}

impl StaticConfiguration {
    /// Creates a configuration for the given host and port
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Self::default()
        }
    }

    /// Enables or disables TLS
    pub fn with_ssl(mut self, use_ssl: bool) -> Self {
        self.use_ssl = use_ssl;
        self
    }

    /// Accept invalid TLS certificates
    pub fn with_ignore_ssl_errors(mut self, ignore: bool) -> Self {
        self.ignore_ssl_errors = ignore;
        self
    }

    /// Sets the credentials
    pub fn with_credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = username.into();
        self.password = password.into();
        self
    }

    /// Creates configuration from environment variables
    ///
    /// Recognized environment variables (all optional):
    /// - BERTH_HOST (default: localhost)
    /// - BERTH_PORT (default: 2375)
    /// - BERTH_USE_SSL (default: false)
    /// - BERTH_IGNORE_SSL_ERRORS (default: false)
    /// - BERTH_USERNAME
    /// - BERTH_PASSWORD
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Creates configuration from an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(host) = lookup("BERTH_HOST") {
            config.host = host;
        }

        if let Some(port) = lookup("BERTH_PORT") {
            config.port = port.trim().parse().map_err(|_| ConfigError::InvalidValue {
                var: "BERTH_PORT".to_string(),
                value: port.clone(),
            })?;
        }

        if let Some(value) = lookup("BERTH_USE_SSL") {
            config.use_ssl = parse_flag("BERTH_USE_SSL", &value)?;
        }

        if let Some(value) = lookup("BERTH_IGNORE_SSL_ERRORS") {
            config.ignore_ssl_errors = parse_flag("BERTH_IGNORE_SSL_ERRORS", &value)?;
        }

        if let Some(username) = lookup("BERTH_USERNAME") {
            config.username = username;
        }

        if let Some(password) = lookup("BERTH_PASSWORD") {
            config.password = password;
        }

        Ok(config)
    }

    /// Validates the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.host.trim().is_empty() {
            return Err(ConfigError::EmptyHost);
        }

        if self.port == 0 {
            return Err(ConfigError::ZeroPort);
        }

        Ok(())
    }
}

impl Default for StaticConfiguration {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            use_ssl: false,
            ignore_ssl_errors: false,
            username: String::new(),
            password: String::new(),
        }
    }
}

impl Configuration for StaticConfiguration {
    fn username(&self) -> String {
        self.username.clone()
    }

    fn password(&self) -> String {
        self.password.clone()
    }

    fn host(&self) -> String {
        self.host.clone()
    }

    fn port(&self) -> u16 {
        self.port
    }

    fn use_ssl(&self) -> bool {
        self.use_ssl
    }

    fn ignore_ssl_errors(&self) -> bool {
        self.ignore_ssl_errors
    }
}

fn parse_flag(var: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            var: var.to_string(),
            value: value.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[derive(Debug)]
    struct Defaults;

    impl Configuration for Defaults {}

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_trait_defaults() {
        let config = Defaults;
        assert_eq!(config.host(), "localhost");
        assert_eq!(config.port(), 2375);
        assert!(!config.use_ssl());
        assert!(!config.ignore_ssl_errors());
        assert!(config.username().is_empty());
        assert!(config.password().is_empty());
    }

    #[test]
    fn test_default_config() {
        let config = StaticConfiguration::default();
        assert_eq!(config.host, DEFAULT_HOST);
        assert_eq!(config.port, DEFAULT_PORT);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = StaticConfiguration::default();

        config.host = String::new();
        assert_eq!(config.validate(), Err(ConfigError::EmptyHost));

        config.host = "docker.local".to_string();
        config.port = 0;
        assert_eq!(config.validate(), Err(ConfigError::ZeroPort));

        config.port = 2376;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder() {
        let config = StaticConfiguration::new("docker.local", 2376)
            .with_ssl(true)
            .with_ignore_ssl_errors(true)
            .with_credentials("alice", "secret");

        assert_eq!(config.host(), "docker.local");
        assert_eq!(config.port(), 2376);
        assert!(config.use_ssl());
        assert!(config.ignore_ssl_errors());
        assert_eq!(config.username(), "alice");
        assert_eq!(config.password(), "secret");
    }

    #[test]
    fn test_from_lookup() {
        let config = StaticConfiguration::from_lookup(lookup_from(&[
            ("BERTH_HOST", "10.0.0.5"),
            ("BERTH_PORT", "2376"),
            ("BERTH_USE_SSL", "true"),
        ]))
        .unwrap();

        assert_eq!(config.host, "10.0.0.5");
        assert_eq!(config.port, 2376);
        assert!(config.use_ssl);
        assert!(!config.ignore_ssl_errors);
    }

    #[test]
    fn test_from_lookup_empty_uses_defaults() {
        let config = StaticConfiguration::from_lookup(|_| None).unwrap();
        assert_eq!(config, StaticConfiguration::default());
    }

    #[test]
    fn test_from_lookup_invalid_port() {
        let err = StaticConfiguration::from_lookup(lookup_from(&[("BERTH_PORT", "docker")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref var, .. } if var == "BERTH_PORT"));
    }

    #[test]
    fn test_deserialize_partial() {
        let config: StaticConfiguration =
            serde_json::from_str(r#"{"host": "dockerd", "useSsl": true}"#).unwrap();
        assert_eq!(config.host, "dockerd");
        assert_eq!(config.port, DEFAULT_PORT);
        assert!(config.use_ssl);
    }
}
