//! Configuration module
//!
//! Handles CLI configuration: daemon connection settings and how jobs are run.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use berth_client::DockerClient;
use berth_core::StaticConfiguration;

/// CLI configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Connection settings for the Docker daemon
    pub docker: StaticConfiguration,
    /// Request timeout
    pub timeout: Duration,
    /// Start jobs in the background and print their notifications
    pub async_mode: bool,
}

impl Config {
    /// Validates the settings
    pub fn validate(&self) -> Result<()> {
        self.docker
            .validate()
            .context("Invalid Docker connection settings")
    }

    /// Creates a client for the configured daemon
    pub fn client(&self) -> DockerClient {
        DockerClient::with_configuration(Arc::new(self.docker.clone())).with_timeout(self.timeout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate() {
        let mut config = Config {
            docker: StaticConfiguration::default(),
            timeout: Duration::from_secs(300),
            async_mode: false,
        };
        assert!(config.validate().is_ok());

        config.docker.port = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_client_uses_settings() {
        let config = Config {
            docker: StaticConfiguration::new("dockerd", 2376),
            timeout: Duration::from_secs(5),
            async_mode: true,
        };

        let client = config.client();
        assert_eq!(client.configuration().host(), "dockerd");
    }
}
