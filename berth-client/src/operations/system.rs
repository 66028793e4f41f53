//! System operations

use berth_core::domain::version::Version;
use berth_core::{Description, ExpectedShape, JobError, Method, Operation};

use crate::DockerClient;

/// Requests version information of the daemon and its components
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GetVersion;

impl Operation for GetVersion {
    fn method(&self) -> Method {
        Method::Get
    }

    fn expected_shape(&self) -> ExpectedShape {
        ExpectedShape::Object
    }

    fn build_path(&self, root: &str) -> String {
        format!("{}/version", root)
    }

    fn describe(&self) -> Description {
        Description::new("Requesting version information")
    }
}

impl DockerClient {
    /// Get version information of the Docker daemon
    ///
    /// # Example
    /// ```no_run
    /// # use berth_client::DockerClient;
    /// # use berth_core::StaticConfiguration;
    /// # async fn example() -> anyhow::Result<()> {
    /// let client = DockerClient::new(StaticConfiguration::default());
    /// let version = client.version().await?;
    /// println!("Docker {} (API {})", version.version, version.api_version);
    /// # Ok(())
    /// # }
    /// ```
    pub async fn version(&self) -> Result<Version, JobError> {
        let document = self.run(GetVersion).await?;
        crate::into_record(document)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use berth_core::API_ROOT;

    #[test]
    fn test_get_version() {
        let op = GetVersion;
        assert_eq!(op.method(), Method::Get);
        assert_eq!(op.expected_shape(), ExpectedShape::Object);
        assert_eq!(op.build_path(API_ROOT), "/v1.40/version");
        assert!(op.check_input().is_ok());
        assert!(op.build_payload().unwrap().is_none());
        assert_eq!(op.describe().title, "Requesting version information");
    }
}
