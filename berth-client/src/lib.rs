//! Berth Docker Engine client
//!
//! Runs Docker Engine API operations as observable, killable jobs.
//!
//! Every operation is a [`DockerJob`] that can be executed blocking with
//! `exec()`, spawned with `start()` or awaited through the [`DockerClient`]
//! convenience methods.
//!
//! # Example
//!
//! ```no_run
//! use berth_client::DockerClient;
//! use berth_client::operations::ListContainers;
//! use berth_core::StaticConfiguration;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = DockerClient::new(StaticConfiguration::new("localhost", 2375));
//!
//!     let containers = client
//!         .list_containers(ListContainers {
//!             show_all: true,
//!             ..Default::default()
//!         })
//!         .await?;
//!
//!     for container in containers {
//!         println!("{} {}", container.short_id(), container.status);
//!     }
//!     Ok(())
//! }
//! ```

mod job;
pub mod operations;
mod registry;
pub mod transport;

// Re-export commonly used types
pub use job::{DEFAULT_TIMEOUT, DockerJob};
pub use registry::Registry;
pub use transport::{ReqwestTransport, ReqwestTransportFactory, Transport, TransportFactory};

use std::sync::Arc;
use std::time::Duration;

use berth_core::domain::from_reply;
use berth_core::{Configuration, ErrorKind, Job, JobError, Operation};
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Client for the Docker Engine API
///
/// Holds the configuration shared by all jobs it creates. Every call runs
/// one [`DockerJob`] to completion.
#[derive(Debug, Clone)]
pub struct DockerClient {
    configuration: Arc<dyn Configuration>,
    registry: Arc<Registry>,
    timeout: Duration,
}

impl DockerClient {
    /// Create a new client
    ///
    /// # Example
    /// ```
    /// use berth_client::DockerClient;
    /// use berth_core::StaticConfiguration;
    ///
    /// let client = DockerClient::new(StaticConfiguration::new("localhost", 2375));
    /// ```
    pub fn new(configuration: impl Configuration + 'static) -> Self {
        Self::with_configuration(Arc::new(configuration))
    }

    /// Create a new client from a shared configuration
    pub fn with_configuration(configuration: Arc<dyn Configuration>) -> Self {
        Self {
            configuration,
            registry: Registry::global(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Use `registry` for transport factories instead of the global one
    pub fn with_registry(mut self, registry: Arc<Registry>) -> Self {
        self.registry = registry;
        self
    }

    /// Set the request timeout of created jobs
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn configuration(&self) -> &Arc<dyn Configuration> {
        &self.configuration
    }

    /// Create a job for `op` using this client's settings
    ///
    /// The job is not started.
    pub fn job<O: Operation>(&self, op: O) -> DockerJob<O> {
        DockerJob::new(op)
            .with_registry(self.registry.clone())
            .with_configuration(self.configuration.clone())
            .with_timeout(self.timeout)
    }

    /// Run `op` and return the reply document
    ///
    /// # Returns
    /// The parsed JSON reply for operations expecting one, `None` otherwise
    pub async fn run<O: Operation>(&self, op: O) -> Result<Option<Value>, JobError> {
        let mut job = self.job(op);
        job.run_until_finished().await;
        job.into_outcome()
    }
}

fn into_record<T: DeserializeOwned>(document: Option<Value>) -> Result<T, JobError> {
    match document {
        Some(document) => from_reply(document),
        None => Err(JobError::bare(ErrorKind::EmptyReply)),
    }
}

/// Like [`into_record`] for list replies, an empty list is not an error here
fn into_records<T: DeserializeOwned>(outcome: Result<Option<Value>, JobError>) -> Result<Vec<T>, JobError> {
    match outcome {
        Ok(document) => into_record(document),
        Err(e) if e.kind() == ErrorKind::EmptyJson => Ok(Vec::new()),
        Err(e) => Err(e),
    }
}
