//! Container operations

use berth_core::domain::IdResponse;
use berth_core::domain::container::ContainerSummary;
use berth_core::validate::{CONTAINER_NAME_PATTERN, is_valid_container_name};
use berth_core::{Description, ExpectedShape, JobError, Method, Operation, Payload, Query};
use serde_json::{Map, Value};

use super::{check_detach_keys, path_segment};
use crate::DockerClient;

// =============================================================================
// Listing
// =============================================================================

/// Lists containers
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ListContainers {
    /// Include stopped containers
    pub show_all: bool,
    /// Return at most this many recently created containers, 0 for no limit
    pub limit: u32,
    /// Include `SizeRw` and `SizeRootFs`
    pub show_size: bool,
}

impl Operation for ListContainers {
    fn method(&self) -> Method {
        Method::Get
    }

    fn expected_shape(&self) -> ExpectedShape {
        ExpectedShape::Array
    }

    fn build_path(&self, root: &str) -> String {
        format!("{}/containers/json", root)
    }

    fn build_query(&self, query: &mut Query) {
        query.push_flag("all", self.show_all);
        if self.limit > 0 {
            query.push("limit", self.limit.to_string());
        }
        query.push_flag("size", self.show_size);
    }

    fn describe(&self) -> Description {
        Description::new("Requesting list of containers")
    }
}

// =============================================================================
// Creation
// =============================================================================

/// Creates a container
///
/// `config` is sent verbatim as the request body and must at least contain
/// the `Image` to create the container from.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CreateContainer {
    /// Optional container name, sent as given
    pub name: String,
    pub config: Map<String, Value>,
}

impl CreateContainer {
    /// Creates the operation for `image` with an otherwise empty config
    pub fn new(image: impl Into<String>) -> Self {
        let mut config = Map::new();
        config.insert("Image".to_string(), Value::String(image.into()));
        Self {
            name: String::new(),
            config,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Image named in the config, empty if unset
    pub fn image(&self) -> &str {
        self.config
            .get("Image")
            .and_then(Value::as_str)
            .unwrap_or_default()
    }
}

impl Operation for CreateContainer {
    fn method(&self) -> Method {
        Method::Post
    }

    fn expected_shape(&self) -> ExpectedShape {
        ExpectedShape::Object
    }

    fn build_path(&self, root: &str) -> String {
        format!("{}/containers/create", root)
    }

    fn build_query(&self, query: &mut Query) {
        if !self.name.is_empty() {
            query.push("name", self.name.clone());
        }
    }

    fn build_payload(&self) -> Result<Option<Payload>, JobError> {
        Payload::json(&self.config).map(Some)
    }

    fn check_input(&self) -> Result<(), JobError> {
        if !is_valid_container_name(&self.name) {
            return Err(JobError::invalid_input(format!(
                "The name for the container is not valid. It has to match the following regular expression: {}",
                CONTAINER_NAME_PATTERN
            )));
        }

        if self.image().is_empty() {
            return Err(JobError::invalid_input(
                "The name of the image from which the container is to be created is missing.",
            ));
        }

        Ok(())
    }

    fn describe(&self) -> Description {
        let title = if self.name.is_empty() {
            "Creating new container".to_string()
        } else {
            format!("Creating new container {}", self.name)
        };
        Description::new(title).with_field("Image", self.image())
    }
}

// =============================================================================
// Lifecycle
// =============================================================================

/// Starts a container
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StartContainer {
    /// Container ID or name
    pub id: String,
    /// Key sequence for detaching, e.g. `ctrl-p,ctrl-q`
    pub detach_keys: String,
}

impl StartContainer {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            detach_keys: String::new(),
        }
    }
}

impl Operation for StartContainer {
    fn method(&self) -> Method {
        Method::Post
    }

    fn expected_shape(&self) -> ExpectedShape {
        ExpectedShape::None
    }

    fn build_path(&self, root: &str) -> String {
        format!("{}/containers/{}/start", root, path_segment(&self.id))
    }

    fn build_query(&self, query: &mut Query) {
        if !self.detach_keys.is_empty() {
            query.push("detachKeys", self.detach_keys.clone());
        }
    }

    fn check_input(&self) -> Result<(), JobError> {
        if path_segment(&self.id).is_empty() {
            return Err(JobError::invalid_input(
                "Can not start a container without a valid container ID.",
            ));
        }
        check_detach_keys(&self.detach_keys)
    }

    fn describe(&self) -> Description {
        Description::new(format!("Starting container with ID {}", self.id))
    }
}

/// Stops a container
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StopContainer {
    pub id: String,
    /// Seconds to wait before killing the container, 0 for the daemon default
    pub timeout: u32,
}

impl StopContainer {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            timeout: 0,
        }
    }
}

impl Operation for StopContainer {
    fn method(&self) -> Method {
        Method::Post
    }

    fn expected_shape(&self) -> ExpectedShape {
        ExpectedShape::None
    }

    fn build_path(&self, root: &str) -> String {
        format!("{}/containers/{}/stop", root, path_segment(&self.id))
    }

    fn build_query(&self, query: &mut Query) {
        if self.timeout > 0 {
            query.push("t", self.timeout.to_string());
        }
    }

    fn check_input(&self) -> Result<(), JobError> {
        if path_segment(&self.id).is_empty() {
            return Err(JobError::invalid_input(
                "Can not stop a container without a valid container ID.",
            ));
        }
        Ok(())
    }

    fn describe(&self) -> Description {
        Description::new(format!("Stopping container with ID {}", self.id))
    }
}

/// Removes a container
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemoveContainer {
    pub id: String,
    /// Also remove anonymous volumes of the container
    pub remove_anon_volumes: bool,
    /// Kill the container first if it is running
    pub force: bool,
    /// Remove the link instead of the container
    pub remove_links: bool,
}

impl RemoveContainer {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }
}

impl Operation for RemoveContainer {
    fn method(&self) -> Method {
        Method::Delete
    }

    fn expected_shape(&self) -> ExpectedShape {
        ExpectedShape::None
    }

    fn build_path(&self, root: &str) -> String {
        format!("{}/containers/{}", root, path_segment(&self.id))
    }

    fn build_query(&self, query: &mut Query) {
        query.push_flag("v", self.remove_anon_volumes);
        query.push_flag("force", self.force);
        query.push_flag("links", self.remove_links);
    }

    fn check_input(&self) -> Result<(), JobError> {
        if path_segment(&self.id).is_empty() {
            return Err(JobError::invalid_input(
                "Can not remove a container without a valid container ID.",
            ));
        }
        Ok(())
    }

    fn describe(&self) -> Description {
        Description::new(format!("Remove container with ID {}", self.id))
    }
}

impl DockerClient {
    /// List containers
    ///
    /// No matching containers yields an empty list.
    pub async fn list_containers(&self, op: ListContainers) -> Result<Vec<ContainerSummary>, JobError> {
        crate::into_records(self.run(op).await)
    }

    /// Create a container
    ///
    /// # Returns
    /// The ID of the new container and the warnings of the daemon
    ///
    /// # Example
    /// ```no_run
    /// # use berth_client::DockerClient;
    /// # use berth_client::operations::CreateContainer;
    /// # use berth_core::StaticConfiguration;
    /// # async fn example() -> anyhow::Result<()> {
    /// let client = DockerClient::new(StaticConfiguration::default());
    /// let created = client
    ///     .create_container(CreateContainer::new("nginx:latest").with_name("web"))
    ///     .await?;
    /// println!("Created container: {}", created.id);
    /// # Ok(())
    /// # }
    /// ```
    pub async fn create_container(&self, op: CreateContainer) -> Result<IdResponse, JobError> {
        let document = self.run(op).await?;
        crate::into_record(document)
    }

    /// Start a container
    pub async fn start_container(&self, op: StartContainer) -> Result<(), JobError> {
        self.run(op).await.map(|_| ())
    }

    /// Stop a container
    pub async fn stop_container(&self, op: StopContainer) -> Result<(), JobError> {
        self.run(op).await.map(|_| ())
    }

    /// Remove a container
    pub async fn remove_container(&self, op: RemoveContainer) -> Result<(), JobError> {
        self.run(op).await.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use berth_core::{API_ROOT, ErrorKind};

    fn query_of(op: &impl Operation) -> Query {
        let mut query = Query::new();
        op.build_query(&mut query);
        query
    }

    #[test]
    fn test_list_containers_query() {
        assert!(query_of(&ListContainers::default()).is_empty());

        let op = ListContainers {
            show_all: true,
            limit: 5,
            show_size: true,
        };
        let query = query_of(&op);
        assert_eq!(query.get("all"), Some("true"));
        assert_eq!(query.get("limit"), Some("5"));
        assert_eq!(query.get("size"), Some("true"));
        assert_eq!(op.build_path(API_ROOT), "/v1.40/containers/json");
    }

    #[test]
    fn test_create_container() {
        let op = CreateContainer::new("nginx:latest").with_name("/my-container");

        assert_eq!(op.method(), Method::Post);
        assert_eq!(op.build_path(API_ROOT), "/v1.40/containers/create");
        assert_eq!(query_of(&op).get("name"), Some("/my-container"));
        assert!(op.check_input().is_ok());

        let payload = op.build_payload().unwrap().unwrap();
        assert_eq!(payload.body, br#"{"Image":"nginx:latest"}"#.to_vec());
        assert_eq!(payload.content_type, "application/json");

        let desc = op.describe();
        assert_eq!(desc.title, "Creating new container /my-container");
        assert_eq!(desc.field, Some(("Image".to_string(), "nginx:latest".to_string())));
    }

    #[test]
    fn test_create_container_without_name() {
        let op = CreateContainer::new("nginx:latest");
        assert!(query_of(&op).is_empty());
        assert_eq!(op.describe().title, "Creating new container");
    }

    #[test]
    fn test_create_container_validation() {
        let err = CreateContainer::new("nginx")
            .with_name("//_kacke")
            .check_input()
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
        assert!(err.message().contains(CONTAINER_NAME_PATTERN));

        let err = CreateContainer::default().check_input().unwrap_err();
        assert_eq!(
            err.message(),
            "The name of the image from which the container is to be created is missing."
        );

        let mut op = CreateContainer::default();
        op.config.insert("Image".to_string(), Value::from(42));
        assert!(op.check_input().is_err());
    }

    #[test]
    fn test_start_container() {
        let mut op = StartContainer::new("/web");
        assert_eq!(op.build_path(API_ROOT), "/v1.40/containers/web/start");
        assert_eq!(
            StartContainer::new("web/../../images").build_path(API_ROOT),
            "/v1.40/containers/web%2F..%2F..%2Fimages/start"
        );
        assert!(StartContainer::new("..").check_input().is_err());
        assert_eq!(op.expected_shape(), ExpectedShape::None);
        assert!(query_of(&op).is_empty());
        assert!(op.check_input().is_ok());

        op.detach_keys = "ctrl-p,ctrl-q".to_string();
        assert_eq!(query_of(&op).get("detachKeys"), Some("ctrl-p,ctrl-q"));
        assert!(op.check_input().is_ok());

        op.detach_keys = "ctrl-!".to_string();
        assert_eq!(op.check_input().unwrap_err().kind(), ErrorKind::InvalidInput);

        let err = StartContainer::new("/").check_input().unwrap_err();
        assert_eq!(err.message(), "Can not start a container without a valid container ID.");
    }

    #[test]
    fn test_stop_container() {
        let mut op = StopContainer::new("web");
        assert_eq!(op.build_path(API_ROOT), "/v1.40/containers/web/stop");
        assert!(query_of(&op).is_empty());

        op.timeout = 10;
        assert_eq!(query_of(&op).get("t"), Some("10"));
        assert_eq!(op.describe().title, "Stopping container with ID web");

        assert!(StopContainer::default().check_input().is_err());
    }

    #[test]
    fn test_remove_container() {
        let op = RemoveContainer {
            id: "/web".to_string(),
            remove_anon_volumes: true,
            force: true,
            remove_links: false,
        };

        assert_eq!(op.method(), Method::Delete);
        assert_eq!(op.build_path(API_ROOT), "/v1.40/containers/web");

        let query = query_of(&op);
        assert_eq!(query.get("v"), Some("true"));
        assert_eq!(query.get("force"), Some("true"));
        assert_eq!(query.get("links"), None);

        assert!(op.check_input().is_ok());
        assert!(RemoveContainer::new("").check_input().is_err());
    }
}
