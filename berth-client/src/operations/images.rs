//! Image operations

use berth_core::domain::image::ImageSummary;
use berth_core::{Description, ExpectedShape, JobError, Method, Operation, Query};

use crate::DockerClient;

/// Lists images stored on the daemon
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ListImages {
    /// Include intermediate images
    pub show_all: bool,
    /// Include digest information
    pub show_digests: bool,
}

impl Operation for ListImages {
    fn method(&self) -> Method {
        Method::Get
    }

    fn expected_shape(&self) -> ExpectedShape {
        ExpectedShape::Array
    }

    fn build_path(&self, root: &str) -> String {
        format!("{}/images/json", root)
    }

    fn build_query(&self, query: &mut Query) {
        query.push_flag("all", self.show_all);
        query.push_flag("digests", self.show_digests);
    }

    fn describe(&self) -> Description {
        Description::new("Requesting list of images")
    }
}

impl DockerClient {
    /// List images
    ///
    /// An empty image store yields an empty list.
    ///
    /// # Arguments
    /// * `op` - Listing options
    pub async fn list_images(&self, op: ListImages) -> Result<Vec<ImageSummary>, JobError> {
        crate::into_records(self.run(op).await)
    }
}
