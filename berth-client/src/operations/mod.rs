//! Docker API operations
//!
//! Each operation is a plain struct implementing
//! [`Operation`](berth_core::Operation). Construct one, set its fields and
//! hand it to a [`DockerJob`](crate::DockerJob) or to the matching
//! [`DockerClient`](crate::DockerClient) method.

mod containers;
mod exec;
mod images;
mod system;

pub use containers::{CreateContainer, ListContainers, RemoveContainer, StartContainer, StopContainer};
pub use exec::{CreateExecInstance, StartExecInstance};
pub use images::ListImages;
pub use system::GetVersion;

use std::borrow::Cow;

use berth_core::JobError;
use berth_core::validate::is_valid_detach_keys;

/// Turns a container or exec instance ID into a single URL path segment
///
/// IDs may be given as names with a leading slash, which is dropped. Every
/// other reserved character is percent-encoded, so `/` and `%` can not add
/// segments. `.` and `..` name no resource and yield an empty segment.
fn path_segment(id: &str) -> Cow<'_, str> {
    match id.strip_prefix('/').unwrap_or(id) {
        "." | ".." => Cow::Borrowed(""),
        id => urlencoding::encode(id),
    }
}

fn check_detach_keys(detach_keys: &str) -> Result<(), JobError> {
    if is_valid_detach_keys(detach_keys) {
        Ok(())
    } else {
        Err(JobError::invalid_input(
            "Invalid \"detachKeys\" parameter. Format is a single character a-Z or \"ctrl-<value>\" where <value> is one of: a-z, @, ^, [, _ or ,.",
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_segment() {
        assert_eq!(path_segment("/web"), "web");
        assert_eq!(path_segment("e90e34656806"), "e90e34656806");
        assert_eq!(path_segment("my_app.1-db"), "my_app.1-db");
        assert_eq!(path_segment("../images/nginx:latest"), "..%2Fimages%2Fnginx%3Alatest");
        assert_eq!(path_segment("%2e%2e"), "%252e%252e");
        assert_eq!(path_segment("web?force=1#x"), "web%3Fforce%3D1%23x");
        assert_eq!(path_segment(".."), "");
        assert_eq!(path_segment("/."), "");
        assert_eq!(path_segment("/"), "");
        assert_eq!(path_segment(""), "");
    }
}
