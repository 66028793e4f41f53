//! Exec operations

use berth_core::domain::IdResponse;
use berth_core::{Description, ExpectedShape, JobError, Method, Operation, Payload};
use serde::Serialize;

use super::{check_detach_keys, path_segment};
use crate::DockerClient;

/// Creates an execution instance in a running container
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct CreateExecInstance {
    /// Container ID or name
    #[serde(skip)]
    pub id: String,
    pub attach_stdin: bool,
    pub attach_stdout: bool,
    pub attach_stderr: bool,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub detach_keys: String,
    pub tty: bool,
    /// Environment in `NAME=value` form
    pub env: Vec<String>,
    /// Command and arguments
    pub cmd: Vec<String>,
    pub privileged: bool,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub user: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub working_dir: String,
}

impl CreateExecInstance {
    pub fn new(id: impl Into<String>, cmd: Vec<String>) -> Self {
        Self {
            id: id.into(),
            cmd,
            ..Self::default()
        }
    }

    /// Adds a raw `NAME=value` entry
    pub fn add_env(&mut self, entry: impl Into<String>) {
        self.env.push(entry.into());
    }

    /// Sets `name` to `value`, replacing a previous value
    pub fn add_env_pair(&mut self, name: &str, value: &str) {
        self.remove_env(name);
        self.env.push(format!("{}={}", name, value));
    }

    /// Removes every entry for `name`
    pub fn remove_env(&mut self, name: &str) {
        self.env.retain(|entry| {
            let key = entry.split_once('=').map_or(entry.as_str(), |(key, _)| key);
            key != name
        });
    }
}

impl Operation for CreateExecInstance {
    fn method(&self) -> Method {
        Method::Post
    }

    fn expected_shape(&self) -> ExpectedShape {
        ExpectedShape::Object
    }

    fn build_path(&self, root: &str) -> String {
        format!("{}/containers/{}/exec", root, path_segment(&self.id))
    }

    fn build_payload(&self) -> Result<Option<Payload>, JobError> {
        Payload::json(self).map(Some)
    }

    fn check_input(&self) -> Result<(), JobError> {
        if path_segment(&self.id).is_empty() {
            return Err(JobError::invalid_input(
                "Can not create a new execution instance without a valid container ID.",
            ));
        }

        check_detach_keys(&self.detach_keys)?;

        if self.cmd.is_empty() {
            return Err(JobError::invalid_input(
                "Can not create a new execution instance without any command to execute.",
            ));
        }

        Ok(())
    }

    fn describe(&self) -> Description {
        Description::new(format!(
            "Creating new execution instance for container {}",
            self.id
        ))
    }
}

/// Starts a previously created execution instance
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StartExecInstance {
    /// Execution instance ID
    pub id: String,
    pub detach: bool,
    pub tty: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct StartExecBody {
    detach: bool,
    tty: bool,
}

impl StartExecInstance {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }
}

impl Operation for StartExecInstance {
    fn method(&self) -> Method {
        Method::Post
    }

    fn expected_shape(&self) -> ExpectedShape {
        ExpectedShape::None
    }

    fn build_path(&self, root: &str) -> String {
        format!("{}/exec/{}/start", root, path_segment(&self.id))
    }

    fn build_payload(&self) -> Result<Option<Payload>, JobError> {
        let body = StartExecBody {
            detach: self.detach,
            tty: self.tty,
        };
        Payload::json(&body).map(Some)
    }

    fn check_input(&self) -> Result<(), JobError> {
        if path_segment(&self.id).is_empty() {
            return Err(JobError::invalid_input("Missing execution instance ID to start."));
        }
        Ok(())
    }

    fn describe(&self) -> Description {
        Description::new("Starting execution instance.").with_field("ID", self.id.clone())
    }
}

impl DockerClient {
    /// Create an execution instance
    ///
    /// # Returns
    /// The ID of the new execution instance
    pub async fn create_exec_instance(&self, op: CreateExecInstance) -> Result<IdResponse, JobError> {
        let document = self.run(op).await?;
        crate::into_record(document)
    }

    /// Start an execution instance
    pub async fn start_exec_instance(&self, op: StartExecInstance) -> Result<(), JobError> {
        self.run(op).await.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use berth_core::{API_ROOT, ErrorKind};
    use serde_json::{Value, json};

    fn body_of(op: &impl Operation) -> Value {
        let payload = op.build_payload().unwrap().unwrap();
        serde_json::from_slice(&payload.body).unwrap()
    }

    #[test]
    fn test_create_exec_body() {
        let mut op = CreateExecInstance::new("/web", vec!["ls".to_string(), "-l".to_string()]);
        op.attach_stdout = true;
        op.add_env_pair("TERM", "xterm");

        assert_eq!(op.build_path(API_ROOT), "/v1.40/containers/web/exec");
        assert_eq!(
            body_of(&op),
            json!({
                "AttachStdin": false,
                "AttachStdout": true,
                "AttachStderr": false,
                "Tty": false,
                "Env": ["TERM=xterm"],
                "Cmd": ["ls", "-l"],
                "Privileged": false
            })
        );

        op.user = "root".to_string();
        op.working_dir = "/srv".to_string();
        op.detach_keys = "ctrl-x".to_string();
        let body = body_of(&op);
        assert_eq!(body["User"], "root");
        assert_eq!(body["WorkingDir"], "/srv");
        assert_eq!(body["DetachKeys"], "ctrl-x");
        assert!(body.get("Id").is_none());
    }

    #[test]
    fn test_env_helpers() {
        let mut op = CreateExecInstance::default();
        op.add_env("A=1");
        op.add_env_pair("B", "2");
        op.add_env_pair("A", "3");
        assert_eq!(op.env, vec!["B=2", "A=3"]);

        op.add_env("FLAG");
        op.remove_env("FLAG");
        op.remove_env("B");
        assert_eq!(op.env, vec!["A=3"]);
    }

    #[test]
    fn test_create_exec_validation() {
        let err = CreateExecInstance::new("", vec!["ls".to_string()])
            .check_input()
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);

        let err = CreateExecInstance::new("web", Vec::new()).check_input().unwrap_err();
        assert_eq!(
            err.message(),
            "Can not create a new execution instance without any command to execute."
        );

        let mut op = CreateExecInstance::new("web", vec!["sh".to_string()]);
        op.detach_keys = "a,".to_string();
        assert!(op.check_input().is_err());

        op.detach_keys = "ctrl-p,ctrl-q".to_string();
        assert!(op.check_input().is_ok());
    }

    #[test]
    fn test_start_exec() {
        let op = StartExecInstance {
            id: "f90e34656806".to_string(),
            detach: true,
            tty: false,
        };

        assert_eq!(op.build_path(API_ROOT), "/v1.40/exec/f90e34656806/start");
        assert_eq!(op.expected_shape(), ExpectedShape::None);
        assert_eq!(body_of(&op), json!({"Detach": true, "Tty": false}));

        let desc = op.describe();
        assert_eq!(desc.title, "Starting execution instance.");
        assert_eq!(desc.field, Some(("ID".to_string(), "f90e34656806".to_string())));

        assert!(StartExecInstance::default().check_input().is_err());
        assert!(StartExecInstance::new("..").check_input().is_err());
        assert_eq!(
            StartExecInstance::new("/../../containers/web/kill").build_path(API_ROOT),
            "/v1.40/exec/..%2F..%2Fcontainers%2Fweb%2Fkill/start"
        );
    }
}
