//! Request descriptors
//!
//! An [`Operation`] declares everything the engine needs to turn one Docker
//! API call into an HTTP request: method, path, query, headers, payload,
//! the expected reply shape and its own input validation.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::JobError;

/// Versioned root every request path starts with
pub const API_ROOT: &str = "/v1.40";

/// Header carrying base64 encoded registry credentials
pub const REGISTRY_AUTH_HEADER: &str = "X-Registry-Auth";

/// Request headers, ordered by name
pub type Headers = BTreeMap<String, String>;

/// HTTP method used by an operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Method {
    Head,
    Get,
    Put,
    Post,
    Delete,
}

impl Method {
    pub fn as_str(self) -> &'static str {
        match self {
            Method::Head => "HEAD",
            Method::Get => "GET",
            Method::Put => "PUT",
            Method::Post => "POST",
            Method::Delete => "DELETE",
        }
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of reply body an operation expects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExpectedShape {
    /// Body is ignored
    None,
    /// Non-empty JSON array
    Array,
    /// Non-empty JSON object
    Object,
}

impl ExpectedShape {
    pub fn expects_json(self) -> bool {
        !matches!(self, ExpectedShape::None)
    }
}

/// Request body together with its content type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payload {
    pub body: Vec<u8>,
    pub content_type: String,
}

impl Payload {
    pub fn new(body: impl Into<Vec<u8>>, content_type: impl Into<String>) -> Self {
        Self {
            body: body.into(),
            content_type: content_type.into(),
        }
    }

    /// Serializes `value` as compact JSON
    pub fn json<T: Serialize>(value: &T) -> Result<Self, JobError> {
        let body = serde_json::to_vec(value).map_err(|e| {
            JobError::invalid_input(format!("Failed to serialize request body: {}", e))
        })?;
        Ok(Self::new(body, "application/json"))
    }
}

/// Ordered list of query parameters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    items: Vec<(String, String)>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a parameter
    pub fn push(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.items.push((key.into(), value.into()));
    }

    /// Appends `key=true` when `flag` is set
    pub fn push_flag(&mut self, key: &str, flag: bool) {
        if flag {
            self.push(key, "true");
        }
    }

    /// First value stored for `key`
    pub fn get(&self, key: &str) -> Option<&str> {
        self.items
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.items.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Human readable description of a job, used for observability only
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Description {
    pub title: String,
    /// Optional `(name, value)` pair, e.g. `("ID", "4fa6e0f0")`
    pub field: Option<(String, String)>,
}

impl Description {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            field: None,
        }
    }

    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.field = Some((name.into(), value.into()));
        self
    }
}

impl std::fmt::Display for Description {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.field {
            Some((name, value)) => write!(f, "{} ({}: {})", self.title, name, value),
            None => f.write_str(&self.title),
        }
    }
}

/// Declarative contract of a single Docker API operation
///
/// The engine calls the `build_*` methods in order while assembling the
/// request; they must be free of side effects so that building twice yields
/// the same request. `check_input` runs after the generic checks (host and
/// credentials) and must reject anything the daemon would refuse.
pub trait Operation: Send + Sync + 'static {
    /// HTTP method of the request
    fn method(&self) -> Method;

    /// Expected reply body
    fn expected_shape(&self) -> ExpectedShape;

    /// Whether registry credentials have to be sent
    fn requires_auth(&self) -> bool {
        false
    }

    /// Full request path below `root`
    fn build_path(&self, root: &str) -> String;

    /// Adds operation specific query parameters
    fn build_query(&self, _query: &mut Query) {}

    /// Adds operation specific headers
    fn build_headers(&self, _headers: &mut Headers) {}

    /// Request body for write operations
    fn build_payload(&self) -> Result<Option<Payload>, JobError> {
        Ok(None)
    }

    /// Operation specific input validation
    fn check_input(&self) -> Result<(), JobError> {
        Ok(())
    }

    /// Title and optional field describing this operation
    fn describe(&self) -> Description;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_push_flag() {
        let mut query = Query::new();
        query.push_flag("all", false);
        assert!(query.is_empty());

        query.push_flag("all", true);
        query.push("limit", "5");
        assert_eq!(query.len(), 2);
        assert_eq!(query.get("all"), Some("true"));
        assert_eq!(query.get("limit"), Some("5"));
        assert_eq!(query.get("size"), None);
    }

    #[test]
    fn test_payload_json_is_compact() {
        let payload = Payload::json(&serde_json::json!({"Detach": false, "Tty": true})).unwrap();
        assert_eq!(payload.body, br#"{"Detach":false,"Tty":true}"#.to_vec());
        assert_eq!(payload.content_type, "application/json");
    }

    #[test]
    fn test_description_display() {
        let desc = Description::new("Starting execution instance.").with_field("ID", "abc");
        assert_eq!(desc.to_string(), "Starting execution instance. (ID: abc)");
        assert_eq!(Description::new("Requesting list of images").to_string(), "Requesting list of images");
    }

    #[test]
    fn test_method_names() {
        assert_eq!(Method::Delete.to_string(), "DELETE");
        assert!(ExpectedShape::Array.expects_json());
        assert!(!ExpectedShape::None.expects_json());
    }
}
