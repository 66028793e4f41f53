//! Docker domain records
//!
//! Typed views on the JSON documents returned by the daemon. Unknown
//! fields are ignored and missing ones fall back to their defaults, so the
//! records stay usable across API versions.

pub mod container;
pub mod image;
pub mod version;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ErrorKind, JobError};

/// Reply of endpoints that create an object
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct IdResponse {
    pub id: String,
    pub warnings: Option<Vec<String>>,
}

/// Converts a reply document into a typed record
pub fn from_reply<T: DeserializeOwned>(document: Value) -> Result<T, JobError> {
    serde_json::from_value(document)
        .map_err(|e| JobError::new(ErrorKind::JsonParseError, e.to_string()))
}

/// Seconds since the epoch as UTC time
pub(crate) fn timestamp(seconds: i64) -> Option<chrono::DateTime<chrono::Utc>> {
    chrono::DateTime::from_timestamp(seconds, 0)
}
