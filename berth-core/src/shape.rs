//! Reply checks
//!
//! Validates reply bodies against the shape an operation declared and
//! extracts the message from Docker error envelopes (`{"message": "..."}`).

use serde_json::Value;
use tracing::error;

use crate::error::{ErrorKind, JobError};
use crate::request::ExpectedShape;

/// Validates `data` against `expected`
///
/// Returns the parsed document for JSON shapes and `None` when the operation
/// does not expect a body.
pub fn check_output(expected: ExpectedShape, data: &[u8]) -> Result<Option<Value>, JobError> {
    if expected == ExpectedShape::None {
        return Ok(None);
    }

    if data.is_empty() {
        error!("Invalid reply: content expected, but reply is empty");
        return Err(JobError::bare(ErrorKind::EmptyReply));
    }

    let document: Value = serde_json::from_slice(data).map_err(|e| {
        error!("Invalid JSON data in reply: {}", e);
        JobError::new(ErrorKind::JsonParseError, e.to_string())
    })?;

    let is_empty = match &document {
        Value::Array(items) => items.is_empty(),
        Value::Object(fields) => fields.is_empty(),
        Value::Null => true,
        _ => false,
    };
    if is_empty {
        error!("Invalid reply: content expected, but JSON data is empty");
        return Err(JobError::bare(ErrorKind::EmptyJson));
    }

    let matches = match expected {
        ExpectedShape::Array => document.is_array(),
        ExpectedShape::Object => document.is_object(),
        ExpectedShape::None => true,
    };
    if !matches {
        error!(
            "Invalid reply: JSON {:?} expected, but got something different",
            expected
        );
        return Err(JobError::bare(ErrorKind::WrongOutputType));
    }

    Ok(Some(document))
}

/// Builds the error for a reply the daemon marked as failed
///
/// The result is always an `ApiError`. If the body is not a usable error
/// envelope, the text says why instead of echoing the raw body.
pub fn extract_error(data: &[u8]) -> JobError {
    let document: Value = match serde_json::from_slice(data) {
        Ok(document) => document,
        Err(e) => {
            error!("Invalid JSON data in error reply: {}", e);
            return JobError::api(
                "An error occurred while performing the API request but the returned JSON error data is not parseable.",
            );
        }
    };

    let Some(fields) = document.as_object() else {
        error!("Unexpected JSON type in error reply, expected an object");
        return JobError::api(
            "An error occurred while performing the API request but the returned JSON error data does not contain a JSON object.",
        );
    };

    let message = fields
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or_default();
    if message.is_empty() {
        error!("The error message returned by the Docker API is empty");
        return JobError::api(
            "An error occurred while performing the API request but the returned error message is empty.",
        );
    }

    error!(
        "The following error occurred while performing the API request: {}",
        message
    );
    JobError::api(message)
}
