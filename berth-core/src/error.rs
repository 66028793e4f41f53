//! Error taxonomy for Docker API jobs
//!
//! Every finished job carries an [`ErrorKind`] code (0 on success) and an
//! optional detail text. The two always travel together inside a [`JobError`].

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for job operations
pub type Result<T> = std::result::Result<T, JobError>;

/// First code available to job specific errors.
pub const USER_DEFINED_ERROR: i32 = 100;

/// Stable classification of job failures
///
/// The numeric codes never change between releases so callers can persist
/// or compare them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(i32)]
pub enum ErrorKind {
    /// The job finished successfully
    NoError = 0,
    /// The job was killed before it could finish
    Killed = 1,
    /// Neither the job nor the registry provides a configuration
    MissingConfig = USER_DEFINED_ERROR + 1,
    /// The configured remote host is empty
    MissingHost,
    /// The operation requires a username but none is configured
    MissingUser,
    /// The operation requires a password but none is configured
    MissingPassword,
    /// The remote side rejected the credentials
    AuthNFailed,
    /// The remote side does not allow the request
    AuthZFailed,
    /// The generated request URL is not valid
    InvalidRequestUrl,
    /// The request did not complete in time
    RequestTimedOut,
    /// The reply could not be parsed as JSON
    JsonParseError,
    /// TLS negotiation or certificate validation failed
    SslError,
    /// Connection level failure
    NetworkError,
    /// The Docker daemon reported an error
    #[serde(rename = "APIError")]
    ApiError,
    /// The reply body is empty but content was expected
    EmptyReply,
    /// The reply is an empty JSON array or object
    EmptyJson,
    /// The reply has a different JSON type than expected
    WrongOutputType,
    /// Caller supplied input is not valid
    InvalidInput,
    /// Anything else
    UnknownError,
}

impl ErrorKind {
    const ALL: [ErrorKind; 19] = [
        Self::NoError,
        Self::Killed,
        Self::MissingConfig,
        Self::MissingHost,
        Self::MissingUser,
        Self::MissingPassword,
        Self::AuthNFailed,
        Self::AuthZFailed,
        Self::InvalidRequestUrl,
        Self::RequestTimedOut,
        Self::JsonParseError,
        Self::SslError,
        Self::NetworkError,
        Self::ApiError,
        Self::EmptyReply,
        Self::EmptyJson,
        Self::WrongOutputType,
        Self::InvalidInput,
        Self::UnknownError,
    ];

    /// Numeric error code
    pub fn code(self) -> i32 {
        self as i32
    }

    /// Maps a numeric code back to its kind, unknown codes become `UnknownError`
    pub fn from_code(code: i32) -> Self {
        Self::ALL
            .into_iter()
            .find(|kind| kind.code() == code)
            .unwrap_or(Self::UnknownError)
    }

    /// Errors detected before any network traffic happened
    ///
    /// These never succeed on retry unless the caller changes its input.
    pub fn is_local(self) -> bool {
        matches!(
            self,
            Self::MissingConfig
                | Self::MissingHost
                | Self::MissingUser
                | Self::MissingPassword
                | Self::InvalidRequestUrl
                | Self::InvalidInput
        )
    }

    /// Errors raised by the transport or by a malformed reply
    pub fn is_transport(self) -> bool {
        matches!(
            self,
            Self::RequestTimedOut
                | Self::SslError
                | Self::NetworkError
                | Self::JsonParseError
                | Self::EmptyReply
                | Self::EmptyJson
                | Self::WrongOutputType
        )
    }

    /// Errors reported by the daemon itself
    pub fn is_application(self) -> bool {
        matches!(self, Self::ApiError | Self::AuthNFailed | Self::AuthZFailed)
    }

    /// Whether repeating the identical request may succeed
    pub fn is_retriable(self) -> bool {
        matches!(self, Self::RequestTimedOut | Self::NetworkError)
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?} ({})", self, self.code())
    }
}

/// A job failure: error kind plus detail text
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}", self.message())]
pub struct JobError {
    kind: ErrorKind,
    text: String,
}

impl JobError {
    /// Create an error with detail text
    pub fn new(kind: ErrorKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
        }
    }

    /// Create an error without detail text
    pub fn bare(kind: ErrorKind) -> Self {
        Self::new(kind, String::new())
    }

    /// Create an `InvalidInput` error
    pub fn invalid_input(text: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidInput, text)
    }

    /// Create an `ApiError` error
    pub fn api(text: impl Into<String>) -> Self {
        Self::new(ErrorKind::ApiError, text)
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn code(&self) -> i32 {
        self.kind.code()
    }

    /// Raw detail text as set by the job
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Human readable description of the error
    pub fn message(&self) -> String {
        match self.kind {
            ErrorKind::NoError => String::new(),
            ErrorKind::Killed => {
                if self.text.is_empty() {
                    "The job has been killed.".to_string()
                } else {
                    self.text.clone()
                }
            }
            ErrorKind::MissingConfig => "No configuration set.".to_string(),
            ErrorKind::MissingHost => "Missing remote host name.".to_string(),
            ErrorKind::MissingUser => "Missing username.".to_string(),
            ErrorKind::MissingPassword => "Missing password.".to_string(),
            ErrorKind::AuthNFailed => "Authentication failed at the remote server, please check your username and password.".to_string(),
            ErrorKind::AuthZFailed => {
                "Authorization failed, you are not allowed to perform this request.".to_string()
            }
            ErrorKind::InvalidRequestUrl => format!(
                "The URL ({}) generated to perform the request is not valid, please check your input values.",
                self.text
            ),
            ErrorKind::RequestTimedOut => {
                format!("The request timed out after {} seconds.", self.text)
            }
            ErrorKind::JsonParseError => {
                format!("Failed to parse the received JSON data: {}", self.text)
            }
            ErrorKind::SslError
            | ErrorKind::NetworkError
            | ErrorKind::ApiError
            | ErrorKind::InvalidInput => self.text.clone(),
            ErrorKind::EmptyReply | ErrorKind::EmptyJson => {
                "Unexpected empty reply data.".to_string()
            }
            ErrorKind::WrongOutputType => "Unexpected JSON type in received data.".to_string(),
            ErrorKind::UnknownError => {
                "Sorry, but unfortunately an unknown error has occurred.".to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_stable() {
        assert_eq!(ErrorKind::NoError.code(), 0);
        assert_eq!(ErrorKind::Killed.code(), 1);
        assert_eq!(ErrorKind::MissingConfig.code(), 101);
        assert_eq!(ErrorKind::ApiError.code(), 112);
        assert_eq!(ErrorKind::InvalidInput.code(), 116);
        assert_eq!(ErrorKind::UnknownError.code(), 117);
    }

    #[test]
    fn test_from_code() {
        assert_eq!(ErrorKind::from_code(108), ErrorKind::RequestTimedOut);
        assert_eq!(ErrorKind::from_code(0), ErrorKind::NoError);
        assert_eq!(ErrorKind::from_code(4242), ErrorKind::UnknownError);
    }

    #[test]
    fn test_layers() {
        assert!(ErrorKind::InvalidInput.is_local());
        assert!(!ErrorKind::InvalidInput.is_retriable());
        assert!(ErrorKind::RequestTimedOut.is_transport());
        assert!(ErrorKind::RequestTimedOut.is_retriable());
        assert!(ErrorKind::ApiError.is_application());
        assert!(!ErrorKind::ApiError.is_retriable());
    }

    #[test]
    fn test_messages() {
        let err = JobError::api("no such container");
        assert_eq!(err.message(), "no such container");
        assert_eq!(err.to_string(), "no such container");

        let err = JobError::new(ErrorKind::RequestTimedOut, "300");
        assert_eq!(err.message(), "The request timed out after 300 seconds.");

        let err = JobError::bare(ErrorKind::MissingConfig);
        assert_eq!(err.message(), "No configuration set.");
        assert!(err.text().is_empty());
    }
}
