//! Berth Core
//!
//! Core types and abstractions for the Berth Docker Engine API client.
//!
//! This crate contains:
//! - Configuration: connection settings for the Docker daemon
//! - Domain records: typed views on version, image and container replies
//! - Errors: the stable job error taxonomy
//! - Job base: the observable, killable unit of asynchronous work
//! - Request descriptors: the contract every API operation implements
//! - Reply checks: response shape validation and error envelope parsing
//! - Input grammars: container name and detach key validation

pub mod config;
pub mod domain;
pub mod error;
pub mod job;
pub mod request;
pub mod shape;
pub mod validate;

pub use config::{Configuration, StaticConfiguration};
pub use error::{ErrorKind, JobError};
pub use job::{Capabilities, Job, JobBase, JobEvent, JobHandle, JobState, KillVerbosity, Notification, Unit};
pub use request::{API_ROOT, Description, ExpectedShape, Headers, Method, Operation, Payload, Query};
