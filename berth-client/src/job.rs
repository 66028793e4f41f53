//! Docker API job engine
//!
//! [`DockerJob`] drives a single [`Operation`] through setup, validation,
//! request building, dispatch and reply checking, and records the outcome
//! on its [`JobBase`].

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE;
use berth_core::request::REGISTRY_AUTH_HEADER;
use berth_core::shape::{check_output, extract_error};
use berth_core::{
    API_ROOT, Capabilities, Configuration, ErrorKind, Headers, Job, JobBase, JobError, JobEvent,
    Notification, Operation, Query,
};
use reqwest::Url;
use serde_json::{Value, json};
use tokio::sync::mpsc;
use tracing::{debug, enabled, error, Level};

use crate::registry::Registry;
use crate::transport::{
    HttpRequest, HttpResponse, ReqwestTransport, Transport, TransportError,
};

/// Request timeout used unless configured otherwise
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

const REDACTED: &str = "**************";

/// A job performing one Docker API operation
pub struct DockerJob<O: Operation> {
    base: JobBase,
    operation: O,
    configuration: Option<Arc<dyn Configuration>>,
    registry: Arc<Registry>,
    transport: Option<Arc<dyn Transport>>,
    timeout: Duration,
    reply: Option<Value>,
}

impl<O: Operation> DockerJob<O> {
    /// Creates a job for `operation` using the global registry
    pub fn new(operation: O) -> Self {
        Self {
            base: JobBase::new(Capabilities::KILLABLE),
            operation,
            configuration: None,
            registry: Registry::global(),
            transport: None,
            timeout: DEFAULT_TIMEOUT,
            reply: None,
        }
    }

    pub fn with_configuration(mut self, configuration: Arc<dyn Configuration>) -> Self {
        self.configuration = Some(configuration);
        self
    }

    /// Uses `registry` instead of the global one for defaults
    pub fn with_registry(mut self, registry: Arc<Registry>) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Sets the request timeout, zero disables it
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn configuration(&self) -> Option<&Arc<dyn Configuration>> {
        self.configuration.as_ref()
    }

    /// Replaces the configuration, notifying observers if it changed
    pub fn set_configuration(&mut self, configuration: Arc<dyn Configuration>) {
        let changed = self.configuration.as_ref().is_none_or(|current| {
            !std::ptr::addr_eq(Arc::as_ptr(current), Arc::as_ptr(&configuration))
        });
        self.configuration = Some(configuration);
        if changed {
            self.base.emit(JobEvent::ConfigurationChanged);
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn operation(&self) -> &O {
        &self.operation
    }

    pub fn operation_mut(&mut self) -> &mut O {
        &mut self.operation
    }

    /// Parsed reply of a successful job
    pub fn reply_data(&self) -> Option<&Value> {
        self.reply.as_ref()
    }

    pub fn take_reply_data(&mut self) -> Option<Value> {
        self.reply.take()
    }

    pub fn error(&self) -> ErrorKind {
        self.base.error()
    }

    /// Human readable error message, empty on success
    pub fn error_string(&self) -> String {
        self.base
            .job_error()
            .map(JobError::message)
            .unwrap_or_default()
    }

    pub fn subscribe(&mut self) -> mpsc::UnboundedReceiver<Notification> {
        self.base.subscribe()
    }

    /// Converts a finished job into its outcome
    pub fn into_outcome(mut self) -> Result<Option<Value>, JobError> {
        match self.base.job_error() {
            Some(error) if error.kind() != ErrorKind::NoError => Err(error.clone()),
            _ => Ok(self.reply.take()),
        }
    }

    /// Generic and operation specific input checks
    pub fn check_input(&self, configuration: &dyn Configuration) -> Result<(), JobError> {
        if configuration.host().is_empty() {
            return Err(JobError::bare(ErrorKind::MissingHost));
        }

        if self.operation.requires_auth() {
            if configuration.username().is_empty() {
                return Err(JobError::bare(ErrorKind::MissingUser));
            }
            if configuration.password().is_empty() {
                return Err(JobError::bare(ErrorKind::MissingPassword));
            }
        }

        self.operation.check_input()
    }

    /// Builds the HTTP request for `configuration`
    ///
    /// Building has no side effects, calling it twice yields equal requests.
    pub fn build_request(&self, configuration: &dyn Configuration) -> Result<HttpRequest, JobError> {
        let scheme = if configuration.use_ssl() { "https" } else { "http" };
        let host = configuration.host();
        let host = if host.contains(':') && !host.starts_with('[') {
            format!("[{}]", host)
        } else {
            host
        };
        let base = format!("{}://{}:{}", scheme, host, configuration.port());

        let mut url = Url::parse(&base)
            .map_err(|_| JobError::new(ErrorKind::InvalidRequestUrl, base.clone()))?;
        url.set_path(&self.operation.build_path(API_ROOT));

        let mut query = Query::new();
        self.operation.build_query(&mut query);
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query.iter());
        }

        let mut headers = Headers::new();
        if self.operation.expected_shape().expects_json() {
            headers.insert("Accept".to_string(), "application/json".to_string());
        }
        self.operation.build_headers(&mut headers);

        let payload = self.operation.build_payload()?;
        if let Some(payload) = &payload {
            if !payload.content_type.is_empty() {
                headers.insert("Content-Type".to_string(), payload.content_type.clone());
            }
        }

        if self.operation.requires_auth() {
            let credentials = json!({
                "username": configuration.username(),
                "password": configuration.password(),
                "serveraddress": configuration.host(),
            });
            headers.insert(
                REGISTRY_AUTH_HEADER.to_string(),
                URL_SAFE.encode(credentials.to_string()),
            );
        }

        Ok(HttpRequest {
            method: self.operation.method(),
            url,
            headers,
            body: payload.map(|payload| payload.body),
            timeout: self.timeout,
        })
    }

    async fn send_request(&mut self) -> Result<Option<Value>, JobError> {
        self.base.emit(JobEvent::Description(self.operation.describe()));
        self.base.emit(JobEvent::Info("Setting up request".to_string()));
        debug!("Setting up network request");

        let configuration = match self.configuration.clone() {
            Some(configuration) => configuration,
            None => match self.registry.default_configuration() {
                Some(configuration) => {
                    debug!("Using default configuration {:?}", configuration);
                    self.configuration = Some(configuration.clone());
                    self.base.emit(JobEvent::ConfigurationChanged);
                    configuration
                }
                None => {
                    error!("Can not send request: missing configuration");
                    return Err(JobError::bare(ErrorKind::MissingConfig));
                }
            },
        };

        self.check_input(configuration.as_ref()).inspect_err(|e| {
            error!("Invalid input: {}", e.message());
        })?;

        let request = self.build_request(configuration.as_ref())?;
        let transport = self.resolve_transport(configuration.as_ref())?;

        if enabled!(Level::DEBUG) {
            log_request(&request);
        }

        self.base.emit(JobEvent::Info("Sending request".to_string()));
        debug!("Sending network request");

        let reply = if self.timeout.is_zero() {
            transport.send(request).await
        } else {
            tokio::time::timeout(self.timeout, transport.send(request))
                .await
                .unwrap_or(Err(TransportError::Timeout))
        };

        self.base.emit(JobEvent::Info("Checking reply".to_string()));
        self.check_reply(reply)
    }

    fn resolve_transport(&self, configuration: &dyn Configuration) -> Result<Arc<dyn Transport>, JobError> {
        if let Some(transport) = &self.transport {
            return Ok(transport.clone());
        }

        let created = match self.registry.transport_factory() {
            Some(factory) => factory.create(configuration),
            None => ReqwestTransport::new(configuration)
                .map(|transport| Arc::new(transport) as Arc<dyn Transport>),
        };

        created.map_err(|e| self.transport_error(e))
    }

    fn check_reply(&self, reply: Result<HttpResponse, TransportError>) -> Result<Option<Value>, JobError> {
        let response = reply.map_err(|e| self.transport_error(e))?;
        debug!("Reply status: {}", response.status);
        debug!("Reply body: {}", String::from_utf8_lossy(&response.body));

        if response.status < 400 {
            check_output(self.operation.expected_shape(), &response.body)
        } else {
            Err(extract_error(&response.body))
        }
    }

    fn transport_error(&self, error: TransportError) -> JobError {
        match error {
            TransportError::Timeout => {
                error!("The request timed out after {} seconds", self.timeout.as_secs());
                JobError::new(ErrorKind::RequestTimedOut, self.timeout.as_secs().to_string())
            }
            TransportError::Tls(message) => {
                error!("TLS error: {}", message);
                if message.is_empty() {
                    JobError::new(
                        ErrorKind::SslError,
                        "Can not perform API request. An unknown SSL error has occurred.",
                    )
                } else {
                    JobError::new(ErrorKind::SslError, message)
                }
            }
            TransportError::Network(message) => {
                error!("Network error: {}", message);
                JobError::new(ErrorKind::NetworkError, message)
            }
        }
    }

    fn succeed(&mut self, reply: Option<Value>) {
        self.reply = reply.clone();
        self.base.emit(JobEvent::Succeeded(reply));
        self.base.finish(true);
    }

    fn fail(&mut self, error: JobError) {
        self.reply = None;
        let code = error.code();
        let message = error.message();
        self.base.set_error(error);
        self.base.emit(JobEvent::Failed { code, message });
        self.base.finish(true);
    }
}

#[async_trait]
impl<O: Operation> Job for DockerJob<O> {
    fn base(&self) -> &JobBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut JobBase {
        &mut self.base
    }

    async fn run(&mut self) {
        match self.send_request().await {
            Ok(reply) => self.succeed(reply),
            Err(error) => self.fail(error),
        }
    }

    fn do_kill(&mut self) -> bool {
        self.reply = None;
        true
    }
}

fn log_request(request: &HttpRequest) {
    debug!("Start performing {} network operation", request.method);
    debug!("API URL: {}", request.url);
    for (name, value) in &request.headers {
        if name.eq_ignore_ascii_case(REGISTRY_AUTH_HEADER) || name.eq_ignore_ascii_case("Authorization") {
            debug!("{}: {}", name, REDACTED);
        } else {
            debug!("{}: {}", name, value);
        }
    }
    if let Some(body) = &request.body {
        debug!("Payload: {}", String::from_utf8_lossy(body));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use berth_core::{ExpectedShape, Description, Method, StaticConfiguration};

    struct Ping {
        needs_auth: bool,
    }

    impl Operation for Ping {
        fn method(&self) -> Method {
            Method::Get
        }

        fn expected_shape(&self) -> ExpectedShape {
            ExpectedShape::None
        }

        fn requires_auth(&self) -> bool {
            self.needs_auth
        }

        fn build_path(&self, root: &str) -> String {
            format!("{}/_ping", root)
        }

        fn describe(&self) -> Description {
            Description::new("Pinging")
        }
    }

    #[test]
    fn test_check_input_generic() {
        let job = DockerJob::new(Ping { needs_auth: true });

        let config = StaticConfiguration::new("", 2375);
        assert_eq!(job.check_input(&config).unwrap_err().kind(), ErrorKind::MissingHost);

        let config = StaticConfiguration::default();
        assert_eq!(job.check_input(&config).unwrap_err().kind(), ErrorKind::MissingUser);

        let config = StaticConfiguration::default().with_credentials("alice", "");
        assert_eq!(job.check_input(&config).unwrap_err().kind(), ErrorKind::MissingPassword);

        let config = StaticConfiguration::default().with_credentials("alice", "secret");
        assert!(job.check_input(&config).is_ok());
    }

    #[test]
    fn test_build_request_url() {
        let job = DockerJob::new(Ping { needs_auth: false });

        let request = job.build_request(&StaticConfiguration::default()).unwrap();
        assert_eq!(request.url.as_str(), "http://localhost:2375/v1.40/_ping");
        assert_eq!(request.method, Method::Get);
        assert!(request.headers.get("Accept").is_none());
        assert!(request.body.is_none());
        assert_eq!(request.timeout, DEFAULT_TIMEOUT);

        let config = StaticConfiguration::new("::1", 2376).with_ssl(true);
        let request = job.build_request(&config).unwrap();
        assert_eq!(request.url.as_str(), "https://[::1]:2376/v1.40/_ping");
    }

    #[test]
    fn test_build_request_invalid_url() {
        let job = DockerJob::new(Ping { needs_auth: false });

        let err = job
            .build_request(&StaticConfiguration::new("bad host", 2375))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidRequestUrl);
        assert_eq!(err.text(), "http://bad host:2375");
    }

    #[test]
    fn test_registry_auth_header() {
        let job = DockerJob::new(Ping { needs_auth: true });
        let config = StaticConfiguration::new("registry.local", 2375).with_credentials("alice", "secret");

        let request = job.build_request(&config).unwrap();
        let encoded = request.headers.get(REGISTRY_AUTH_HEADER).unwrap();
        let decoded: Value = serde_json::from_slice(&URL_SAFE.decode(encoded).unwrap()).unwrap();
        assert_eq!(
            decoded,
            json!({"username": "alice", "password": "secret", "serveraddress": "registry.local"})
        );
    }

    #[test]
    fn test_set_configuration_emits_on_change() {
        let mut job = DockerJob::new(Ping { needs_auth: false });
        let mut rx = job.subscribe();

        let config: Arc<dyn Configuration> = Arc::new(StaticConfiguration::default());
        job.set_configuration(config.clone());
        job.set_configuration(config);

        let events: Vec<JobEvent> = std::iter::from_fn(|| rx.try_recv().ok())
            .map(|notification| notification.event)
            .filter(|event| *event == JobEvent::ConfigurationChanged)
            .collect();
        assert_eq!(events.len(), 1);
    }

    #[test]
    fn test_transport_error_mapping() {
        let job = DockerJob::new(Ping { needs_auth: false }).with_timeout(Duration::from_secs(30));

        let err = job.transport_error(TransportError::Timeout);
        assert_eq!(err.kind(), ErrorKind::RequestTimedOut);
        assert_eq!(err.message(), "The request timed out after 30 seconds.");

        let err = job.transport_error(TransportError::Tls(String::new()));
        assert_eq!(err.kind(), ErrorKind::SslError);
        assert_eq!(
            err.message(),
            "Can not perform API request. An unknown SSL error has occurred."
        );

        let err = job.transport_error(TransportError::Network("connection refused".to_string()));
        assert_eq!(err.kind(), ErrorKind::NetworkError);
        assert_eq!(err.message(), "connection refused");
    }
}
