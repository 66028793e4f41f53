//! HTTP transport
//!
//! Jobs never talk to reqwest directly. They hand a fully built
//! [`HttpRequest`] to a [`Transport`], which makes the engine testable with
//! an in-process stub and keeps TLS policy in one place.

use std::error::Error as _;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use berth_core::{Configuration, Headers, Method};
use reqwest::{Client, Url};
use thiserror::Error;
use tracing::warn;

/// A request ready to be sent
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: Method,
    pub url: Url,
    pub headers: Headers,
    pub body: Option<Vec<u8>>,
    /// Upper bound for the whole exchange, zero disables it
    pub timeout: Duration,
}

/// Status and body of a completed exchange
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }
}

/// Failures below the HTTP layer
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    #[error("request timed out")]
    Timeout,

    #[error("TLS error: {0}")]
    Tls(String),

    #[error("network error: {0}")]
    Network(String),
}

/// Sends requests to the Docker daemon
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}

/// Creates a transport for a configuration
pub trait TransportFactory: Send + Sync {
    fn create(&self, configuration: &dyn Configuration) -> Result<Arc<dyn Transport>, TransportError>;
}

/// reqwest backed transport
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// Builds a client honouring the TLS policy of `configuration`
    pub fn new(configuration: &dyn Configuration) -> Result<Self, TransportError> {
        let ignore_ssl_errors = configuration.ignore_ssl_errors();
        if ignore_ssl_errors {
            warn!(
                "Ignoring TLS certificate errors for {}:{}",
                configuration.host(),
                configuration.port()
            );
        }

        let client = Client::builder()
            .danger_accept_invalid_certs(ignore_ssl_errors)
            .build()
            .map_err(|e| classify(&e))?;

        Ok(Self { client })
    }

    /// Wraps an already configured client
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let method = match request.method {
            Method::Head => reqwest::Method::HEAD,
            Method::Get => reqwest::Method::GET,
            Method::Put => reqwest::Method::PUT,
            Method::Post => reqwest::Method::POST,
            Method::Delete => reqwest::Method::DELETE,
        };

        let mut builder = self.client.request(method, request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }
        if !request.timeout.is_zero() {
            builder = builder.timeout(request.timeout);
        }

        let response = builder.send().await.map_err(|e| classify(&e))?;
        let status = response.status().as_u16();
        let body = response.bytes().await.map_err(|e| classify(&e))?;

        Ok(HttpResponse::new(status, body.to_vec()))
    }
}

/// Factory creating a fresh [`ReqwestTransport`] per job
#[derive(Debug, Clone, Copy, Default)]
pub struct ReqwestTransportFactory;

impl TransportFactory for ReqwestTransportFactory {
    fn create(&self, configuration: &dyn Configuration) -> Result<Arc<dyn Transport>, TransportError> {
        Ok(Arc::new(ReqwestTransport::new(configuration)?))
    }
}

fn classify(error: &reqwest::Error) -> TransportError {
    if error.is_timeout() {
        return TransportError::Timeout;
    }

    // The outer message embeds the request URL, only the causes describe the failure
    let mut causes = Vec::new();
    let mut source = error.source();
    while let Some(current) = source {
        causes.push(current.to_string());
        source = current.source();
    }

    let over_tls = error.is_builder() || error.url().is_some_and(|url| url.scheme() == "https");
    let is_tls = over_tls && mentions_tls(&causes);

    let message = std::iter::once(error.to_string())
        .chain(causes)
        .collect::<Vec<_>>()
        .join(": ");
    if is_tls {
        TransportError::Tls(message)
    } else {
        TransportError::Network(message)
    }
}

fn mentions_tls(causes: &[String]) -> bool {
    causes.iter().any(|cause| {
        let cause = cause.to_ascii_lowercase();
        cause.contains("certificate") || cause.contains("tls") || cause.contains("ssl")
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use berth_core::StaticConfiguration;

    #[test]
    fn test_transport_creation() {
        let config = StaticConfiguration::default().with_ignore_ssl_errors(true);
        assert!(ReqwestTransport::new(&config).is_ok());
        assert!(ReqwestTransportFactory.create(&config).is_ok());
    }

    #[tokio::test]
    async fn test_connection_refused_is_network_error() {
        let transport = ReqwestTransport::with_client(Client::new());
        let request = HttpRequest {
            method: Method::Get,
            url: Url::parse("http://127.0.0.1:1/v1.40/version").unwrap(),
            headers: Headers::new(),
            body: None,
            timeout: Duration::from_secs(5),
        };

        let err = transport.send(request).await.unwrap_err();
        assert!(matches!(err, TransportError::Network(_)));
    }

    #[tokio::test]
    async fn test_tls_words_in_url_are_not_tls_errors() {
        let transport = ReqwestTransport::with_client(Client::new());
        let request = HttpRequest {
            method: Method::Get,
            url: Url::parse("http://127.0.0.1:1/v1.40/containers/tls-ssl-certificate/json").unwrap(),
            headers: Headers::new(),
            body: None,
            timeout: Duration::from_secs(5),
        };

        let err = transport.send(request).await.unwrap_err();
        assert!(matches!(err, TransportError::Network(_)), "{:?}", err);
    }

    #[test]
    fn test_mentions_tls() {
        let dns_failure = vec![
            "client error (Connect)".to_string(),
            "dns error".to_string(),
            "failed to lookup address information: Name or service not known".to_string(),
        ];
        assert!(!mentions_tls(&dns_failure));

        let handshake_failure = vec![
            "client error (Connect)".to_string(),
            "error:0A000086:SSL routines:tls_post_process_server_certificate:certificate verify failed".to_string(),
        ];
        assert!(mentions_tls(&handshake_failure));
        assert!(!mentions_tls(&[]));
    }
}
