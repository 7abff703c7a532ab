//! HTTP transport seam
//!
//! The executor never talks to `reqwest` directly. A [`Transport`] sends one request and maps
//! every failure into the closed [`Error`] enum, so retry classification is a match over
//! variants. Connection reuse and keep-alive belong to the transport.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::HeaderMap;
use reqwest::{Client, Method, StatusCode};
use url::Url;

use crate::{Error, Result};

/// One outbound request as handed to a transport
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Option<Vec<u8>>,
}

/// Raw upstream response, any status
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

/// Sends requests over the network
#[async_trait]
pub trait Transport: Send + Sync + std::fmt::Debug {
    /// Send `request`, giving up after `timeout`.
    ///
    /// Non-2xx statuses are returned as responses, not errors.
    async fn send(&self, request: &HttpRequest, timeout: Duration) -> Result<HttpResponse>;
}

/// [`Transport`] backed by a shared `reqwest::Client`
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// Create a transport with its own connection pool
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .build()
            .map_err(|e| Error::config(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self { client })
    }

    /// Reuse an existing client (and its connection pool)
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: &HttpRequest, timeout: Duration) -> Result<HttpResponse> {
        let mut builder = self
            .client
            .request(request.method.clone(), request.url.clone())
            .headers(request.headers.clone())
            .timeout(timeout);

        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        let response = builder
            .send()
            .await
            .map_err(|e| map_reqwest_error(&e, timeout))?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = response
            .bytes()
            .await
            .map_err(|e| map_reqwest_error(&e, timeout))?;

        Ok(HttpResponse {
            status,
            headers,
            body: body.to_vec(),
        })
    }
}

/// Map a reqwest failure into the crate taxonomy
fn map_reqwest_error(err: &reqwest::Error, timeout: Duration) -> Error {
    if err.is_timeout() {
        return Error::timeout(timeout);
    }
    Error::transport(error_chain(err))
}

fn error_chain(err: &(dyn std::error::Error + 'static)) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_chain_joins_sources() {
        let inner = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        let outer = std::io::Error::other(inner);
        let chain = error_chain(&outer);
        assert!(chain.contains("refused"));
    }

    #[tokio::test]
    async fn test_connection_refused_is_transport_error() {
        let transport = ReqwestTransport::new().unwrap();
        let request = HttpRequest {
            method: Method::GET,
            url: Url::parse("http://127.0.0.1:9/unreachable").unwrap(),
            headers: HeaderMap::new(),
            body: None,
        };

        let err = transport
            .send(&request, Duration::from_secs(2))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Transport { .. } | Error::Timeout { .. }));
    }
}
