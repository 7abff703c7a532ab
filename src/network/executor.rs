//! Resilient request executor
//!
//! Runs one logical request as up to `max_retries + 1` attempts. Each attempt has its own
//! deadline; failures are classified by [`Error::kind`] and retryable ones are retried after
//! an exponentially growing, jittered delay. When the budget runs out the last error is
//! returned as-is.

use std::sync::Arc;
use std::time::Duration;

use reqwest::Method;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};
use url::Url;

use super::retry::{self, JitterSource, RandomJitter, RetryPredicate};
use super::transport::{HttpRequest, HttpResponse, Transport};
use crate::session::SessionProvider;
use crate::{Error, Result};

/// Per-attempt deadline unless overridden
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(10_000);
/// Retries for read calls unless overridden
pub const DEFAULT_MAX_RETRIES: u32 = 3;
/// Base backoff unless overridden
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(1_000);

/// Longest error message carried out of a non-JSON error body
const MAX_ERROR_MESSAGE_LEN: usize = 256;

/// One logical request and its retry policy
#[derive(Clone)]
pub struct RequestSpec {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Option<Vec<u8>>,
    pub timeout: Duration,
    pub max_retries: u32,
    pub base_delay: Duration,
    pub retry_predicate: Option<RetryPredicate>,
    /// Profile whose session is invalidated on HTTP 401
    pub session_id: Option<String>,
    /// Short label for logs
    pub operation: &'static str,
}

impl std::fmt::Debug for RequestSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestSpec")
            .field("method", &self.method)
            .field("url", &self.url.as_str())
            .field("body_len", &self.body.as_ref().map(Vec::len))
            .field("timeout", &self.timeout)
            .field("max_retries", &self.max_retries)
            .field("base_delay", &self.base_delay)
            .field("retry_predicate", &self.retry_predicate.is_some())
            .field("session_id", &self.session_id)
            .field("operation", &self.operation)
            .finish_non_exhaustive()
    }
}

impl RequestSpec {
    /// Create a request with the default retry policy
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: HeaderMap::new(),
            body: None,
            timeout: DEFAULT_TIMEOUT,
            max_retries: DEFAULT_MAX_RETRIES,
            base_delay: DEFAULT_BASE_DELAY,
            retry_predicate: None,
            session_id: None,
            operation: "request",
        }
    }

    pub fn get(url: Url) -> Self {
        Self::new(Method::GET, url)
    }

    pub fn post(url: Url) -> Self {
        Self::new(Method::POST, url)
    }

    /// Merge `headers` into the request headers
    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers.extend(headers);
        self
    }

    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Serialize `value` as the JSON body
    pub fn with_json<T: Serialize + ?Sized>(mut self, value: &T) -> Result<Self> {
        self.body = Some(serde_json::to_vec(value)?);
        self.headers
            .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Ok(self)
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_base_delay(mut self, base_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self
    }

    pub fn with_retry_predicate(mut self, predicate: RetryPredicate) -> Self {
        self.retry_predicate = Some(predicate);
        self
    }

    pub fn with_session_id(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    pub fn with_operation(mut self, operation: &'static str) -> Self {
        self.operation = operation;
        self
    }

    /// Attempts this request may make
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    fn to_http_request(&self) -> HttpRequest {
        HttpRequest {
            method: self.method.clone(),
            url: self.url.clone(),
            headers: self.headers.clone(),
            body: self.body.clone(),
        }
    }
}

/// Successful (2xx) upstream response
#[derive(Debug, Clone)]
pub struct Response {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
    /// Attempts it took; more than 1 means the request recovered from failures
    pub attempts: u32,
}

impl Response {
    /// Deserialize the body, reporting the JSON path of shape mismatches
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        let mut deserializer = serde_json::Deserializer::from_slice(&self.body);
        serde_path_to_error::deserialize(&mut deserializer).map_err(|e| {
            let path = e.path().to_string();
            let inner = e.into_inner();
            if inner.is_data() {
                Error::invalid_response(format!("{} at `{}`", inner, path))
            } else {
                Error::Json(inner)
            }
        })
    }

    pub fn content_type(&self) -> Option<&str> {
        self.headers
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
    }

    /// Whether the request needed more than one attempt
    pub fn recovered(&self) -> bool {
        self.attempts > 1
    }
}

/// Executes [`RequestSpec`]s with bounded retries
#[derive(Debug, Clone)]
pub struct RequestExecutor {
    transport: Arc<dyn Transport>,
    sessions: Arc<dyn SessionProvider>,
    jitter: Arc<dyn JitterSource>,
}

impl RequestExecutor {
    pub fn new(transport: Arc<dyn Transport>, sessions: Arc<dyn SessionProvider>) -> Self {
        Self {
            transport,
            sessions,
            jitter: Arc::new(RandomJitter),
        }
    }

    /// Replace the jitter source
    pub fn with_jitter(mut self, jitter: Arc<dyn JitterSource>) -> Self {
        self.jitter = jitter;
        self
    }

    /// Run `spec` until it succeeds, fails terminally, or exhausts its retries
    pub async fn execute(&self, spec: &RequestSpec) -> Result<Response> {
        let mut attempt: u32 = 0;

        loop {
            debug!(
                "{} {} {} (attempt {}/{})",
                spec.operation,
                spec.method,
                spec.url,
                attempt + 1,
                spec.max_attempts()
            );

            let error = match self.attempt(spec).await {
                Ok(response) => {
                    if attempt > 0 {
                        info!(
                            "{} recovered after {} failed attempt(s)",
                            spec.operation, attempt
                        );
                    }
                    return Ok(Response {
                        status: response.status.as_u16(),
                        headers: response.headers,
                        body: response.body,
                        attempts: attempt + 1,
                    });
                }
                Err(error) => error,
            };

            let decision = retry::decide(
                &error,
                attempt,
                spec.max_retries,
                spec.retry_predicate.as_ref(),
            );

            if !decision.retry {
                debug!("{} giving up: {}", spec.operation, decision.reason);
                return Err(error);
            }

            let delay = retry::delay_with_jitter(spec.base_delay, attempt, self.jitter.as_ref());
            warn!(
                "{} failed ({}): {}; retrying in {:?}",
                spec.operation,
                error.kind(),
                error,
                delay
            );
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }

    async fn attempt(&self, spec: &RequestSpec) -> Result<HttpResponse> {
        let request = spec.to_http_request();

        let response = tokio::time::timeout(spec.timeout, self.transport.send(&request, spec.timeout))
            .await
            .map_err(|_| Error::timeout(spec.timeout))??;

        if response.status.is_success() {
            return Ok(response);
        }

        let status = response.status.as_u16();
        let body = String::from_utf8_lossy(&response.body).into_owned();
        let message = error_message(&body, response.status);

        if status == 401
            && let Some(profile_id) = &spec.session_id
        {
            warn!(
                "Upstream rejected session of profile {}; invalidating",
                profile_id
            );
            self.sessions.remove_session(profile_id).await;
            return Err(Error::session_expired(profile_id.clone(), message));
        }

        Err(Error::http(status, message, body))
    }
}

/// Human-readable message from an error body: JSON `message`/`error`, else the text itself
fn error_message(body: &str, status: reqwest::StatusCode) -> String {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        let field = ["message", "error", "detail"]
            .iter()
            .find_map(|key| value.get(key).and_then(|v| v.as_str()));
        if let Some(message) = field {
            return message.to_string();
        }
    }

    let trimmed = body.trim();
    if trimmed.is_empty() {
        return status
            .canonical_reason()
            .unwrap_or("no response body")
            .to_string();
    }

    trimmed.chars().take(MAX_ERROR_MESSAGE_LEN).collect()
}
