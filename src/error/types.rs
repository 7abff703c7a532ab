//! Error type definitions
//!
//! Defines the closed error enum produced by the transport adapter, the executor and the
//! decoders, together with the [`ErrorKind`] classification the retry policy matches on.

use thiserror::Error;

/// Main error type for the integration client
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Session record could not be turned into request headers
    #[error("Session error: {0}")]
    Session(String),

    /// No session is registered for the profile
    #[error("No active session for profile {profile_id}")]
    SessionMissing { profile_id: String },

    /// Upstream rejected the session (HTTP 401) or it expired locally
    #[error("Session expired for profile {profile_id}: {message}")]
    SessionExpired { profile_id: String, message: String },

    /// DNS, connect, TLS or body-read failure
    #[error("Transport error: {message}")]
    Transport { message: String },

    /// Per-attempt deadline exceeded
    #[error("Request timed out after {timeout_ms} ms")]
    Timeout { timeout_ms: u64 },

    /// Non-2xx upstream response
    #[error("Upstream returned HTTP {status}: {message}")]
    Http {
        status: u16,
        message: String,
        body: String,
    },

    /// Malformed binary payload
    #[error("Protocol decode error: {reason}")]
    ProtocolDecode { reason: String },

    /// Well-formed response missing expected fields
    #[error("Invalid response shape: {reason}")]
    InvalidResponse { reason: String },

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// URL parsing errors
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic errors
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, Error>;

/// Failure classification used by the retry policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// DNS, connect or TLS failure
    Transport,
    /// Deadline exceeded
    Timeout,
    /// HTTP 429
    RateLimited,
    /// HTTP 408
    RequestTimeout,
    /// HTTP 5xx
    ServerError,
    /// Any other 4xx, including 401, and local failures
    ClientError,
    /// Malformed binary payload
    ProtocolDecode,
    /// JSON that does not match the expected shape
    InvalidResponseShape,
}

impl ErrorKind {
    /// Whether a failure of this kind may succeed on another attempt
    pub fn is_retryable(self) -> bool {
        matches!(
            self,
            Self::Transport | Self::ServerError | Self::RateLimited | Self::RequestTimeout
        )
    }

    /// Stable label used in logs
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Transport => "network-transport",
            Self::Timeout => "timeout",
            Self::RateLimited => "http-429",
            Self::RequestTimeout => "http-408",
            Self::ServerError => "http-5xx",
            Self::ClientError => "http-4xx-other",
            Self::ProtocolDecode => "protocol-decode-error",
            Self::InvalidResponseShape => "invalid-response-shape",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Error {
    /// Create a new configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a new session error
    pub fn session(msg: impl Into<String>) -> Self {
        Self::Session(msg.into())
    }

    /// Create a missing session error
    pub fn session_missing(profile_id: impl Into<String>) -> Self {
        Self::SessionMissing {
            profile_id: profile_id.into(),
        }
    }

    /// Create a session expiry error
    pub fn session_expired(profile_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SessionExpired {
            profile_id: profile_id.into(),
            message: message.into(),
        }
    }

    /// Create a transport error
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Create a timeout error
    pub fn timeout(timeout: std::time::Duration) -> Self {
        Self::Timeout {
            timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
        }
    }

    /// Create an HTTP status error
    pub fn http(status: u16, message: impl Into<String>, body: impl Into<String>) -> Self {
        Self::Http {
            status,
            message: message.into(),
            body: body.into(),
        }
    }

    /// Create a protocol decode error
    pub fn protocol_decode(reason: impl Into<String>) -> Self {
        Self::ProtocolDecode {
            reason: reason.into(),
        }
    }

    /// Create an invalid response shape error
    pub fn invalid_response(reason: impl Into<String>) -> Self {
        Self::InvalidResponse {
            reason: reason.into(),
        }
    }

    /// Create a new internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Classify this error for retry decisions
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Transport { .. } => ErrorKind::Transport,
            Self::Timeout { .. } => ErrorKind::Timeout,
            Self::Http { status, .. } => match *status {
                429 => ErrorKind::RateLimited,
                408 => ErrorKind::RequestTimeout,
                500..=599 => ErrorKind::ServerError,
                _ => ErrorKind::ClientError,
            },
            Self::ProtocolDecode { .. } => ErrorKind::ProtocolDecode,
            Self::InvalidResponse { .. } | Self::Json(_) => ErrorKind::InvalidResponseShape,
            Self::Config(_)
            | Self::Session(_)
            | Self::SessionMissing { .. }
            | Self::SessionExpired { .. }
            | Self::Url(_)
            | Self::Io(_)
            | Self::Internal(_) => ErrorKind::ClientError,
        }
    }

    /// HTTP status carried by the error, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            Self::SessionExpired { .. } => Some(401),
            _ => None,
        }
    }

    /// Whether the caller has to re-authenticate the profile
    pub fn is_session_expired(&self) -> bool {
        matches!(self, Self::SessionExpired { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_error_creation() {
        let err = Error::config("test config error");
        assert!(matches!(err, Error::Config(_)));
        assert_eq!(err.to_string(), "Configuration error: test config error");
    }

    #[test]
    fn test_error_from_json() {
        let json_err = serde_json::from_str::<serde_json::Value>("invalid json");
        assert!(json_err.is_err());

        let err: Error = json_err.unwrap_err().into();
        assert!(matches!(err, Error::Json(_)));
        assert_eq!(err.kind(), ErrorKind::InvalidResponseShape);
    }

    #[rstest]
    #[case(429, ErrorKind::RateLimited, true)]
    #[case(408, ErrorKind::RequestTimeout, true)]
    #[case(500, ErrorKind::ServerError, true)]
    #[case(503, ErrorKind::ServerError, true)]
    #[case(400, ErrorKind::ClientError, false)]
    #[case(401, ErrorKind::ClientError, false)]
    #[case(403, ErrorKind::ClientError, false)]
    #[case(404, ErrorKind::ClientError, false)]
    fn test_http_classification(
        #[case] status: u16,
        #[case] kind: ErrorKind,
        #[case] retryable: bool,
    ) {
        let err = Error::http(status, "boom", "");
        assert_eq!(err.kind(), kind);
        assert_eq!(err.kind().is_retryable(), retryable);
        assert_eq!(err.status(), Some(status));
    }

    #[test]
    fn test_transport_is_retryable_timeout_is_not() {
        assert!(Error::transport("connection refused").kind().is_retryable());
        let timeout = Error::timeout(std::time::Duration::from_millis(1500));
        assert_eq!(timeout.kind(), ErrorKind::Timeout);
        assert!(!timeout.kind().is_retryable());
        assert_eq!(timeout.to_string(), "Request timed out after 1500 ms");
    }

    #[test]
    fn test_decode_errors_are_terminal() {
        assert!(!Error::protocol_decode("short").kind().is_retryable());
        assert!(!Error::invalid_response("missing dialogs").kind().is_retryable());
    }

    #[test]
    fn test_session_expired() {
        let err = Error::session_expired("p-1", "unauthorized");
        assert!(err.is_session_expired());
        assert_eq!(err.status(), Some(401));
        assert_eq!(err.kind(), ErrorKind::ClientError);
        assert!(err.to_string().contains("p-1"));
    }

    #[test]
    fn test_kind_labels() {
        assert_eq!(ErrorKind::Transport.to_string(), "network-transport");
        assert_eq!(ErrorKind::ServerError.as_str(), "http-5xx");
    }
}
