//! Internal data structures
//!
//! Defines the session record read from the session provider.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Cookie-based session of one upstream profile
///
/// Owned by the session provider; the client only reads it.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Session {
    /// Profile (account) identifier
    pub profile_id: String,
    /// Raw `cookie` header value
    pub cookie: String,
    /// Refresh token, if the provider keeps one
    pub refresh_token: Option<String>,
    /// Expiration timestamp
    pub expires_at: Option<DateTime<Utc>>,
}

impl Session {
    /// Create new session data
    pub fn new(profile_id: impl Into<String>, cookie: impl Into<String>) -> Self {
        Self {
            profile_id: profile_id.into(),
            cookie: cookie.into(),
            refresh_token: None,
            expires_at: None,
        }
    }

    /// Set refresh token
    pub fn with_refresh_token(mut self, refresh_token: impl Into<String>) -> Self {
        self.refresh_token = Some(refresh_token.into());
        self
    }

    /// Set expiration timestamp
    pub fn with_expires_at(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    /// Check if session data has expired
    pub fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|at| Utc::now() > at)
    }
}

// Cookies and refresh tokens are credentials
impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("profile_id", &self.profile_id)
            .field("cookie", &"<redacted>")
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_session_creation() {
        let expires_at = Utc::now() + Duration::hours(6);
        let session = Session::new("profile-1", "sid=abc")
            .with_refresh_token("refresh")
            .with_expires_at(expires_at);

        assert_eq!(session.profile_id, "profile-1");
        assert_eq!(session.cookie, "sid=abc");
        assert_eq!(session.refresh_token.as_deref(), Some("refresh"));
        assert!(!session.is_expired());
    }

    #[test]
    fn test_session_expiration() {
        let past_time = Utc::now() - Duration::hours(1);
        let session = Session::new("p", "c").with_expires_at(past_time);

        assert!(session.is_expired());
    }

    #[test]
    fn test_session_without_expiry_never_expires() {
        let session = Session::new("p", "c");
        assert!(!session.is_expired());
    }

    #[test]
    fn test_debug_redacts_cookie() {
        let session = Session::new("p", "sid=secret").with_refresh_token("also-secret");
        let debug = format!("{:?}", session);
        assert!(!debug.contains("secret"));
        assert!(debug.contains("<redacted>"));
    }

    #[test]
    fn test_json_serialization() {
        let session = Session::new("p", "sid=1").with_expires_at(Utc::now());
        let json = serde_json::to_string(&session).unwrap();
        let deserialized: Session = serde_json::from_str(&json).unwrap();
        assert_eq!(session, deserialized);
    }
}
