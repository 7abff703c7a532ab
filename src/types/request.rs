//! Request type definitions
//!
//! Inputs of the integration client operations.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Who is calling and how hard to try
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallContext {
    /// Upstream profile whose session is used
    pub profile_id: String,

    /// Operator code, checked against active shifts for the operator marker header
    pub operator_code: Option<String>,

    /// Per-attempt deadline override
    pub timeout: Option<Duration>,

    /// Retry budget override
    pub max_retries: Option<u32>,

    /// Base backoff override
    pub base_delay: Option<Duration>,
}

impl CallContext {
    /// Create a context for a profile with the configured retry policy
    pub fn new(profile_id: impl Into<String>) -> Self {
        Self {
            profile_id: profile_id.into(),
            ..Self::default()
        }
    }

    /// Set operator code
    pub fn with_operator_code(mut self, code: impl Into<String>) -> Self {
        self.operator_code = Some(code.into());
        self
    }

    /// Override the per-attempt deadline
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Override the retry budget
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = Some(max_retries);
        self
    }

    /// Override the base backoff
    pub fn with_base_delay(mut self, base_delay: Duration) -> Self {
        self.base_delay = Some(base_delay);
        self
    }
}

/// Dialog list query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DialogsQuery {
    /// Opaque cursor from the previous page
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cursor: Option<String>,

    /// Page size
    pub limit: u32,

    /// Only dialogs whose peer is online
    pub online_only: bool,

    /// Only dialogs with unread messages
    pub unread_only: bool,
}

impl Default for DialogsQuery {
    fn default() -> Self {
        Self {
            cursor: None,
            limit: 15,
            online_only: false,
            unread_only: false,
        }
    }
}

impl DialogsQuery {
    /// Create a query for the first page
    pub fn new() -> Self {
        Self::default()
    }

    /// Continue from a cursor
    pub fn with_cursor(mut self, cursor: impl Into<String>) -> Self {
        self.cursor = Some(cursor.into());
        self
    }

    /// Set page size
    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = limit;
        self
    }

    /// Set online filter
    pub fn with_online_only(mut self, online_only: bool) -> Self {
        self.online_only = online_only;
        self
    }

    /// Set unread filter
    pub fn with_unread_only(mut self, unread_only: bool) -> Self {
        self.unread_only = unread_only;
        self
    }
}

/// Message history query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessagesQuery {
    /// Load messages older than this message id
    pub cursor: Option<u64>,

    /// Page size
    pub limit: u32,
}

impl Default for MessagesQuery {
    fn default() -> Self {
        Self {
            cursor: None,
            limit: 50,
        }
    }
}

impl MessagesQuery {
    /// Create a query for the newest page
    pub fn new() -> Self {
        Self::default()
    }

    /// Continue from a message id
    pub fn with_cursor(mut self, cursor: u64) -> Self {
        self.cursor = Some(cursor);
        self
    }

    /// Set page size
    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = limit;
        self
    }
}

/// Body of an outgoing chat message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessagePayload {
    /// Plain text
    Text { text: String },
    /// Catalog sticker
    Sticker {
        #[serde(rename = "stickerId")]
        sticker_id: u64,
    },
}

impl MessagePayload {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    pub fn sticker(sticker_id: u64) -> Self {
        Self::Sticker { sticker_id }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_call_context_builder() {
        let ctx = CallContext::new("p1")
            .with_operator_code("OP1")
            .with_timeout(Duration::from_secs(2))
            .with_max_retries(0)
            .with_base_delay(Duration::from_millis(10));

        assert_eq!(ctx.profile_id, "p1");
        assert_eq!(ctx.operator_code.as_deref(), Some("OP1"));
        assert_eq!(ctx.timeout, Some(Duration::from_secs(2)));
        assert_eq!(ctx.max_retries, Some(0));
        assert_eq!(ctx.base_delay, Some(Duration::from_millis(10)));
    }

    #[test]
    fn test_dialogs_query_serialization() {
        let query = DialogsQuery::new().with_limit(30).with_online_only(true);
        assert_eq!(
            serde_json::to_value(&query).unwrap(),
            json!({"limit": 30, "onlineOnly": true, "unreadOnly": false})
        );

        let next = query.with_cursor("abc");
        assert_eq!(serde_json::to_value(&next).unwrap()["cursor"], "abc");
    }

    #[test]
    fn test_message_payload_serialization() {
        assert_eq!(
            serde_json::to_value(MessagePayload::text("hi")).unwrap(),
            json!({"text": "hi"})
        );
        assert_eq!(
            serde_json::to_value(MessagePayload::sticker(12)).unwrap(),
            json!({"stickerId": 12})
        );
    }
}
