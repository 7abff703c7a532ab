//! Response type definitions
//!
//! Typed results of the integration client operations, deserialized from the upstream's
//! JSON and re-serialized unchanged for callers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Own account of a profile
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub is_online: bool,
    #[serde(default)]
    pub credits: Option<u64>,
}

/// One conversation with a platform user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dialog {
    pub id: u64,
    pub user_id: u64,
    pub name: String,
    #[serde(default)]
    pub last_message: Option<String>,
    #[serde(default)]
    pub unread_count: u32,
    #[serde(default)]
    pub is_online: bool,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Page of dialogs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DialogsPage {
    pub dialogs: Vec<Dialog>,
    /// Cursor of the next page, absent on the last one
    #[serde(default)]
    pub cursor: Option<String>,
}

/// One chat message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: u64,
    pub dialog_id: u64,
    /// Whether the profile (not the peer) sent it
    pub outgoing: bool,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub sticker_id: Option<u64>,
    pub created_at: DateTime<Utc>,
}

/// Page of messages, newest first
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagesPage {
    pub messages: Vec<Message>,
    #[serde(default)]
    pub has_more: bool,
}

/// Result of a send: delivery is a value, not an error
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendOutcome {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<u64>,
    /// Upstream explanation when `success` is false
    #[serde(default, skip_serializing_if = "Option::is_none", alias = "error")]
    pub message: Option<String>,
}

impl SendOutcome {
    /// Create a successful outcome
    pub fn delivered(message_id: u64) -> Self {
        Self {
            success: true,
            message_id: Some(message_id),
            message: None,
        }
    }

    /// Create a rejected outcome
    pub fn rejected(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message_id: None,
            message: Some(message.into()),
        }
    }
}

/// Catalog sticker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sticker {
    pub id: u64,
    pub url: String,
}

/// Named group of stickers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StickerCategory {
    pub name: String,
    pub stickers: Vec<Sticker>,
}

/// Sticker catalog of a profile
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StickerCatalog {
    pub categories: Vec<StickerCategory>,
}

impl StickerCatalog {
    /// Total stickers across categories
    pub fn sticker_count(&self) -> usize {
        self.categories.iter().map(|c| c.stickers.len()).sum()
    }
}

/// Error response for failed CLI calls
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub success: bool,
    /// Error message
    pub error: String,
    /// Classified error kind
    pub kind: String,
    /// HTTP status, when the upstream answered
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
}

impl ErrorResponse {
    /// Create a new error response
    pub fn new(error: &crate::Error) -> Self {
        Self {
            success: false,
            error: error.to_string(),
            kind: error.kind().to_string(),
            status: error.status(),
        }
    }
}
