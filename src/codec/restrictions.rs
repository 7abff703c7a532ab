//! `GetRestrictions` request/response codec
//!
//! The restrictions endpoint only speaks gRPC-Web, so this module builds the one request
//! message it accepts and scans the response for the handful of fields the client needs.
//!
//! This is not a protobuf parser. The response is scanned byte by byte:
//!
//! | tag    | meaning                                                 |
//! |--------|---------------------------------------------------------|
//! | `0x08` | varint boolean, account has exclusive posts             |
//! | `0x12` | category name (one length byte + UTF-8)                 |
//! | `0x1a` | category name                                           |
//! | `0x22` | category name, also marks extended tags                 |
//! | `0x2a` | category name, also marks extended tags                 |
//!
//! Every other byte is skipped on its own and reported in
//! [`RestrictionsMessage::unsupported_fields`]; payloads of unknown fields are not skipped by
//! their encoded length. A schema change upstream invalidates this decoder.
//!
//! The scan ends at the end of the buffer or earlier at either of two trailer boundaries:
//!
//! - a `0x80` trailer frame flag sitting exactly at the end of the data frame declared in the
//!   header (a `0x80` anywhere else is an ordinary unsupported byte)
//! - fewer than [`TRAILER_GUARD_BYTES`] bytes left, applied only when the body after the header
//!   is longer than the guard

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};

use super::frame::{self, FRAME_HEADER_LEN, TRAILER_FRAME_FLAG};
use super::varint;
use crate::{Error, Result};

/// Field #1, varint wire type
pub const TAG_EXCLUSIVE_POSTS: u8 = 0x08;
/// Category tags with a plain meaning
pub const TAG_CATEGORY: [u8; 2] = [0x12, 0x1a];
/// Category tags that also mark extended tags
pub const TAG_EXTENDED_CATEGORY: [u8; 2] = [0x22, 0x2a];

/// Scanning stops once fewer than this many bytes remain in a response whose body is longer
/// than this. The upstream appends a `grpc-status` trailer frame of at least this size.
pub const TRAILER_GUARD_BYTES: usize = 20;

/// Content type of base64-encoded gRPC-Web bodies
pub const GRPC_WEB_TEXT: &str = "application/grpc-web-text";

/// Content access level derived from the decoded flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Special,
    SpecialPlus,
}

impl Tier {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Special => "special",
            Self::SpecialPlus => "specialplus",
        }
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tag byte the scanner did not recognise
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnsupportedField {
    pub offset: usize,
    pub tag: u8,
}

/// Decoded `GetRestrictions` response
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestrictionsMessage {
    pub has_exclusive_posts: bool,
    /// First-seen order, no duplicates
    pub categories: Vec<String>,
    /// Every category occurrence, duplicates kept
    pub all_categories: Vec<String>,
    pub has_extended_tags: bool,
    pub tier: Option<Tier>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub unsupported_fields: Vec<UnsupportedField>,
}

impl RestrictionsMessage {
    /// How often `category` occurred in the response
    pub fn category_count(&self, category: &str) -> usize {
        self.all_categories.iter().filter(|c| *c == category).count()
    }

    fn push_category(&mut self, category: String) {
        if !self.categories.contains(&category) {
            self.categories.push(category.clone());
        }
        self.all_categories.push(category);
    }

    fn derive_tier(&mut self) {
        self.tier = match (self.has_exclusive_posts, self.has_extended_tags) {
            (false, _) => None,
            (true, true) => Some(Tier::SpecialPlus),
            (true, false) => Some(Tier::Special),
        };
    }
}

/// Build the framed request body for a dialog
pub fn encode_request(dialog_id: u64) -> Result<Vec<u8>> {
    let mut payload = Vec::with_capacity(1 + varint::MAX_VARINT_LEN);
    payload.push(TAG_EXCLUSIVE_POSTS);
    varint::encode_into(dialog_id, &mut payload);
    frame::encode_frame(&payload)
}

/// Decode a response body, unwrapping base64 for `application/grpc-web-text`
pub fn decode_body(body: &[u8], content_type: Option<&str>) -> Result<RestrictionsMessage> {
    let is_text = content_type
        .map(|ct| ct.trim().to_ascii_lowercase().starts_with(GRPC_WEB_TEXT))
        .unwrap_or(false);

    if is_text {
        let text: Vec<u8> = body
            .iter()
            .copied()
            .filter(|b| !b.is_ascii_whitespace())
            .collect();
        let raw = STANDARD
            .decode(text)
            .map_err(|e| Error::protocol_decode(format!("invalid grpc-web-text body: {}", e)))?;
        decode(&raw)
    } else {
        decode(body)
    }
}

/// Decode a binary gRPC-Web response
pub fn decode(buf: &[u8]) -> Result<RestrictionsMessage> {
    let (_, declared_len) = frame::read_header(buf)?;
    let data_end = FRAME_HEADER_LEN.saturating_add(declared_len as usize);
    let guarded = buf.len() - FRAME_HEADER_LEN > TRAILER_GUARD_BYTES;

    let mut message = RestrictionsMessage::default();
    let mut offset = FRAME_HEADER_LEN;

    while offset < buf.len() {
        if guarded && buf.len() - offset < TRAILER_GUARD_BYTES {
            break;
        }

        let tag = buf[offset];

        if tag == TRAILER_FRAME_FLAG && offset == data_end {
            break;
        }

        match tag {
            TAG_EXCLUSIVE_POSTS => {
                let (value, consumed) = varint::decode(buf, offset + 1)?;
                message.has_exclusive_posts = value != 0;
                offset += 1 + consumed;
            }
            t if TAG_CATEGORY.contains(&t) || TAG_EXTENDED_CATEGORY.contains(&t) => {
                let (category, consumed) = read_short_string(buf, offset + 1)?;
                if TAG_EXTENDED_CATEGORY.contains(&t) {
                    message.has_extended_tags = true;
                }
                message.push_category(category);
                offset += 1 + consumed;
            }
            other => {
                message.unsupported_fields.push(UnsupportedField { offset, tag: other });
                offset += 1;
            }
        }
    }

    if !message.unsupported_fields.is_empty() {
        tracing::debug!(
            "Skipped {} unsupported bytes in restrictions response",
            message.unsupported_fields.len()
        );
    }

    message.derive_tier();
    Ok(message)
}

/// One length byte followed by that many UTF-8 bytes
fn read_short_string(buf: &[u8], offset: usize) -> Result<(String, usize)> {
    let len = *buf
        .get(offset)
        .ok_or_else(|| Error::protocol_decode(format!("missing length byte at {}", offset)))?
        as usize;

    let start = offset + 1;
    let bytes = buf.get(start..start + len).ok_or_else(|| {
        Error::protocol_decode(format!(
            "string of {} bytes at offset {} runs past end of buffer",
            len, start
        ))
    })?;

    let text = std::str::from_utf8(bytes).map_err(|e| {
        Error::protocol_decode(format!("category at offset {} is not UTF-8: {}", start, e))
    })?;

    Ok((text.to_string(), 1 + len))
}

/// Response shape observed from the live endpoint: flag, four categories (one duplicated, one
/// extended) and a `grpc-status` trailer frame
pub const SAMPLE_RESPONSE: &[u8] = b"\x00\x00\x00\x00\x1c\
\x08\x01\
\x12\x07premium\
\x1a\x03vip\
\x1a\x03vip\
\x22\x05video\
\x80\x00\x00\x00\x0fgrpc-status:0\r\n";
