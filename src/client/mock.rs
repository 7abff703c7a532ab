//! Deterministic fixtures served in [`Mode::Mock`](crate::config::Mode::Mock)

use chrono::{DateTime, TimeZone, Utc};

use crate::codec::{RestrictionsMessage, restrictions};
use crate::types::{
    Account, Dialog, DialogsPage, Message, MessagePayload, MessagesPage, SendOutcome, Sticker,
    StickerCatalog, StickerCategory,
};
use crate::{Result, types::DialogsQuery};

fn fixed_time(minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, 1, 12, minute, 0)
        .single()
        .unwrap_or_default()
}

fn profile_number(profile_id: &str) -> u64 {
    profile_id.parse().unwrap_or(1)
}

/// Fixture message id derived from the dialog; saturates for huge dialog ids
fn message_id(dialog_id: u64, seq: u64) -> u64 {
    dialog_id.saturating_mul(100).saturating_add(seq)
}

pub(crate) fn account(profile_id: &str) -> Account {
    Account {
        id: profile_number(profile_id),
        name: format!("Mock profile {}", profile_id),
        is_online: true,
        credits: Some(100),
    }
}

pub(crate) fn dialogs(query: &DialogsQuery) -> DialogsPage {
    let dialogs = (1..=3u64)
        .map(|i| Dialog {
            id: 1000 + i,
            user_id: 500 + i,
            name: format!("Mock user {}", i),
            last_message: Some("Hello!".to_string()),
            unread_count: (i % 2) as u32,
            is_online: i != 2,
            updated_at: Some(fixed_time(i as u32)),
        })
        .filter(|d| !query.online_only || d.is_online)
        .filter(|d| !query.unread_only || d.unread_count > 0)
        .take(query.limit as usize)
        .collect();

    DialogsPage {
        dialogs,
        cursor: None,
    }
}

pub(crate) fn messages(dialog_id: u64, limit: u32) -> MessagesPage {
    let messages = (1..=4u64)
        .rev()
        .map(|i| Message {
            id: message_id(dialog_id, i),
            dialog_id,
            outgoing: i % 2 == 0,
            text: Some(format!("Mock message {}", i)),
            sticker_id: None,
            created_at: fixed_time(i as u32),
        })
        .take(limit as usize)
        .collect();

    MessagesPage {
        messages,
        has_more: false,
    }
}

pub(crate) fn send(dialog_id: u64, payload: &MessagePayload) -> SendOutcome {
    match payload {
        MessagePayload::Text { text } if text.trim().is_empty() => {
            SendOutcome::rejected("message text is empty")
        }
        _ => SendOutcome::delivered(message_id(dialog_id, 99)),
    }
}

pub(crate) fn stickers() -> StickerCatalog {
    let category = |name: &str, first: u64| StickerCategory {
        name: name.to_string(),
        stickers: (first..first + 2)
            .map(|id| Sticker {
                id,
                url: format!("https://cdn.example.com/stickers/{}.png", id),
            })
            .collect(),
    };

    StickerCatalog {
        categories: vec![category("love", 1), category("fun", 10)],
    }
}

pub(crate) fn restrictions() -> Result<RestrictionsMessage> {
    restrictions::decode(restrictions::SAMPLE_RESPONSE)
}
