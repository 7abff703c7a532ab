//! Type definitions for the integration client
//!
//! This module contains the operation inputs, the typed results and the session record.

pub mod internal;
pub mod request;
pub mod response;

pub use internal::Session;
pub use request::{CallContext, DialogsQuery, MessagePayload, MessagesQuery};
pub use response::{
    Account, Dialog, DialogsPage, ErrorResponse, Message, MessagesPage, SendOutcome, Sticker,
    StickerCatalog, StickerCategory,
};
