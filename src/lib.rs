//! ChatLink Client - Rust Implementation
//!
//! A resilient outbound integration client for a third-party chat platform. Operators work
//! dialogs of platform profiles through a dashboard; this crate is the part that talks to the
//! platform on their behalf.
//!
//! # Architecture
//!
//! The crate is layered bottom-up:
//! - **Codec**: varints, gRPC-Web frames and the restrictions message
//! - **Session**: the session-store seam and outbound header composition
//! - **Network**: transport seam, retry policy and the retrying request executor
//! - **Client**: the integration façade with a TTL-cached sticker catalog
//!
//! # Usage
//!
//! ## Command line
//!
//! ```bash
//! chatlink --profile-id 1001 --cookie "sid=..." dialogs --limit 20
//! chatlink --mock restrictions 1002
//! ```
//!
//! # Examples
//!
//! ```rust
//! use std::sync::Arc;
//! use chatlink_client::{Settings, UpstreamClient};
//! use chatlink_client::session::InMemorySessionStore;
//! use chatlink_client::types::{CallContext, Session};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let store = Arc::new(InMemorySessionStore::new());
//! store.insert_session(Session::new("1001", "sid=abc")).await;
//!
//! let client = UpstreamClient::new(Settings::default(), store)?;
//! let account = client.fetch_account(&CallContext::new("1001")).await?;
//! println!("{}", account.name);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod codec;
pub mod config;
pub mod error;
pub mod network;
pub mod session;
pub mod types;
pub mod utils;

pub use client::UpstreamClient;
pub use config::Settings;
pub use error::{Error, ErrorKind, Result};
pub use types::{CallContext, ErrorResponse};
