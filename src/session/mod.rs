//! Session access and header composition
//!
//! This module holds the seam to the external session store and the builder that turns a
//! session into outbound request headers.

pub mod headers;
pub mod provider;

pub use headers::{HeaderComposer, HeaderContext, OPERATOR_REF_HEADER, Resource};
pub use provider::{InMemorySessionStore, SessionProvider};
