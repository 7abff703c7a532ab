//! Error handling for the integration client
//!
//! This module defines the error taxonomy shared by the executor, the codec and the façade.

pub mod types;

pub use types::{Error, ErrorKind, Result};
