//! Minimal gRPC-Web wire codec
//!
//! Varints, length-prefixed frames and the one restrictions message shape produced upstream.

pub mod frame;
pub mod restrictions;
pub mod varint;

pub use restrictions::{RestrictionsMessage, Tier, UnsupportedField};
