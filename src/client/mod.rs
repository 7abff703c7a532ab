//! Integration façade over the upstream chat platform
//!
//! [`UpstreamClient`] is the only entry point dashboard code needs; everything below it
//! (headers, retries, decoding, caching) is wired together here.

mod mock;
pub mod upstream;

pub use upstream::UpstreamClient;
