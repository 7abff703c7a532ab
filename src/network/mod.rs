//! Outbound request execution
//!
//! This module holds the transport seam, the retry policy and the executor that ties them
//! together.

pub mod executor;
pub mod retry;
pub mod transport;

pub use executor::{RequestExecutor, RequestSpec, Response};
pub use retry::{FixedJitter, JitterSource, RandomJitter, RetryDecision, RetryPredicate};
pub use transport::{HttpRequest, HttpResponse, ReqwestTransport, Transport};
