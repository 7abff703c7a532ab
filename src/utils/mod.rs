//! Utility functions and helpers
//!
//! This module contains utility functions used throughout the application.

pub mod cache;
pub mod version;

pub use cache::{CacheEntry, Clock, ManualClock, SystemClock, TtlCache};
pub use version::{VERSION, get_version};
