//! Configuration management for the integration client
//!
//! This module handles loading and managing the upstream, retry and cache settings.

pub mod loader;
pub mod settings;

pub use loader::{ConfigLoader, default_config_path};
pub use settings::{CacheSettings, LoggingSettings, Mode, RetrySettings, Settings, UpstreamSettings};
