//! Common test utilities and helpers
//!
//! This module provides shared utilities for integration tests.

#![allow(dead_code)]

/// Test helper functions
pub mod helpers {
    use chatlink_client::{
        Settings, UpstreamClient,
        network::FixedJitter,
        session::InMemorySessionStore,
        types::Session,
    };
    use std::sync::Arc;

    pub const PROFILE_ID: &str = "1001";
    pub const COOKIE: &str = "sid=test-session";

    /// Settings pointing at a mock server with millisecond backoff
    pub fn create_test_settings(base_url: &str) -> Settings {
        let mut settings = Settings::default();
        settings.upstream.base_url = base_url.to_string();
        settings.retry.base_delay_ms = 1;
        settings.retry.timeout_ms = 2_000;
        settings
    }

    /// Session store holding one session for [`PROFILE_ID`]
    pub async fn create_test_store() -> Arc<InMemorySessionStore> {
        let store = Arc::new(InMemorySessionStore::new());
        store.insert_session(Session::new(PROFILE_ID, COOKIE)).await;
        store
    }

    /// Client without jitter against `base_url`
    pub fn create_test_client(base_url: &str, store: Arc<InMemorySessionStore>) -> UpstreamClient {
        UpstreamClient::new(create_test_settings(base_url), store)
            .unwrap()
            .with_jitter(Arc::new(FixedJitter::none()))
    }
}
