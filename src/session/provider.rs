//! Session provider seam
//!
//! The session store lives outside this crate. The client reads sessions through
//! [`SessionProvider`], asks for invalidation when the upstream answers 401, and resolves
//! operator markers for outbound headers.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::{Result, types::Session};

/// External collaborator that owns cookie-based sessions
#[async_trait]
pub trait SessionProvider: Send + Sync + std::fmt::Debug {
    /// Current session of `profile_id`, if any
    async fn get_session(&self, profile_id: &str) -> Option<Session>;

    /// Forget the session of `profile_id`
    async fn remove_session(&self, profile_id: &str);

    /// Operator reference attached to an active session of `profile_id`
    async fn active_operator_ref_for_profile(&self, profile_id: &str) -> Result<Option<String>>;

    /// Whether an operator with `code` is currently on shift
    async fn has_active_shift_for_operator_code(&self, code: &str) -> Result<bool>;
}

/// Process-local session registry
#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<String, Session>>,
    operator_refs: RwLock<HashMap<String, String>>,
    active_shifts: RwLock<HashSet<String>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register or replace a session
    pub async fn insert_session(&self, session: Session) {
        let mut sessions = self.sessions.write().await;
        tracing::debug!("Registered session for profile {}", session.profile_id);
        sessions.insert(session.profile_id.clone(), session);
    }

    /// Bind an operator reference to a profile's active session
    pub async fn set_operator_ref(
        &self,
        profile_id: impl Into<String>,
        operator_ref: impl Into<String>,
    ) {
        self.operator_refs
            .write()
            .await
            .insert(profile_id.into(), operator_ref.into());
    }

    /// Mark an operator code as on shift
    pub async fn start_shift(&self, code: impl Into<String>) {
        self.active_shifts.write().await.insert(code.into());
    }

    /// Mark an operator code as off shift
    pub async fn end_shift(&self, code: &str) {
        self.active_shifts.write().await.remove(code);
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }
}

#[async_trait]
impl SessionProvider for InMemorySessionStore {
    async fn get_session(&self, profile_id: &str) -> Option<Session> {
        self.sessions.read().await.get(profile_id).cloned()
    }

    async fn remove_session(&self, profile_id: &str) {
        if self.sessions.write().await.remove(profile_id).is_some() {
            tracing::info!("Session for profile {} invalidated", profile_id);
        }
        self.operator_refs.write().await.remove(profile_id);
    }

    async fn active_operator_ref_for_profile(&self, profile_id: &str) -> Result<Option<String>> {
        if !self.sessions.read().await.contains_key(profile_id) {
            return Ok(None);
        }
        Ok(self.operator_refs.read().await.get(profile_id).cloned())
    }

    async fn has_active_shift_for_operator_code(&self, code: &str) -> Result<bool> {
        Ok(self.active_shifts.read().await.contains(code))
    }
}
