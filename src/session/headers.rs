//! Outbound header composition
//!
//! Turns a [`Session`] plus the resource being accessed into the header set the upstream
//! expects. The upstream checks `referer`/`origin` against the resource path, so both are
//! derived from the resource rather than fixed.

use std::sync::Arc;

use reqwest::header::{
    ACCEPT, COOKIE, HeaderMap, HeaderName, HeaderValue, ORIGIN, REFERER, USER_AGENT,
};
use tracing::debug;
use url::Url;

use super::SessionProvider;
use crate::{Error, Result, types::Session};

/// Header carrying the operator working the profile
pub const OPERATOR_REF_HEADER: HeaderName = HeaderName::from_static("x-operator-ref");

const DEFAULT_ACCEPT: &str = "application/json, text/plain, */*";

/// Logical upstream resource a request touches
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    /// Dialog list
    Inbox,
    /// One dialog
    Dialog(u64),
    /// Sticker catalog
    Stickers,
    /// Own account
    Account,
}

impl Resource {
    fn page_path(&self) -> String {
        match self {
            Self::Inbox | Self::Stickers => "chats".to_string(),
            Self::Dialog(id) => format!("chats/{}", id),
            Self::Account => "account".to_string(),
        }
    }
}

/// Per-request inputs to header composition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderContext {
    pub resource: Resource,
    /// Operator code supplied by the caller, checked against active shifts
    pub operator_code: Option<String>,
}

impl HeaderContext {
    pub fn new(resource: Resource) -> Self {
        Self {
            resource,
            operator_code: None,
        }
    }

    pub fn with_operator_code(mut self, code: impl Into<String>) -> Self {
        self.operator_code = Some(code.into());
        self
    }
}

/// Builds request headers from a session record
#[derive(Debug, Clone)]
pub struct HeaderComposer {
    base_url: Url,
    user_agent: HeaderValue,
    lookup: Arc<dyn SessionProvider>,
}

impl HeaderComposer {
    pub fn new(base_url: &str, user_agent: &str, lookup: Arc<dyn SessionProvider>) -> Result<Self> {
        let base_url = Url::parse(base_url)?;
        let user_agent = HeaderValue::from_str(user_agent)
            .map_err(|e| Error::config(format!("Invalid user agent: {}", e)))?;

        Ok(Self {
            base_url,
            user_agent,
            lookup,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// `referer` value for a resource
    pub fn referer_for(&self, resource: Resource) -> String {
        format!(
            "{}/{}",
            self.base_url.as_str().trim_end_matches('/'),
            resource.page_path()
        )
    }

    /// `origin` value of the configured base URL
    pub fn origin(&self) -> String {
        self.base_url.origin().ascii_serialization()
    }

    /// Compose headers for one request.
    ///
    /// The operator marker lookup never fails the request; on error or miss the header is
    /// left out.
    pub async fn build_headers(&self, session: &Session, context: &HeaderContext) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();

        let cookie = HeaderValue::from_str(&session.cookie).map_err(|_| {
            Error::session(format!(
                "cookie of profile {} is not a valid header value",
                session.profile_id
            ))
        })?;
        headers.insert(COOKIE, cookie);
        headers.insert(USER_AGENT, self.user_agent.clone());
        headers.insert(ACCEPT, HeaderValue::from_static(DEFAULT_ACCEPT));

        insert_str(&mut headers, ORIGIN, &self.origin())?;
        insert_str(&mut headers, REFERER, &self.referer_for(context.resource))?;

        if let Some(operator_ref) = self.resolve_operator_ref(session, context).await {
            match HeaderValue::from_str(&operator_ref) {
                Ok(value) => {
                    headers.insert(OPERATOR_REF_HEADER, value);
                }
                Err(_) => debug!("Operator reference {:?} is not a header value", operator_ref),
            }
        }

        Ok(headers)
    }

    async fn resolve_operator_ref(&self, session: &Session, context: &HeaderContext) -> Option<String> {
        match self
            .lookup
            .active_operator_ref_for_profile(&session.profile_id)
            .await
        {
            Ok(Some(operator_ref)) => return Some(operator_ref),
            Ok(None) => {}
            Err(e) => debug!(
                "Operator lookup for profile {} failed: {}",
                session.profile_id, e
            ),
        }

        let code = context.operator_code.as_deref()?;
        match self.lookup.has_active_shift_for_operator_code(code).await {
            Ok(true) => Some(code.to_string()),
            Ok(false) => {
                debug!("Operator code {} has no active shift", code);
                None
            }
            Err(e) => {
                debug!("Shift lookup for operator code {} failed: {}", code, e);
                None
            }
        }
    }
}

fn insert_str(headers: &mut HeaderMap, name: HeaderName, value: &str) -> Result<()> {
    let value = HeaderValue::from_str(value)
        .map_err(|e| Error::config(format!("Invalid {} header: {}", name, e)))?;
    headers.insert(name, value);
    Ok(())
}
