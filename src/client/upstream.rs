//! # Upstream Integration Client
//!
//! [`UpstreamClient`] is the façade the dashboard talks to. Every operation follows the same
//! path:
//!
//! 1. Look up the profile's session through the [`SessionProvider`]
//! 2. Compose headers for the resource being accessed
//! 3. Run the request through the [`RequestExecutor`] (deadline, retries, 401 invalidation)
//! 4. Decode JSON, or the gRPC-Web restrictions frame, into a typed result
//!
//! ## Examples
//!
//! ```rust
//! use std::sync::Arc;
//! use chatlink_client::{UpstreamClient, Settings};
//! use chatlink_client::config::Mode;
//! use chatlink_client::session::InMemorySessionStore;
//! use chatlink_client::types::{CallContext, DialogsQuery};
//!
//! # tokio_test::block_on(async {
//! let mut settings = Settings::default();
//! settings.upstream.mode = Mode::Mock;
//!
//! let client = UpstreamClient::new(settings, Arc::new(InMemorySessionStore::new()))?;
//! let page = client
//!     .fetch_dialogs(&CallContext::new("1001"), &DialogsQuery::new())
//!     .await?;
//! println!("{} dialogs", page.dialogs.len());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! # });
//! ```
//!
//! ## Retry budgets
//!
//! Reads use `retry.max_retries` (3 by default), sends use `retry.write_max_retries` (1 by
//! default). A [`CallContext`] can override the deadline, budget and backoff per call.
//!
//! ## Caching
//!
//! Sticker catalogs are cached per profile for `cache.sticker_ttl_secs` (30 minutes). Nothing
//! else is cached and concurrent identical calls are not de-duplicated.

use std::sync::Arc;

use reqwest::Method;
use reqwest::header::{ACCEPT, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use tracing::{debug, info};
use url::Url;

use super::mock;
use crate::codec::{RestrictionsMessage, Tier, restrictions};
use crate::config::{Mode, Settings};
use crate::network::{
    JitterSource, RequestExecutor, RequestSpec, ReqwestTransport, Transport,
};
use crate::session::{HeaderComposer, HeaderContext, Resource, SessionProvider};
use crate::types::{
    Account, CallContext, DialogsPage, DialogsQuery, MessagePayload, MessagesPage, MessagesQuery,
    SendOutcome, Session, StickerCatalog,
};
use crate::utils::cache::{Clock, TtlCache};
use crate::{Error, Result};

const ACCOUNT_PATH: &str = "platform/account/me";
const DIALOGS_SEARCH_PATH: &str = "platform/chat/search/dialogs";
const STICKERS_PATH: &str = "platform/chat/stickers";
const RESTRICTIONS_PATH: &str = "platform/grpc/chat.RestrictionsService/GetRestrictions";

const GRPC_WEB_PROTO: &str = "application/grpc-web+proto";
const GRPC_STATUS: HeaderName = HeaderName::from_static("grpc-status");
const GRPC_MESSAGE: HeaderName = HeaderName::from_static("grpc-message");
const X_GRPC_WEB: HeaderName = HeaderName::from_static("x-grpc-web");

/// Whether a call changes upstream state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CallKind {
    Read,
    Write,
}

/// Integration client for the upstream chat platform
#[derive(Debug)]
pub struct UpstreamClient {
    /// Configuration settings
    settings: Arc<Settings>,
    /// Base URL all paths are joined to
    base_url: Url,
    /// Session store
    sessions: Arc<dyn SessionProvider>,
    /// Header builder
    headers: HeaderComposer,
    /// Retrying executor
    executor: RequestExecutor,
    /// Sticker catalogs keyed by profile id
    sticker_cache: TtlCache<String, StickerCatalog>,
}

impl UpstreamClient {
    /// Creates a client that talks to the upstream over `reqwest`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] when the settings do not validate.
    pub fn new(settings: Settings, sessions: Arc<dyn SessionProvider>) -> Result<Self> {
        let transport = Arc::new(ReqwestTransport::new()?);
        Self::with_transport(settings, sessions, transport)
    }

    /// Creates a client over a custom transport
    pub fn with_transport(
        settings: Settings,
        sessions: Arc<dyn SessionProvider>,
        transport: Arc<dyn Transport>,
    ) -> Result<Self> {
        settings.validate()?;

        let base_url = base_url_with_slash(&settings.upstream.base_url)?;
        let headers = HeaderComposer::new(
            &settings.upstream.base_url,
            &settings.upstream.user_agent,
            sessions.clone(),
        )?;
        let executor = RequestExecutor::new(transport, sessions.clone());
        let sticker_cache = TtlCache::new(settings.cache.sticker_ttl());

        info!(
            "Upstream client ready for {} ({:?} mode)",
            settings.upstream.base_url, settings.upstream.mode
        );

        Ok(Self {
            settings: Arc::new(settings),
            base_url,
            sessions,
            headers,
            executor,
            sticker_cache,
        })
    }

    /// Replace the retry jitter source
    pub fn with_jitter(mut self, jitter: Arc<dyn JitterSource>) -> Self {
        self.executor = self.executor.with_jitter(jitter);
        self
    }

    /// Replace the clock of the sticker cache (drops cached entries)
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.sticker_cache = TtlCache::with_clock(self.settings.cache.sticker_ttl(), clock);
        self
    }

    /// Live or mock
    pub fn mode(&self) -> Mode {
        self.settings.upstream.mode
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Own account of the profile; doubles as a session check
    pub async fn fetch_account(&self, ctx: &CallContext) -> Result<Account> {
        if self.is_mock() {
            return Ok(mock::account(&ctx.profile_id));
        }

        let url = self.url(ACCOUNT_PATH)?;
        let spec = self
            .prepare(Method::GET, url, ctx, Resource::Account, CallKind::Read)
            .await?
            .with_operation("fetch_account");

        self.executor.execute(&spec).await?.json()
    }

    /// One page of the profile's dialogs
    pub async fn fetch_dialogs(&self, ctx: &CallContext, query: &DialogsQuery) -> Result<DialogsPage> {
        if self.is_mock() {
            return Ok(mock::dialogs(query));
        }

        let url = self.url(DIALOGS_SEARCH_PATH)?;
        let spec = self
            .prepare(Method::POST, url, ctx, Resource::Inbox, CallKind::Read)
            .await?
            .with_operation("fetch_dialogs")
            .with_json(query)?;

        let page: DialogsPage = self.executor.execute(&spec).await?.json()?;
        debug!(
            "Fetched {} dialogs for profile {}",
            page.dialogs.len(),
            ctx.profile_id
        );
        Ok(page)
    }

    /// Message history of one dialog
    pub async fn fetch_messages(
        &self,
        ctx: &CallContext,
        dialog_id: u64,
        query: &MessagesQuery,
    ) -> Result<MessagesPage> {
        if self.is_mock() {
            return Ok(mock::messages(dialog_id, query.limit));
        }

        let mut url = self.url(&messages_path(dialog_id))?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("limit", &query.limit.to_string());
            if let Some(cursor) = query.cursor {
                pairs.append_pair("cursor", &cursor.to_string());
            }
        }

        let spec = self
            .prepare(Method::GET, url, ctx, Resource::Dialog(dialog_id), CallKind::Read)
            .await?
            .with_operation("fetch_messages");

        self.executor.execute(&spec).await?.json()
    }

    /// Send a text message
    pub async fn send_message(
        &self,
        ctx: &CallContext,
        dialog_id: u64,
        text: impl Into<String>,
    ) -> Result<SendOutcome> {
        self.send(ctx, dialog_id, MessagePayload::text(text)).await
    }

    /// Send a catalog sticker
    pub async fn send_sticker(
        &self,
        ctx: &CallContext,
        dialog_id: u64,
        sticker_id: u64,
    ) -> Result<SendOutcome> {
        self.send(ctx, dialog_id, MessagePayload::sticker(sticker_id))
            .await
    }

    /// Sticker catalog, served from cache while fresh
    pub async fn fetch_stickers(&self, ctx: &CallContext) -> Result<StickerCatalog> {
        if let Some(catalog) = self.sticker_cache.get(&ctx.profile_id).await {
            debug!("Sticker catalog for {} served from cache", ctx.profile_id);
            return Ok(catalog);
        }

        let catalog = if self.is_mock() {
            mock::stickers()
        } else {
            let url = self.url(STICKERS_PATH)?;
            let spec = self
                .prepare(Method::GET, url, ctx, Resource::Stickers, CallKind::Read)
                .await?
                .with_operation("fetch_stickers");
            self.executor.execute(&spec).await?.json()?
        };

        self.sticker_cache
            .set(ctx.profile_id.clone(), catalog.clone())
            .await;
        Ok(catalog)
    }

    /// Drop the cached sticker catalog of a profile
    pub async fn invalidate_stickers(&self, profile_id: &str) -> bool {
        self.sticker_cache.invalidate(&profile_id.to_string()).await
    }

    /// Content restrictions of a dialog's peer, decoded from the gRPC-Web endpoint
    pub async fn fetch_restrictions(
        &self,
        ctx: &CallContext,
        dialog_id: u64,
    ) -> Result<RestrictionsMessage> {
        if self.is_mock() {
            return mock::restrictions();
        }

        let url = self.url(RESTRICTIONS_PATH)?;
        let body = restrictions::encode_request(dialog_id)?;
        let spec = self
            .prepare(Method::POST, url, ctx, Resource::Dialog(dialog_id), CallKind::Read)
            .await?
            .with_operation("fetch_restrictions")
            .with_header(CONTENT_TYPE, HeaderValue::from_static(GRPC_WEB_PROTO))
            .with_header(ACCEPT, HeaderValue::from_static(GRPC_WEB_PROTO))
            .with_header(X_GRPC_WEB, HeaderValue::from_static("1"))
            .with_body(body);

        let response = self.executor.execute(&spec).await?;
        check_grpc_status(&response.headers)?;

        let message = restrictions::decode_body(&response.body, response.content_type())?;
        debug!(
            "Restrictions for dialog {}: tier={}, {} categories",
            dialog_id,
            message.tier.map_or("none", Tier::as_str),
            message.categories.len()
        );
        Ok(message)
    }

    async fn send(
        &self,
        ctx: &CallContext,
        dialog_id: u64,
        payload: MessagePayload,
    ) -> Result<SendOutcome> {
        if self.is_mock() {
            return Ok(mock::send(dialog_id, &payload));
        }

        let url = self.url(&messages_path(dialog_id))?;
        let spec = self
            .prepare(Method::POST, url, ctx, Resource::Dialog(dialog_id), CallKind::Write)
            .await?
            .with_operation("send_message")
            .with_json(&payload)?;

        match self.executor.execute(&spec).await {
            Ok(response) => response.json(),
            // The upstream refuses deliveries (blocked peer, limits) with a 4xx; report it as an
            // outcome rather than an error. 401 stays an error.
            Err(Error::Http {
                status, message, ..
            }) if (400..500).contains(&status) && !matches!(status, 408 | 429) => {
                info!(
                    "Upstream rejected message to dialog {} ({}): {}",
                    dialog_id, status, message
                );
                Ok(SendOutcome::rejected(message))
            }
            Err(e) => Err(e),
        }
    }

    fn is_mock(&self) -> bool {
        self.settings.upstream.mode == Mode::Mock
    }

    fn url(&self, path: &str) -> Result<Url> {
        Ok(self.base_url.join(path)?)
    }

    async fn session_for(&self, profile_id: &str) -> Result<Session> {
        let session = self
            .sessions
            .get_session(profile_id)
            .await
            .ok_or_else(|| Error::session_missing(profile_id))?;

        if session.is_expired() {
            return Err(Error::session_expired(profile_id, "session expired locally"));
        }

        Ok(session)
    }

    /// Session lookup, header composition and retry policy for one call
    async fn prepare(
        &self,
        method: Method,
        url: Url,
        ctx: &CallContext,
        resource: Resource,
        kind: CallKind,
    ) -> Result<RequestSpec> {
        let session = self.session_for(&ctx.profile_id).await?;

        let mut header_ctx = HeaderContext::new(resource);
        if let Some(code) = &ctx.operator_code {
            header_ctx = header_ctx.with_operator_code(code.clone());
        }
        let headers: HeaderMap = self.headers.build_headers(&session, &header_ctx).await?;

        let retry = &self.settings.retry;
        let default_retries = match kind {
            CallKind::Read => retry.max_retries,
            CallKind::Write => retry.write_max_retries,
        };

        Ok(RequestSpec::new(method, url)
            .with_headers(headers)
            .with_session_id(ctx.profile_id.clone())
            .with_timeout(ctx.timeout.unwrap_or_else(|| retry.timeout()))
            .with_max_retries(ctx.max_retries.unwrap_or(default_retries))
            .with_base_delay(ctx.base_delay.unwrap_or_else(|| retry.base_delay())))
    }
}

fn messages_path(dialog_id: u64) -> String {
    format!("platform/chat/dialogs/{}/messages", dialog_id)
}

/// Base URL that `Url::join` appends to instead of replacing the last segment
fn base_url_with_slash(base_url: &str) -> Result<Url> {
    let mut url = Url::parse(base_url)?;
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

/// gRPC errors may arrive with HTTP 200 and a non-zero `grpc-status` header
fn check_grpc_status(headers: &HeaderMap) -> Result<()> {
    let status = headers
        .get(GRPC_STATUS)
        .and_then(|value| value.to_str().ok())
        .map(str::trim);

    match status {
        None | Some("0") => Ok(()),
        Some(code) => {
            let message = headers
                .get(GRPC_MESSAGE)
                .and_then(|value| value.to_str().ok())
                .unwrap_or("");
            Err(Error::invalid_response(format!(
                "grpc-status {} {}",
                code, message
            )))
        }
    }
}
