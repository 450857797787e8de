//! Session factories: where a session's data lives between requests.

use crate::cached::CachedSessionBackend;
use crate::codec::SessionData;
use crate::dict::SessionDict;
use crate::error::SessionResult;
use crate::traits::{
    LoadedSession, SessionBackend, SessionContext, SessionFactory, generate_session_id,
    is_valid_sid,
};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use trestle_core::HttpResponse;
use trestle_log::debug;

/// Cookie field holding the session id for backend sessions.
pub const SID_KEY: &str = "_sid";

/// Keeps the whole session in its signed cookie.
#[derive(Debug, Clone, Copy, Default)]
pub struct CookieSessionFactory;

impl CookieSessionFactory {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl SessionFactory for CookieSessionFactory {
    async fn load(&self, ctx: &SessionContext<'_>) -> SessionResult<LoadedSession> {
        let dict = match ctx.cookies.load_with_max_age(ctx.name, ctx.max_age) {
            Some(data) => SessionDict::from_data(data),
            None => SessionDict::new(),
        };
        Ok(LoadedSession::new(dict))
    }

    async fn save(
        &self,
        ctx: &SessionContext<'_>,
        session: &LoadedSession,
        response: &mut HttpResponse,
    ) -> SessionResult<bool> {
        if !ctx.should_save(&session.dict) {
            return Ok(false);
        }
        ctx.cookies
            .save(response, ctx.name, session.dict.data(), ctx.options)?;
        Ok(true)
    }
}

/// Keeps session data in a [`SessionBackend`]; the cookie carries only the
/// session id.
pub struct BackendSessionFactory<B: SessionBackend> {
    backend: Arc<B>,
}

/// Backend factory over a durable store with a fast cache in front.
pub type DatastoreSessionFactory<D, C> = BackendSessionFactory<CachedSessionBackend<D, C>>;

impl<B: SessionBackend> BackendSessionFactory<B> {
    pub fn new(backend: Arc<B>) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &Arc<B> {
        &self.backend
    }

    /// Session id carried by the request cookie, if it is well-formed.
    fn cookie_sid(&self, ctx: &SessionContext<'_>) -> Option<String> {
        let mut data = ctx.cookies.load_with_max_age(ctx.name, ctx.max_age)?;
        match data.remove(SID_KEY) {
            Some(Value::String(sid)) if is_valid_sid(&sid) => Some(sid),
            _ => {
                debug!(target: "trestle::session", "Session cookie '{}' has no usable id", ctx.name);
                None
            }
        }
    }
}

impl<B: SessionBackend> Clone for BackendSessionFactory<B> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
        }
    }
}

#[async_trait]
impl<B: SessionBackend> SessionFactory for BackendSessionFactory<B> {
    async fn load(&self, ctx: &SessionContext<'_>) -> SessionResult<LoadedSession> {
        if let Some(sid) = self.cookie_sid(ctx) {
            if let Some(data) = self.backend.get_by_sid(&sid).await? {
                return Ok(LoadedSession::with_sid(SessionDict::from_data(data), sid));
            }
            debug!(target: "trestle::session", "No stored data for session '{}'", ctx.name);
        }

        Ok(LoadedSession::with_sid(
            SessionDict::new(),
            generate_session_id(),
        ))
    }

    async fn save(
        &self,
        ctx: &SessionContext<'_>,
        session: &LoadedSession,
        response: &mut HttpResponse,
    ) -> SessionResult<bool> {
        if !ctx.should_save(&session.dict) {
            return Ok(false);
        }

        let sid = match session.sid.as_deref() {
            Some(sid) if is_valid_sid(sid) => sid.to_string(),
            _ => generate_session_id(),
        };
        self.backend.put(&sid, session.dict.data()).await?;

        let mut cookie = SessionData::new();
        cookie.insert(SID_KEY.to_string(), Value::String(sid));
        ctx.cookies.save(response, ctx.name, &cookie, ctx.options)?;
        Ok(true)
    }
}
