//! Session factory and storage traits.

use crate::codec::SessionData;
use crate::config::{CookieOptions, SavePolicy};
use crate::cookie::SecureCookies;
use crate::dict::SessionDict;
use crate::error::SessionResult;
use async_trait::async_trait;
use trestle_core::HttpResponse;

/// Length of a session id produced by [`generate_session_id`].
pub const SESSION_ID_LEN: usize = 32;

/// Everything a factory needs to load or save one named session.
#[derive(Debug, Clone, Copy)]
pub struct SessionContext<'a> {
    /// Session name, which is also the cookie name.
    pub name: &'a str,
    pub options: &'a CookieOptions,
    pub cookies: &'a SecureCookies,
    /// Oldest cookie signature, in seconds, this session accepts.
    pub max_age: Option<i64>,
    pub save_policy: SavePolicy,
}

impl SessionContext<'_> {
    /// Whether `session` has to be written back under the active policy.
    pub fn should_save(&self, session: &SessionDict) -> bool {
        self.save_policy.should_save(session)
    }
}

/// A session as produced by a factory.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedSession {
    pub dict: SessionDict,
    /// Backend key, for factories that keep data server-side.
    pub sid: Option<String>,
}

impl LoadedSession {
    pub fn new(dict: SessionDict) -> Self {
        Self { dict, sid: None }
    }

    pub fn with_sid(dict: SessionDict, sid: impl Into<String>) -> Self {
        Self {
            dict,
            sid: Some(sid.into()),
        }
    }
}

/// Strategy for restoring and persisting a named session.
///
/// Factories hold no per-request state: one instance is configured at
/// startup and shared by every request.
///
/// # Examples
///
/// ```ignore
/// let factory: Arc<dyn SessionFactory> = Arc::new(CookieSessionFactory::new());
/// let session = store.get_session("session", factory).await?;
/// ```
#[async_trait]
pub trait SessionFactory: Send + Sync {
    /// Restore the session named `ctx.name`, or start a new one.
    ///
    /// Invalid or expired cookies yield a new session. Backend failures are
    /// returned as errors.
    async fn load(&self, ctx: &SessionContext<'_>) -> SessionResult<LoadedSession>;

    /// Persist `session` if the save policy requires it.
    ///
    /// Returns `true` when anything was written.
    async fn save(
        &self,
        ctx: &SessionContext<'_>,
        session: &LoadedSession,
        response: &mut HttpResponse,
    ) -> SessionResult<bool>;
}

/// Server-side session storage keyed by session id.
#[async_trait]
pub trait SessionBackend: Send + Sync {
    /// Data stored under `sid`, or `None` if there is none.
    async fn get_by_sid(&self, sid: &str) -> SessionResult<Option<SessionData>>;

    /// Store `data` under `sid`, replacing any previous value.
    async fn put(&self, sid: &str, data: &SessionData) -> SessionResult<()>;
}

/// Authoritative storage for encoded session payloads.
#[async_trait]
pub trait DurableStore: Send + Sync {
    async fn get(&self, sid: &str) -> SessionResult<Option<String>>;

    async fn put(&self, sid: &str, value: String) -> SessionResult<()>;
}

/// Best-effort key/value cache in front of a [`DurableStore`].
///
/// Errors from a cache are never fatal to a request.
#[async_trait]
pub trait FastCache: Send + Sync {
    async fn get(&self, key: &str) -> SessionResult<Option<String>>;

    async fn set(&self, key: &str, value: String) -> SessionResult<()>;

    /// Remove `key`. Removing a missing key is not an error.
    async fn delete(&self, key: &str) -> SessionResult<()>;
}

/// Generate a new random session id.
pub fn generate_session_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

/// Whether `sid` has the shape of an id from [`generate_session_id`].
pub fn is_valid_sid(sid: &str) -> bool {
    sid.len() == SESSION_ID_LEN
        && sid
            .bytes()
            .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
}
