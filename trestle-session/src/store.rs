//! Per-request session registry.

use crate::codec::SessionData;
use crate::config::{CookieOptions, SessionConfig};
use crate::cookie::{SecureCookieSerializer, SecureCookies};
use crate::dict::SessionDict;
use crate::error::SessionResult;
use crate::traits::{LoadedSession, SessionContext, SessionFactory};
use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use std::sync::Arc;
use trestle_core::{HttpRequest, HttpResponse};
use trestle_log::debug;

/// Lifecycle of one named session within a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Not requested yet.
    Unloaded,
    /// Loaded and not modified.
    Clean,
    /// Loaded and modified since.
    Dirty,
    /// Written by [`SessionStore::save_sessions`].
    Saved,
}

struct ActiveSession {
    factory: Arc<dyn SessionFactory>,
    options: CookieOptions,
    session: LoadedSession,
    saved: bool,
}

/// The sessions of one request.
///
/// A store is created from the incoming request, handed to the handler,
/// and finalized with [`save_sessions`](Self::save_sessions) once the
/// response exists. It is never shared between requests.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use trestle_core::{HttpRequest, HttpResponse};
/// use trestle_session::{CookieSessionFactory, SessionConfig, SessionFactory, SessionStore};
///
/// # tokio_test::block_on(async {
/// let config = Arc::new(SessionConfig::new("0123456789abcdef0123456789abcdef").unwrap());
/// let factory: Arc<dyn SessionFactory> = Arc::new(CookieSessionFactory::new());
///
/// let mut store = SessionStore::new(&HttpRequest::get("/"), config);
/// let session = store.get_default_session(factory).await.unwrap();
/// session.set("user_id", 42).unwrap();
///
/// let mut response = HttpResponse::ok();
/// store.save_sessions(&mut response).await.unwrap();
/// assert!(response.cookie("session").is_some());
/// # });
/// ```
pub struct SessionStore {
    config: Arc<SessionConfig>,
    cookies: SecureCookies,
    sessions: BTreeMap<String, ActiveSession>,
}

impl SessionStore {
    /// Snapshot the cookies of `request`.
    pub fn new(request: &HttpRequest, config: Arc<SessionConfig>) -> Self {
        let serializer = SecureCookieSerializer::new(config.secret.as_bytes());
        let cookies = SecureCookies::from_request(request, serializer, config.max_age);
        Self {
            config,
            cookies,
            sessions: BTreeMap::new(),
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// The session named `name`, loading it through `factory` on first use.
    ///
    /// Later calls with the same name return the already loaded session;
    /// their factory argument is ignored.
    pub async fn get_session(
        &mut self,
        name: &str,
        factory: Arc<dyn SessionFactory>,
    ) -> SessionResult<&mut SessionDict> {
        let options = self.config.cookie.clone();
        self.get_session_with(name, factory, options).await
    }

    /// Like [`get_session`](Self::get_session), with cookie attributes
    /// overriding the configured ones for this session.
    pub async fn get_session_with(
        &mut self,
        name: &str,
        factory: Arc<dyn SessionFactory>,
        options: CookieOptions,
    ) -> SessionResult<&mut SessionDict> {
        let active = match self.sessions.entry(name.to_string()) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                let ctx = SessionContext {
                    name,
                    options: &options,
                    cookies: &self.cookies,
                    max_age: options.max_age.or(self.config.max_age),
                    save_policy: self.config.save_policy,
                };
                let session = factory.load(&ctx).await?;
                debug!(
                    target: "trestle::session",
                    "Loaded session '{}' (new: {})",
                    name,
                    session.dict.is_new()
                );
                entry.insert(ActiveSession {
                    factory,
                    options,
                    session,
                    saved: false,
                })
            }
        };
        Ok(&mut active.session.dict)
    }

    /// The session named by [`SessionConfig::default_name`].
    pub async fn get_default_session(
        &mut self,
        factory: Arc<dyn SessionFactory>,
    ) -> SessionResult<&mut SessionDict> {
        let name = self.config.default_name.clone();
        self.get_session(&name, factory).await
    }

    /// An already loaded session.
    pub fn session(&self, name: &str) -> Option<&SessionDict> {
        self.sessions.get(name).map(|active| &active.session.dict)
    }

    pub fn session_mut(&mut self, name: &str) -> Option<&mut SessionDict> {
        self.sessions
            .get_mut(name)
            .map(|active| &mut active.session.dict)
    }

    /// Backend id of a loaded session, for factories that use one.
    pub fn session_id(&self, name: &str) -> Option<&str> {
        self.sessions
            .get(name)
            .and_then(|active| active.session.sid.as_deref())
    }

    pub fn state(&self, name: &str) -> SessionState {
        match self.sessions.get(name) {
            None => SessionState::Unloaded,
            Some(active) if active.saved => SessionState::Saved,
            Some(active) if active.session.dict.is_modified() => SessionState::Dirty,
            Some(_) => SessionState::Clean,
        }
    }

    /// Names of loaded sessions.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.sessions.keys().map(String::as_str)
    }

    /// Persist every loaded session that has not been written yet.
    ///
    /// Returns how many sessions were written. A session the save policy
    /// skipped is checked again by the next call. Backend failures abort and
    /// are returned; sessions already written stay saved.
    pub async fn save_sessions(&mut self, response: &mut HttpResponse) -> SessionResult<usize> {
        let mut written = 0;
        for (name, active) in self.sessions.iter_mut().filter(|(_, active)| !active.saved) {
            let ctx = SessionContext {
                name,
                options: &active.options,
                cookies: &self.cookies,
                max_age: active.options.max_age.or(self.config.max_age),
                save_policy: self.config.save_policy,
            };
            if active.factory.save(&ctx, &active.session, response).await? {
                debug!(target: "trestle::session", "Saved session '{}'", name);
                written += 1;
                active.saved = true;
            }
        }
        Ok(written)
    }

    /// Verify and decode the signed request cookie `name`.
    pub fn load_secure_cookie(&self, name: &str) -> Option<SessionData> {
        self.cookies.load(name)
    }

    /// Sign `data` and set it on `response` as cookie `name`.
    pub fn save_secure_cookie(
        &self,
        response: &mut HttpResponse,
        name: &str,
        data: &SessionData,
        options: &CookieOptions,
    ) -> SessionResult<()> {
        self.cookies.save(response, name, data, options)
    }
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("sessions", &self.sessions.keys().collect::<Vec<_>>())
            .finish()
    }
}
