//! Sessions for Trestle.
//!
//! Each request gets a [`SessionStore`]. Handlers ask it for sessions by
//! name; each name is loaded once per request through a [`SessionFactory`]
//! and written back by [`SessionStore::save_sessions`] when the response is
//! finalized.
//!
//! # Factories
//!
//! - [`CookieSessionFactory`] - the whole session lives in a signed cookie.
//! - [`BackendSessionFactory`] - data lives in a [`SessionBackend`]; the
//!   cookie only carries the session id. [`DatastoreSessionFactory`] pairs a
//!   [`DurableStore`] with a [`FastCache`] in front of it.
//!
//! Cookies are signed with HMAC-SHA256 and timestamped. A cookie that fails
//! verification or is too old is treated as absent: the handler gets a new,
//! empty session. Backend errors are returned to the caller.
//!
//! # Examples
//!
//! ## Cookie sessions
//!
//! ```
//! use std::sync::Arc;
//! use trestle_core::{HttpRequest, HttpResponse};
//! use trestle_session::*;
//!
//! # tokio_test::block_on(async {
//! let config = Arc::new(SessionConfig::new("0123456789abcdef0123456789abcdef")?);
//! let factory: Arc<dyn SessionFactory> = Arc::new(CookieSessionFactory::new());
//!
//! let mut store = SessionStore::new(&HttpRequest::get("/login"), config);
//! let session = store.get_default_session(factory).await?;
//! session.set("user_id", 123)?;
//! session.add_flash("Welcome back", Some("info"), None)?;
//!
//! let mut response = HttpResponse::ok();
//! store.save_sessions(&mut response).await?;
//! # Ok::<(), SessionError>(())
//! # }).unwrap();
//! ```
//!
//! ## Server-side sessions
//!
//! ```
//! use std::sync::Arc;
//! use trestle_core::{HttpRequest, HttpResponse};
//! use trestle_session::*;
//!
//! # tokio_test::block_on(async {
//! let backend = CachedSessionBackend::new(
//!     Arc::new(MemoryDurableStore::new()),
//!     Arc::new(MemoryFastCache::new()),
//! );
//! let factory: Arc<dyn SessionFactory> =
//!     Arc::new(DatastoreSessionFactory::new(Arc::new(backend)));
//!
//! let config = Arc::new(SessionConfig::new("0123456789abcdef0123456789abcdef")?);
//! let mut store = SessionStore::new(&HttpRequest::get("/cart"), config);
//! store.get_session("cart", factory).await?.set("items", vec![1, 2, 3])?;
//!
//! let mut response = HttpResponse::ok();
//! store.save_sessions(&mut response).await?;
//! assert!(store.session_id("cart").is_some());
//! # Ok::<(), SessionError>(())
//! # }).unwrap();
//! ```

pub mod cached;
pub mod codec;
pub mod config;
pub mod cookie;
pub mod dict;
pub mod error;
pub mod factory;
pub mod memory;
pub mod store;
pub mod traits;

pub use cached::CachedSessionBackend;
pub use codec::{CODEC_VERSION, SessionData};
pub use config::{CookieOptions, DEFAULT_MAX_AGE, MIN_SECRET_LEN, SavePolicy, SessionConfig};
pub use cookie::{CookieError, SecureCookieSerializer, SecureCookies};
pub use dict::{DEFAULT_FLASH_KEY, Flash, SessionDict};
pub use error::{SessionError, SessionResult};
pub use factory::{
    BackendSessionFactory, CookieSessionFactory, DatastoreSessionFactory, SID_KEY,
};
pub use memory::{MemoryDurableStore, MemoryFastCache};
pub use store::{SessionState, SessionStore};
pub use traits::{
    DurableStore, FastCache, LoadedSession, SessionBackend, SessionContext, SessionFactory,
    generate_session_id, is_valid_sid,
};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::{CookieOptions, SavePolicy, SessionConfig};
    pub use crate::dict::SessionDict;
    pub use crate::error::{SessionError, SessionResult};
    pub use crate::factory::{BackendSessionFactory, CookieSessionFactory, DatastoreSessionFactory};
    pub use crate::store::{SessionState, SessionStore};
    pub use crate::traits::{SessionBackend, SessionFactory};
}
