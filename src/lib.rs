//! # Trestle
//!
//! Template-based URL routing and signed, pluggable sessions.
//!
//! - [`Router`] dispatches a path to the first matching [`Route`] and builds
//!   URLs for named routes from templates such as `/{year:\d{4}}/{slug}`.
//! - With the `session` feature (on by default), `session::SessionStore`
//!   gives each request lazily loaded named sessions kept in signed cookies
//!   or in a server-side backend.
//!
//! ```
//! use trestle::prelude::*;
//!
//! let router = Router::new()
//!     .with_route(Route::new("/", "index").unwrap().with_name("index"))
//!     .with_route(Route::new("/users/{id:\\d+}", "user").unwrap().with_name("user"));
//!
//! let request = HttpRequest::get("/users/42?tab=posts");
//! let matched = router.match_request(&request).unwrap();
//! assert_eq!(*matched.handler(), "user");
//! assert_eq!(matched.param("id"), Some("42"));
//! assert_eq!(router.build("user", &[("id", "7")]).unwrap(), "/users/7");
//! ```

// Re-export routing
pub use trestle_core::*;

// Re-export logging
pub use trestle_log as log;

// Re-export sessions
#[cfg(feature = "session")]
pub use trestle_session as session;

// Prelude for common imports
pub mod prelude {
    pub use trestle_core::prelude::*;

    #[cfg(feature = "session")]
    pub use trestle_session::prelude::*;
}
