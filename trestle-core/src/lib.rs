//! # Trestle Core
//!
//! Pattern-based request routing and URL building.
//!
//! A [`Route`] binds a template such as `/articles/{year:\d{4}}/{slug}` to a
//! handler. A [`Router`] holds routes in insertion order, dispatches a path to
//! the first route that matches it, and builds URLs for named routes.
//!
//! ```
//! use trestle_core::{Route, Router, RouteError};
//!
//! let router = Router::new()
//!     .with_route(Route::new("/", "home").unwrap().with_name("home"))
//!     .with_route(
//!         Route::new(r"/articles/{year:\d{4}}/{slug}", "article")
//!             .unwrap()
//!             .with_name("article"),
//!     );
//!
//! let matched = router.match_path("/articles/2010/hello-world").unwrap();
//! assert_eq!(*matched.handler(), "article");
//! assert_eq!(matched.param("slug"), Some("hello-world"));
//!
//! let url = router
//!     .build("article", &[("year", "2011"), ("slug", "again")])
//!     .unwrap();
//! assert_eq!(url, "/articles/2011/again");
//!
//! assert!(matches!(
//!     router.build("archive", &[]),
//!     Err(RouteError::RouteNotFound(_))
//! ));
//! ```

pub mod error;
pub mod http;
pub mod pattern;
pub mod route;
pub mod router;

pub use error::{RouteError, RouteResult};
pub use http::{HttpRequest, HttpResponse, SameSite, SetCookie};
pub use pattern::{DEFAULT_VARIABLE_REGEX, RoutePattern, Segment};
pub use route::{Route, RouteMatch, RouteParams};
pub use router::Router;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::error::{RouteError, RouteResult};
    pub use crate::http::{HttpRequest, HttpResponse, SetCookie};
    pub use crate::route::{Route, RouteMatch, RouteParams};
    pub use crate::router::Router;
}
