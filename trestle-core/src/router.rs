// Ordered route table with first-match dispatch and reverse lookup by name

use crate::error::{RouteError, RouteResult};
use crate::http::HttpRequest;
use crate::route::{Route, RouteMatch};
use std::collections::HashMap;
use trestle_log::{debug, warn};

/// An ordered collection of routes.
///
/// Routes are tried in insertion order and the first match wins, so more
/// specific templates must be added before more general ones. A router is
/// read-only after configuration and can be shared across threads.
pub struct Router<H> {
    routes: Vec<Route<H>>,
    /// Route name to index into `routes`. Last registration wins.
    names: HashMap<String, usize>,
}

impl<H> Router<H> {
    pub fn new() -> Self {
        Self {
            routes: Vec::new(),
            names: HashMap::new(),
        }
    }

    /// Append a route.
    ///
    /// A route whose name is already registered takes over the name for
    /// building; both routes remain matchable by path.
    pub fn add(&mut self, route: Route<H>) {
        let index = self.routes.len();

        if let Some(name) = route.name() {
            if let Some(previous) = self.names.insert(name.to_string(), index) {
                warn!(
                    target: "trestle::router",
                    "Route name '{}' re-registered: '{}' replaces '{}' for URL building",
                    name,
                    route.template(),
                    self.routes[previous].template()
                );
            }
        }

        debug!(
            target: "trestle::router",
            "Added route #{} '{}'{}",
            index,
            route.template(),
            route.name().map(|n| format!(" as '{}'", n)).unwrap_or_default()
        );

        self.routes.push(route);
    }

    /// Chaining form of [`Router::add`].
    pub fn with_route(mut self, route: Route<H>) -> Self {
        self.add(route);
        self
    }

    /// Find the first route matching `path`.
    pub fn match_path(&self, path: &str) -> Option<RouteMatch<'_, H>> {
        let found = self.routes.iter().find_map(|route| route.match_path(path));
        if found.is_none() {
            debug!(target: "trestle::router", "No route matches '{}'", path);
        }
        found
    }

    /// Match the path of a request; the query string is not considered.
    pub fn match_request(&self, request: &HttpRequest) -> Option<RouteMatch<'_, H>> {
        self.match_path(request.path())
    }

    /// Build the URL path of the route registered under `name`.
    pub fn build(&self, name: &str, args: &[(&str, &str)]) -> RouteResult<String> {
        let route = self
            .get(name)
            .ok_or_else(|| RouteError::RouteNotFound(name.to_string()))?;
        route.build(args)
    }

    pub fn get(&self, name: &str) -> Option<&Route<H>> {
        self.names.get(name).map(|&index| &self.routes[index])
    }

    pub fn routes(&self) -> impl Iterator<Item = &Route<H>> {
        self.routes.iter()
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

impl<H> Default for Router<H> {
    fn default() -> Self {
        Self::new()
    }
}
