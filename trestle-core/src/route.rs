// Named routes binding a compiled template to a handler

use crate::error::RouteResult;
use crate::pattern::RoutePattern;
use std::collections::HashMap;
use std::fmt;

/// Variables extracted from a matched path. Values are never coerced.
pub type RouteParams = HashMap<String, String>;

/// A route template bound to a handler.
///
/// Routes are immutable once registered; `H` is whatever the dispatching
/// application uses to identify handlers (a function pointer, an enum, a
/// string key).
///
/// ```
/// use trestle_core::Route;
///
/// let route = Route::new(r"/{year:\d\d\d\d}/foo/", "archive").unwrap();
/// assert!(route.match_path("/bar/foo/").is_none());
///
/// let matched = route.match_path("/2010/foo/").unwrap();
/// assert!(matched.is(&route));
/// assert_eq!(matched.param("year"), Some("2010"));
/// assert_eq!(route.build(&[("year", "1900")]).unwrap(), "/1900/foo/");
/// ```
pub struct Route<H> {
    pattern: RoutePattern,
    handler: H,
    name: Option<String>,
    defaults: HashMap<String, String>,
    build_only: bool,
}

impl<H> Route<H> {
    /// Compile `template` and bind it to `handler`.
    pub fn new(template: &str, handler: H) -> RouteResult<Self> {
        Ok(Self {
            pattern: RoutePattern::compile(template)?,
            handler,
            name: None,
            defaults: HashMap::new(),
            build_only: false,
        })
    }

    /// Name the route so it can be built through a `Router`.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Default values. They fill in match results for keys the template does
    /// not bind, and stand in for absent arguments when building.
    pub fn with_defaults<I, K, V>(mut self, defaults: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.defaults
            .extend(defaults.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Mark the route as usable for URL building only; it never matches.
    pub fn build_only(mut self) -> Self {
        self.build_only = true;
        self
    }

    pub fn template(&self) -> &str {
        self.pattern.template()
    }

    pub fn pattern(&self) -> &RoutePattern {
        &self.pattern
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn defaults(&self) -> &HashMap<String, String> {
        &self.defaults
    }

    pub fn is_build_only(&self) -> bool {
        self.build_only
    }

    pub fn variables(&self) -> impl Iterator<Item = &str> {
        self.pattern.variables()
    }

    /// Match a path against the full template.
    ///
    /// Returns `None` when the path does not match, or when the route is
    /// build-only.
    pub fn match_path(&self, path: &str) -> Option<RouteMatch<'_, H>> {
        if self.build_only {
            return None;
        }

        let captured = self.pattern.captures(path)?;
        let params = if self.defaults.is_empty() {
            captured
        } else {
            let mut params = self.defaults.clone();
            params.extend(captured);
            params
        };

        Some(RouteMatch {
            route: self,
            params,
        })
    }

    /// Build a path from `(variable, value)` pairs.
    ///
    /// Arguments that name no variable are ignored. When an argument is
    /// repeated the first occurrence is used.
    pub fn build(&self, args: &[(&str, &str)]) -> RouteResult<String> {
        let label = self.name().unwrap_or_else(|| self.template());
        self.pattern.build(label, |variable| {
            args.iter()
                .find(|(key, _)| *key == variable)
                .map(|(_, value)| *value)
                .or_else(|| self.defaults.get(variable).map(String::as_str))
        })
    }
}

impl<H> fmt::Debug for Route<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("template", &self.template())
            .field("name", &self.name)
            .field("defaults", &self.defaults)
            .field("build_only", &self.build_only)
            .finish_non_exhaustive()
    }
}

/// A successful match: the route that matched and its variables.
pub struct RouteMatch<'r, H> {
    route: &'r Route<H>,
    params: RouteParams,
}

impl<'r, H> RouteMatch<'r, H> {
    pub fn route(&self) -> &'r Route<H> {
        self.route
    }

    pub fn handler(&self) -> &'r H {
        &self.route.handler
    }

    pub fn params(&self) -> &RouteParams {
        &self.params
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    /// Whether this match came from exactly `route` (identity, not equality).
    pub fn is(&self, route: &Route<H>) -> bool {
        std::ptr::eq(self.route, route)
    }

    pub fn into_params(self) -> RouteParams {
        self.params
    }

    pub fn into_parts(self) -> (&'r Route<H>, RouteParams) {
        (self.route, self.params)
    }
}

impl<H> PartialEq for RouteMatch<'_, H> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.route, other.route) && self.params == other.params
    }
}

impl<H> fmt::Debug for RouteMatch<'_, H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteMatch")
            .field("template", &self.route.template())
            .field("params", &self.params)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RouteError;

    fn params(pairs: &[(&str, &str)]) -> RouteParams {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_no_variable() {
        let route = Route::new("/hello", "hello_handler").unwrap();
        let matched = route.match_path("/hello").unwrap();
        assert!(matched.is(&route));
        assert!(matched.params().is_empty());
        assert_eq!(*matched.handler(), "hello_handler");
        assert_eq!(route.build(&[]).unwrap(), "/hello");

        let route = Route::new("/hello/world/", "hello_world_handler").unwrap();
        let matched = route.match_path("/hello/world/").unwrap();
        assert!(matched.is(&route));
        assert!(matched.params().is_empty());
        assert_eq!(*matched.handler(), "hello_world_handler");
        assert_eq!(route.build(&[]).unwrap(), "/hello/world/");
    }

    #[test]
    fn test_simple_variable() {
        let route = Route::new("/{foo}", "my_handler").unwrap();
        let matched = route.match_path("/bar").unwrap();
        assert!(matched.is(&route));
        assert_eq!(matched.into_params(), params(&[("foo", "bar")]));
        assert_eq!(route.build(&[("foo", "baz")]).unwrap(), "/baz");
    }

    #[test]
    fn test_expr_variable() {
        let route = Route::new(r"/{year:\d\d\d\d}", "my_handler").unwrap();
        assert!(route.match_path("/bar").is_none());
        assert_eq!(
            route.match_path("/2010").map(RouteMatch::into_params),
            Some(params(&[("year", "2010")]))
        );
        assert_eq!(
            route.match_path("/1900").map(RouteMatch::into_params),
            Some(params(&[("year", "1900")]))
        );
        assert_eq!(route.build(&[("year", "2010")]).unwrap(), "/2010");
    }

    #[test]
    fn test_expr_variable_with_trailing_literal() {
        let route = Route::new(r"/{year:\d\d\d\d}/foo/", "my_handler").unwrap();
        assert_eq!(route.build(&[("year", "2010")]).unwrap(), "/2010/foo/");
    }

    #[test]
    fn test_build_ignores_extra_arguments() {
        let route = Route::new("/users/{id}", ()).unwrap();
        let path = route.build(&[("id", "7"), ("format", "json")]).unwrap();
        assert_eq!(path, "/users/7");
    }

    #[test]
    fn test_build_first_argument_wins() {
        let route = Route::new("/users/{id}", ()).unwrap();
        assert_eq!(route.build(&[("id", "1"), ("id", "2")]).unwrap(), "/users/1");
    }

    #[test]
    fn test_build_missing_argument_names_route() {
        let route = Route::new("/users/{id}", ()).unwrap().with_name("user");
        let err = route.build(&[]).unwrap_err();
        assert_eq!(
            err,
            RouteError::MissingArgument {
                route: "user".to_string(),
                argument: "id".to_string(),
            }
        );

        let unnamed = Route::new("/users/{id}", ()).unwrap();
        match unnamed.build(&[]).unwrap_err() {
            RouteError::MissingArgument { route, .. } => assert_eq!(route, "/users/{id}"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_defaults_fill_match_and_build() {
        let route = Route::new("/docs/{page}", ())
            .unwrap()
            .with_defaults([("page", "index"), ("lang", "en")]);

        let matched = route.match_path("/docs/install").unwrap();
        assert_eq!(matched.param("page"), Some("install"));
        assert_eq!(matched.param("lang"), Some("en"));

        assert_eq!(route.build(&[]).unwrap(), "/docs/index");
        assert_eq!(route.build(&[("page", "faq")]).unwrap(), "/docs/faq");
    }

    #[test]
    fn test_build_only_route_never_matches() {
        let route = Route::new("/external/{id}", ()).unwrap().build_only();
        assert!(route.is_build_only());
        assert!(route.match_path("/external/1").is_none());
        assert_eq!(route.build(&[("id", "1")]).unwrap(), "/external/1");
    }

    #[test]
    fn test_match_round_trips_build() {
        let route = Route::new("/tags/{tag}", ()).unwrap();
        for value in ["rust", "a b", "caf\u{e9}", "x%20y", "1.0-rc"] {
            let path = route.build(&[("tag", value)]).unwrap();
            let matched = route.match_path(&path).unwrap();
            assert!(matched.is(&route));
            assert_eq!(matched.param("tag"), Some(value));
        }
    }

    #[test]
    fn test_match_equality_is_identity() {
        let first = Route::new("/same", ()).unwrap();
        let second = Route::new("/same", ()).unwrap();
        let a = first.match_path("/same").unwrap();
        let b = first.match_path("/same").unwrap();
        let c = second.match_path("/same").unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_variables_in_order() {
        let route = Route::new("/{b}/{a}/{c:.*}", ()).unwrap();
        assert_eq!(route.variables().collect::<Vec<_>>(), vec!["b", "a", "c"]);
    }
}
