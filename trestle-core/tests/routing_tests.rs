//! Route matching and URL building through the public API.

use std::sync::Arc;
use trestle_core::{HttpRequest, Route, RouteError, RouteParams, Router};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Handler {
    Home,
    Hello,
    Article,
    Archive,
    Static,
    CatchAll,
}

fn site_router() -> Router<Handler> {
    Router::new()
        .with_route(Route::new("/", Handler::Home).unwrap().with_name("home"))
        .with_route(Route::new("/hello", Handler::Hello).unwrap().with_name("hello"))
        .with_route(
            Route::new(r"/{year:\d\d\d\d}/{slug}/", Handler::Article)
                .unwrap()
                .with_name("article"),
        )
        .with_route(
            Route::new(r"/{year:\d{4}}/", Handler::Archive)
                .unwrap()
                .with_name("archive"),
        )
        .with_route(
            Route::new("/static/{path:.+}", Handler::Static)
                .unwrap()
                .with_name("static"),
        )
        .with_route(Route::new("/{rest:.*}", Handler::CatchAll).unwrap())
}

fn params(pairs: &[(&str, &str)]) -> RouteParams {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[test]
fn test_literal_templates_match_only_exact_paths() {
    let templates = ["/", "/hello", "/hello/world/", "/a.b/c-d/_e"];
    for template in templates {
        let route = Route::new(template, ()).unwrap();
        assert!(route.match_path(template).is_some(), "{template}");
        assert_eq!(route.build(&[]).unwrap(), template);

        for other in templates.iter().filter(|t| **t != template) {
            assert!(route.match_path(other).is_none(), "{template} vs {other}");
        }
        assert!(route.match_path(&format!("{template}x")).is_none());
    }
}

#[test]
fn test_single_variable_round_trip() {
    let route = Route::new("/prefix/{foo}/suffix", ()).unwrap();
    for value in ["bar", "baz-1", "with space", "\u{1F980}", "a.b.c"] {
        let built = route.build(&[("foo", value)]).unwrap();
        assert_eq!(built, format!("/prefix/{value}/suffix"));

        let matched = route.match_path(&built).unwrap();
        assert!(matched.is(&route));
        assert_eq!(matched.into_params(), params(&[("foo", value)]));
    }

    assert!(route.match_path("/prefix/a/b/suffix").is_none());
    assert!(route.match_path("/prefix//suffix").is_none());
}

#[test]
fn test_constrained_variable() {
    let route = Route::new(r"/{year:\d\d\d\d}/foo/", ()).unwrap();
    assert!(route.match_path("/bar/foo/").is_none());
    assert!(route.match_path("/201/foo/").is_none());
    assert!(route.match_path("/20100/foo/").is_none());
    assert_eq!(
        route.match_path("/1900/foo/").unwrap().into_params(),
        params(&[("year", "1900")])
    );
    assert_eq!(route.build(&[("year", "2010")]).unwrap(), "/2010/foo/");
}

#[test]
fn test_router_dispatch_order() {
    let router = site_router();

    let cases: &[(&str, Handler, &[(&str, &str)])] = &[
        ("/", Handler::Home, &[]),
        ("/hello", Handler::Hello, &[]),
        ("/2010/first-post/", Handler::Article, &[("year", "2010"), ("slug", "first-post")]),
        ("/2010/", Handler::Archive, &[("year", "2010")]),
        ("/static/css/site.css", Handler::Static, &[("path", "css/site.css")]),
        ("/hello/", Handler::CatchAll, &[("rest", "hello/")]),
        ("/2010", Handler::CatchAll, &[("rest", "2010")]),
    ];

    for (path, handler, expected) in cases {
        let matched = router.match_path(path).unwrap();
        assert_eq!(matched.handler(), handler, "{path}");
        assert_eq!(matched.params(), &params(expected), "{path}");
    }
}

#[test]
fn test_router_returns_none_without_catch_all() {
    let router = Router::new()
        .with_route(Route::new("/a", 1).unwrap())
        .with_route(Route::new("/b/{id:\\d+}", 2).unwrap());

    assert!(router.match_path("/c").is_none());
    assert!(router.match_path("/b/x").is_none());
    assert!(router.match_request(&HttpRequest::get("/b/7?x=1")).is_some());
}

#[test]
fn test_reverse_building() {
    let router = site_router();

    assert_eq!(router.build("home", &[]).unwrap(), "/");
    assert_eq!(
        router
            .build("article", &[("slug", "hello"), ("year", "1999"), ("page", "2")])
            .unwrap(),
        "/1999/hello/"
    );
    assert_eq!(
        router.build("static", &[("path", "img/logo.png")]).unwrap(),
        "/static/img/logo.png"
    );
}

#[test]
fn test_build_errors_are_distinguishable() {
    let router = site_router();

    let missing = router.build("article", &[("year", "2010")]).unwrap_err();
    assert!(missing.is_argument_error());
    assert_eq!(
        missing.to_string(),
        "Missing argument 'slug' to build route 'article'"
    );

    let invalid = router
        .build("archive", &[("year", "twenty-ten")])
        .unwrap_err();
    assert!(invalid.is_argument_error());

    let unknown = router.build("nope", &[]).unwrap_err();
    assert!(!unknown.is_argument_error());
    assert_eq!(unknown, RouteError::RouteNotFound("nope".to_string()));
}

#[test]
fn test_router_shared_across_threads() {
    let router = Arc::new(site_router());

    let workers: Vec<_> = (0..4)
        .map(|i| {
            let router = Arc::clone(&router);
            std::thread::spawn(move || {
                let path = format!("/20{:02}/post-{}/", i, i);
                let matched = router.match_path(&path).unwrap();
                (*matched.handler(), matched.param("slug").map(str::to_string))
            })
        })
        .collect();

    for (i, worker) in workers.into_iter().enumerate() {
        let (handler, slug) = worker.join().unwrap();
        assert_eq!(handler, Handler::Article);
        assert_eq!(slug, Some(format!("post-{}", i)));
    }
}

#[test]
fn test_invalid_templates_rejected() {
    assert!(matches!(
        Route::new("/{id", ()),
        Err(RouteError::InvalidTemplate { .. })
    ));
    assert!(matches!(
        Route::new("/{id}/{id}", ()),
        Err(RouteError::DuplicateVariable { .. })
    ));
    assert!(matches!(
        Route::new("/{id:(}", ()),
        Err(RouteError::InvalidRegex { .. })
    ));
}
