mod common;

use std::sync::Arc;

use brrtwire::container::{instance, Container, Function, Param, TypeSpec};
use brrtwire::router::{Group, RouteError, Router};
use common::fixtures::{router, unit};
use http::Method;

/// Target returning the `id` route parameter it was called with.
fn echo_id() -> Function {
    Function::new([Param::untyped("id")], |args| {
        Ok(instance(args.get::<String>(0)?.as_str().to_owned()))
    })
}

fn noop() -> Function {
    Function::new([], |_| Ok(instance(())))
}

#[test]
fn test_dynamic_route_matches_and_dispatches_param() {
    let mut router = router();
    router.get(r"/users/{id:\d+}", echo_id()).unwrap();

    assert!(router.match_route(&Method::GET, "/users/42"));
    let out = router.dispatch(unit(), unit()).unwrap();
    assert_eq!(out.downcast_ref::<String>().unwrap(), "42");

    assert!(!router.match_route(&Method::GET, "/users/abc"));
}

#[test]
fn test_failed_match_keeps_current_route() {
    let mut router = router();
    router.get(r"/users/{id:\d+}", echo_id()).unwrap();

    assert!(router.match_route(&Method::GET, "/users/7"));
    assert!(!router.match_route(&Method::GET, "/nowhere"));
    let current = router.current().unwrap();
    assert_eq!(current.param("id"), Some("7"));
    let out = router.dispatch(unit(), unit()).unwrap();
    assert_eq!(out.downcast_ref::<String>().unwrap(), "7");
}

#[test]
fn test_dispatch_before_match() {
    let mut router = router();
    router.get("/", noop()).unwrap();
    assert!(matches!(
        router.dispatch(unit(), unit()),
        Err(RouteError::DispatchBeforeMatch)
    ));
}

#[test]
fn test_threaded_match_does_not_touch_current_route() {
    let mut router = router();
    router.get(r"/users/{id:\d+}", echo_id()).unwrap();

    let found = router.route(&Method::GET, "/users/9").unwrap();
    assert!(router.current().is_none());
    assert_eq!(found.params_map().get("id").map(String::as_str), Some("9"));
    let out = found.dispatch(unit(), unit()).unwrap();
    assert_eq!(out.downcast_ref::<String>().unwrap(), "9");
}

#[test]
fn test_concurrent_dispatch_keeps_params_apart() {
    let mut router = router();
    router.get(r"/users/{id:\d+}", echo_id()).unwrap();
    let router = Arc::new(router);

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let router = Arc::clone(&router);
            std::thread::spawn(move || {
                let uri = format!("/users/{i}");
                let found = router.route(&Method::GET, &uri).unwrap();
                let out = found.dispatch(unit(), unit()).unwrap();
                out.downcast_ref::<String>().cloned().unwrap()
            })
        })
        .collect();

    for (i, handle) in handles.into_iter().enumerate() {
        assert_eq!(handle.join().unwrap(), i.to_string());
    }
}

#[test]
fn test_static_route_redefined_after_prefix_expansion() {
    let mut router = router();
    router.get("/admin/users", noop()).unwrap();
    let err = router
        .prefix("/admin", |r| {
            r.get("/users", noop())?;
            Ok(())
        })
        .err();
    match err {
        Some(RouteError::RouteRedefined { method, uri }) => {
            assert_eq!(method, Method::GET);
            assert_eq!(uri, "/admin/users");
        }
        other => panic!("unexpected: {other:?}"),
    }
}

#[test]
fn test_dynamic_route_redefined_by_pattern() {
    let mut router = router();
    router.get(r"/u/{id:\d+}", noop()).unwrap();
    match router.get(r"/u/{user:\d+}", noop()) {
        Err(RouteError::RouteRedefined { uri, .. }) => assert_eq!(uri, r"^/u/(\d+)$"),
        other => panic!("unexpected: {:?}", other.err()),
    }
    assert!(router.get(r"/u/{id:[0-9]+}", noop()).is_ok());
    // same URI under another method is fine
    assert!(router.post(r"/u/{id:\d+}", noop()).is_ok());
}

#[test]
fn test_first_dynamic_match_wins() {
    let mut router = router();
    router
        .get("/files/{name:.+}", Function::new([], |_| Ok(instance("catch-all"))))
        .unwrap();
    router
        .get("/files/{name:[a-z]+}", Function::new([], |_| Ok(instance("letters"))))
        .unwrap();

    let found = router.route(&Method::GET, "/files/abc").unwrap();
    let out = found.dispatch(unit(), unit()).unwrap();
    assert_eq!(out.downcast_ref::<&str>(), Some(&"catch-all"));
}

#[test]
fn test_reverse_routing_profile() {
    let mut router = router();
    router
        .get(r"/u/{id:\d+}/{tab?:[a-z]+}", noop())
        .unwrap()
        .name("profile")
        .unwrap();

    assert_eq!(router.uri("profile", &[("id", "7")]).unwrap(), "/u/7/");
    assert_eq!(
        router.uri("profile", &[("id", "7"), ("tab", "posts")]).unwrap(),
        "/u/7/posts"
    );
    match router.uri("profile", &[]) {
        Err(RouteError::MissingRouteArgument { name, param }) => {
            assert_eq!(name, "profile");
            assert_eq!(param, "id");
        }
        other => panic!("unexpected: {other:?}"),
    }
}

#[test]
fn test_missing_optional_placeholder_dispatches_as_empty_string() {
    let mut router = router();
    router
        .get(
            r"/u/{id:\d+}/{tab?:[a-z]+}",
            Function::new([Param::untyped("id"), Param::untyped("tab")], |args| {
                let id = args.get::<String>(0)?;
                let tab = args.get::<String>(1)?;
                Ok(instance(format!("{id}:{tab}")))
            }),
        )
        .unwrap();

    let found = router.route(&Method::GET, "/u/7/").unwrap();
    assert_eq!(found.param("tab"), Some(""));
    let out = found.dispatch(unit(), unit()).unwrap();
    assert_eq!(out.downcast_ref::<String>().unwrap(), "7:");

    let found = router.route(&Method::GET, "/u/7/posts").unwrap();
    let out = found.dispatch(unit(), unit()).unwrap();
    assert_eq!(out.downcast_ref::<String>().unwrap(), "7:posts");
}

#[test]
fn test_reverse_routing_static_route() {
    let mut router = router();
    router
        .prefix("/api", |r| {
            r.get("/health", noop())?.name("health")?;
            Ok(())
        })
        .unwrap();
    assert_eq!(router.uri("health", &[("ignored", "x")]).unwrap(), "/api/health");
}

#[test]
fn test_route_names() {
    let mut router = router();
    assert!(matches!(
        router.name("early"),
        Err(RouteError::NothingToName { .. })
    ));

    router.get("/a", noop()).unwrap().name("a").unwrap();
    router.get("/b", noop()).unwrap();
    assert!(matches!(
        router.name("a"),
        Err(RouteError::RouteNameConflict { .. })
    ));
    assert!(matches!(
        router.uri("nope", &[]),
        Err(RouteError::RouteNameNotFound { .. })
    ));
    assert_eq!(router.named("a").map(|r| r.uri()), Some("/a"));
}

#[test]
fn test_prefix_scopes_nest_and_pop() {
    let mut router = router();
    router
        .prefix("/api", |r| {
            r.prefix("/v1", |r| {
                r.get("/users", noop())?;
                Ok(())
            })?;
            r.get("/status", noop())?;
            Ok(())
        })
        .unwrap();
    router.get("/root", noop()).unwrap();

    assert!(router.route(&Method::GET, "/api/v1/users").is_some());
    assert!(router.route(&Method::GET, "/api/status").is_some());
    assert!(router.route(&Method::GET, "/root").is_some());
}

#[test]
fn test_scope_pops_when_block_fails() {
    let mut router = router();
    router.get("/api/taken", noop()).unwrap();
    let result = router.prefix("/api", |r| {
        r.get("/taken", noop())?;
        Ok(())
    });
    assert!(result.is_err());

    router.get("/after", noop()).unwrap();
    assert!(router.route(&Method::GET, "/after").is_some());
    assert!(router.route(&Method::GET, "/api/after").is_none());
}

struct UserController;

#[test]
fn test_namespace_qualifies_name_targets() {
    let mut container = Container::new();
    container
        .register(TypeSpec::new("app::admin::UserController", |_| Ok(UserController)).method(
            "index",
            [],
            |_this, _args| Ok(instance("admin users")),
        ))
        .unwrap();

    let mut router = Router::new(Arc::new(container));
    router
        .namespace("app", |r| {
            r.namespace("admin", |r| {
                r.get("/admin/users", "UserController@index")?;
                Ok(())
            })?;
            Ok(())
        })
        .unwrap();
    // function targets are untouched by namespaces
    router
        .namespace("ignored", |r| {
            r.get("/fn", Function::new([], |_| Ok(instance("fn"))))?;
            Ok(())
        })
        .unwrap();

    let found = router.route(&Method::GET, "/admin/users").unwrap();
    assert_eq!(found.route.target(), "app::admin::UserController@index");
    let out = found.dispatch(unit(), unit()).unwrap();
    assert_eq!(out.downcast_ref::<&str>(), Some(&"admin users"));

    let found = router.route(&Method::GET, "/fn").unwrap();
    assert_eq!(found.route.target(), "<function>");
}

#[test]
fn test_malformed_target_fails_at_registration() {
    let mut router = router();
    assert!(matches!(
        router.get("/broken", "NotAMethodReference"),
        Err(RouteError::Container(_))
    ));
    assert!(router.route(&Method::GET, "/broken").is_none());
}

#[test]
fn test_unknown_target_fails_at_dispatch() {
    let mut router = router();
    router.get("/ghost", "Ghost@show").unwrap();
    let found = router.route(&Method::GET, "/ghost").unwrap();
    let err = found.dispatch(unit(), unit()).unwrap_err();
    assert!(err.to_string().contains("Ghost"));
}

#[test]
fn test_context_scope_routes_through_its_container() {
    let mut admin = Container::new();
    admin.instance("greeting", String::from("hello admin")).unwrap();
    let admin = Arc::new(admin);

    let mut root = Container::new();
    root.instance("greeting", String::from("hello world")).unwrap();

    let greet = || {
        Function::new([Param::typed("greeting", "greeting")], |args| {
            Ok(instance(args.get::<String>(0)?.as_str().to_owned()))
        })
    };

    let mut router = Router::new(Arc::new(root));
    router
        .context_scope(Arc::clone(&admin), |r| {
            r.get("/admin", greet())?;
            Ok(())
        })
        .unwrap();
    router.get("/", greet()).unwrap();

    let out = router
        .route(&Method::GET, "/admin")
        .unwrap()
        .dispatch(unit(), unit())
        .unwrap();
    assert_eq!(out.downcast_ref::<String>().unwrap(), "hello admin");
    let out = router
        .route(&Method::GET, "/")
        .unwrap()
        .dispatch(unit(), unit())
        .unwrap();
    assert_eq!(out.downcast_ref::<String>().unwrap(), "hello world");
}

#[test]
fn test_contexts_do_not_nest() {
    let mut router = router();
    let context = Arc::new(Container::new());
    let inner = Arc::clone(&context);
    let result = router.context_scope(Arc::clone(&context), move |r| {
        r.context_scope(inner, |_| Ok(()))?;
        Ok(())
    });
    assert!(matches!(result, Err(RouteError::DuplicateContext)));

    // the failed scope released the active context
    assert!(router
        .context_scope(context, |r| {
            r.get("/ok", noop())?;
            Ok(())
        })
        .is_ok());
}

#[test]
fn test_group_combines_scopes() {
    let mut router = router();
    router
        .group(Group::new().prefix("/v2").namespace("api"), |r| {
            r.get("/items", "Items@index")?;
            Ok(())
        })
        .unwrap();
    let found = router.route(&Method::GET, "/v2/items").unwrap();
    assert_eq!(found.route.target(), "api::Items@index");
}

#[test]
fn test_any_and_resource_verbs() {
    let mut router = router();
    router.any("/anything", noop()).unwrap();
    router.resource("/photos", noop()).unwrap();
    for method in [Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::PATCH] {
        assert!(router.route(&method, "/anything").is_some(), "{method}");
    }
    assert!(router.route(&Method::PATCH, "/photos").is_none());
    assert_eq!(router.table().len(), 9);
}

#[test]
fn test_invalid_pattern_is_rejected() {
    let mut router = router();
    assert!(matches!(
        router.get("/bad/{id:[}", noop()),
        Err(RouteError::InvalidPattern { .. })
    ));
}
