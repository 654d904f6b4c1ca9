mod common;

use std::sync::Arc;

use brrtwire::container::{
    instance, Container, ContainerError, Function, Instance, Param, TypeSpec,
};
use brrtwire::middleware::{MetricsMiddleware, TracingMiddleware};
use brrtwire::ids::DispatchId;
use brrtwire::router::{middleware_params, Middleware, MiddlewareRef, Next, RouteError, Router};
use common::fixtures::{
    recorder, recording_container, recording_middleware, recording_target, unit, RECORDER,
};
use common::recorder::Recorder;
use http::Method;

fn dispatch(router: &Router, uri: &str) -> Result<Instance, RouteError> {
    router
        .route(&Method::GET, uri)
        .ok_or_else(|| RouteError::RouteNameNotFound {
            name: uri.to_string(),
        })?
        .dispatch(unit(), unit())
}

#[test]
fn test_onion_order() {
    let container = Arc::new(recording_container());
    let mut router = Router::new(Arc::clone(&container));
    router
        .pipeline(
            [
                recording_middleware("M1", true),
                recording_middleware("M2", true),
            ],
            |r| {
                r.get("/", recording_target("T"))?;
                Ok(())
            },
        )
        .unwrap();

    let out = dispatch(&router, "/").unwrap();
    assert_eq!(out.downcast_ref::<&str>(), Some(&"T"));
    assert_eq!(
        recorder(&container).events(),
        vec!["M1 entered", "M2 entered", "T executed", "M2 resumed", "M1 resumed"]
    );
}

#[test]
fn test_short_circuit_skips_the_rest() {
    let container = Arc::new(recording_container());
    let mut router = Router::new(Arc::clone(&container));
    router
        .pipeline(
            [
                recording_middleware("M1", false),
                recording_middleware("M2", true),
            ],
            |r| {
                r.get("/", recording_target("T"))?;
                Ok(())
            },
        )
        .unwrap();

    let out = dispatch(&router, "/").unwrap();
    assert_eq!(out.downcast_ref::<&str>(), Some(&"short-circuited"));
    assert_eq!(recorder(&container).events(), vec!["M1 entered", "M1 resumed"]);
}

#[test]
fn test_nested_pipeline_scopes_append() {
    let container = Arc::new(recording_container());
    let mut router = Router::new(Arc::clone(&container));
    router
        .pipeline([recording_middleware("outer", true)], |r| {
            r.pipeline([recording_middleware("inner", true)], |r| {
                r.get("/both", recording_target("T"))?;
                Ok(())
            })?;
            r.get("/outer", recording_target("U"))?;
            Ok(())
        })
        .unwrap();
    router.get("/bare", recording_target("V")).unwrap();

    dispatch(&router, "/both").unwrap();
    dispatch(&router, "/outer").unwrap();
    dispatch(&router, "/bare").unwrap();
    assert_eq!(
        recorder(&container).events(),
        vec![
            "outer entered",
            "inner entered",
            "T executed",
            "inner resumed",
            "outer resumed",
            "outer entered",
            "U executed",
            "outer resumed",
            "V executed",
        ]
    );

    let both = router.route(&Method::GET, "/both").unwrap();
    assert_eq!(both.route.pipeline().stages(), 2);
    assert_eq!(both.route.middleware(), ["<function>", "<function>"]);
}

/// Typed middleware resolved by name, with its recorder injected.
struct Stamp {
    recorder: Arc<Recorder>,
}

impl Middleware for Stamp {
    fn handle(
        &self,
        request: Instance,
        response: Instance,
        next: &Next,
        context: &Container,
    ) -> Result<Instance, ContainerError> {
        self.recorder
            .push(format!("stamp sees recorder bound: {}", context.is_bound(RECORDER)));
        let stamped = instance(format!("stamped {}", request.downcast_ref::<&str>().unwrap_or(&"?")));
        next.run(stamped, response)
    }
}

fn container_with_stamp() -> Container {
    let mut container = recording_container();
    container
        .register(
            TypeSpec::new("Stamp", |args| {
                Ok(Stamp {
                    recorder: args.get(0)?,
                })
            })
            .param(Param::typed("recorder", RECORDER))
            .middleware(),
        )
        .unwrap();
    container
}

#[test]
fn test_named_middleware_rewrites_request() {
    let container = Arc::new(container_with_stamp());
    let mut router = Router::new(Arc::clone(&container));
    router
        .pipeline(["Stamp"], |r| {
            r.get(
                "/",
                Function::new([Param::untyped("request")], |args| {
                    Ok(instance(args.get::<String>(0)?.as_str().to_owned()))
                }),
            )?;
            Ok(())
        })
        .unwrap();

    let out = router
        .route(&Method::GET, "/")
        .unwrap()
        .dispatch(instance("hello"), unit())
        .unwrap();
    assert_eq!(out.downcast_ref::<String>().unwrap(), "stamped hello");
    assert_eq!(
        recorder(&container).events(),
        vec!["stamp sees recorder bound: true"]
    );
}

#[test]
fn test_target_receives_context_and_response() {
    let container = Arc::new(recording_container());
    let mut router = Router::new(Arc::clone(&container));
    router
        .get(
            "/ctx",
            Function::new(
                [Param::untyped("response"), Param::untyped("context")],
                |args| {
                    let response = args.get::<u16>(0)?;
                    let context = args.get::<Container>(1)?;
                    Ok(instance((*response, context.is_bound(RECORDER))))
                },
            ),
        )
        .unwrap();

    let out = router
        .route(&Method::GET, "/ctx")
        .unwrap()
        .dispatch(unit(), instance(204u16))
        .unwrap();
    assert_eq!(out.downcast_ref::<(u16, bool)>(), Some(&(204, true)));
}

#[test]
fn test_middleware_error_stops_dispatch() {
    let container = Arc::new(recording_container());
    let failing = Function::new([], |_| Err(anyhow::anyhow!("denied").into()));
    let mut router = Router::new(Arc::clone(&container));
    router
        .pipeline([MiddlewareRef::from(failing)], |r| {
            r.get("/", recording_target("T"))?;
            Ok(())
        })
        .unwrap();

    let err = dispatch(&router, "/").unwrap_err();
    assert_eq!(err.to_string(), "denied");
    assert!(recorder(&container).events().is_empty());
}

#[test]
fn test_unknown_middleware_fails_at_dispatch() {
    let mut router = Router::new(Arc::new(Container::new()));
    router
        .pipeline(["Missing"], |r| {
            r.get("/", Function::new([], |_| Ok(instance(()))))?;
            Ok(())
        })
        .unwrap();
    assert!(matches!(
        dispatch(&router, "/"),
        Err(RouteError::Container(ContainerError::TypeNotFound { .. }))
    ));
}

#[test]
fn test_metrics_middleware_counts_dispatches() {
    let mut container = Container::new();
    MetricsMiddleware::install(&mut container, "metrics").unwrap();
    let container = Arc::new(container);

    let mut router = Router::new(Arc::clone(&container));
    router
        .pipeline(["metrics"], |r| {
            r.get("/ok", Function::new([], |_| Ok(instance(()))))?;
            r.get(
                "/fail",
                Function::new([], |_| Err(anyhow::anyhow!("boom").into())),
            )?;
            Ok(())
        })
        .unwrap();

    dispatch(&router, "/ok").unwrap();
    dispatch(&router, "/ok").unwrap();
    assert!(dispatch(&router, "/fail").is_err());

    let metrics = container.invoke_as::<MetricsMiddleware>("metrics").unwrap();
    assert_eq!(metrics.request_count(), 3);
    assert_eq!(metrics.failure_count(), 1);
}

#[test]
fn test_builtin_middleware_share_one_type_registration() {
    let mut container = Container::new();
    MetricsMiddleware::install(&mut container, "metrics.api").unwrap();
    MetricsMiddleware::install(&mut container, "metrics.admin").unwrap();
    TracingMiddleware::install(&mut container, "trace").unwrap();
    let container = Arc::new(container);

    let mut router = Router::new(Arc::clone(&container));
    router
        .pipeline(["trace", "metrics.api"], |r| {
            r.get("/api", Function::new([], |_| Ok(instance(()))))?;
            Ok(())
        })
        .unwrap();
    dispatch(&router, "/api").unwrap();

    let api = container.invoke_as::<MetricsMiddleware>("metrics.api").unwrap();
    let admin = container.invoke_as::<MetricsMiddleware>("metrics.admin").unwrap();
    assert_eq!(api.request_count(), 1);
    assert_eq!(admin.request_count(), 0);
}

struct Auth {
    recorder: Arc<Recorder>,
}

fn container_with_auth() -> Container {
    let mut container = recording_container();
    container
        .register(
            TypeSpec::new("Auth", |args| {
                Ok(Auth {
                    recorder: args.get(0)?,
                })
            })
            .param(Param::typed("recorder", RECORDER))
            .method("check", middleware_params(), |this, args| {
                this.recorder.push("auth checked");
                let next = args.get::<Next>(2)?;
                next.run(Arc::clone(args.raw(0)?), Arc::clone(args.raw(1)?))
            }),
        )
        .unwrap();
    container
}

#[test]
fn test_middleware_named_with_method_is_called_as_written() {
    let container = Arc::new(container_with_auth());
    let mut router = Router::new(Arc::clone(&container));
    router
        .pipeline(["Auth@check"], |r| {
            r.get("/", recording_target("T"))?;
            Ok(())
        })
        .unwrap();

    let out = dispatch(&router, "/").unwrap();
    assert_eq!(out.downcast_ref::<&str>(), Some(&"T"));
    assert_eq!(
        recorder(&container).events(),
        vec!["auth checked", "T executed"]
    );
}

#[test]
fn test_malformed_middleware_name_fails_at_registration() {
    let mut router = Router::new(Arc::new(container_with_auth()));
    let result = router.pipeline(["Auth@"], |r| {
        r.get("/", recording_target("T"))?;
        Ok(())
    });
    assert!(matches!(
        result,
        Err(RouteError::Container(ContainerError::NotCallable { .. }))
    ));
    assert!(router.route(&Method::GET, "/").is_none());
}

#[test]
fn test_upstream_dispatch_id_reaches_every_stage() {
    let container = Arc::new(recording_container());
    let seen_by_middleware = Function::new(
        [Param::untyped("next"), Param::typed("recorder", RECORDER)],
        |args| {
            let next = args.get::<Next>(0)?;
            args.get::<Recorder>(1)?
                .push(format!("middleware saw {}", next.dispatch_id()));
            next.run(unit(), unit())
        },
    );
    let echo_id = Function::new([Param::untyped("dispatch_id")], |args| {
        Ok(instance(*args.get::<DispatchId>(0)?))
    });

    let mut router = Router::new(Arc::clone(&container));
    router
        .pipeline([seen_by_middleware], |r| {
            r.get("/", echo_id)?;
            Ok(())
        })
        .unwrap();

    let upstream = "01ARZ3NDEKTSV4RRFFQ69G5FAV";
    let found = router.route(&Method::GET, "/").unwrap();
    let out = found
        .dispatch_with_id(unit(), unit(), Some(upstream))
        .unwrap();
    assert_eq!(out.downcast_ref::<DispatchId>().unwrap().to_string(), upstream);
    assert_eq!(
        recorder(&container).events(),
        vec![format!("middleware saw {upstream}")]
    );

    // without an upstream id each dispatch gets its own
    let first = found.dispatch(unit(), unit()).unwrap();
    let second = found.dispatch(unit(), unit()).unwrap();
    assert_ne!(
        first.downcast_ref::<DispatchId>(),
        second.downcast_ref::<DispatchId>()
    );
}
