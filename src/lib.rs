//! # brrtwire
//!
//! **brrtwire** is an embeddable request-handling kernel: an autowiring
//! resolution container and a route table whose routes run onion-style
//! middleware pipelines. The router never calls a controller or middleware
//! directly; every stage is resolved and invoked through the container.
//!
//! ## Architecture
//!
//! - **[`container`]** - named bindings, explicit type registration, singleton
//!   slots, cycle detection and `call` with named + injected arguments
//! - **[`router`]** - builder scopes (`prefix`, `namespace`, `pipeline`,
//!   `context`), static/dynamic route table, matching, reverse routing and
//!   dispatch
//! - **[`middleware`]** - built-in pipeline middleware (tracing, metrics)
//! - **[`logging`]** - `tracing-subscriber` setup driven by `BRRTW_LOG_*`
//! - **[`runtime_config`]** - router tunables from the environment or TOML
//! - **[`ids`]** - ULID identifiers attached to dispatch spans
//!
//! ### Request Flow
//!
//! ```mermaid
//! sequenceDiagram
//!     participant App
//!     participant Router
//!     participant Table as RouteTable
//!     participant Pipeline
//!     participant Container
//!
//!     App->>Router: route(GET, "/users/42")
//!     Router->>Table: lookup (static map, then patterns in order)
//!     Table-->>Router: Route + params {id: "42"}
//!     Router-->>App: RouteMatch
//!     App->>Pipeline: RouteMatch::dispatch(request, response)
//!     Pipeline->>Container: call("M1@handle", {request, response, next, context})
//!     Container->>Container: resolve M1, inject declared params
//!     Pipeline->>Container: call(target, {request, response, context, id})
//!     Container-->>App: result
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use brrtwire::container::{instance, Container, Param, TypeSpec};
//! use brrtwire::router::Router;
//! use http::Method;
//!
//! struct Greeting(&'static str);
//! struct Hello { greeting: Arc<Greeting> }
//!
//! let mut container = Container::new();
//! container.instance("Greeting", Greeting("hello")).unwrap();
//! container
//!     .register(
//!         TypeSpec::new("Hello", |args| Ok(Hello { greeting: args.get(0)? }))
//!             .param(Param::typed("greeting", "Greeting"))
//!             .method("show", [Param::untyped("name")], |this, args| {
//!                 let name = args.get::<String>(0)?;
//!                 Ok(instance(format!("{} {name}", this.greeting.0)))
//!             }),
//!     )
//!     .unwrap();
//!
//! let mut router = Router::new(Arc::new(container));
//! router.get("/hello/{name:[a-z]+}", "Hello@show").unwrap();
//!
//! let found = router.route(&Method::GET, "/hello/world").unwrap();
//! let out = found.dispatch(instance(()), instance(())).unwrap();
//! assert_eq!(out.downcast_ref::<String>().unwrap(), "hello world");
//! ```

pub mod container;
pub mod ids;
pub mod logging;
pub mod middleware;
pub mod router;
pub mod runtime_config;

pub use container::{Container, ContainerError, Instance};
pub use router::{RouteError, RouteMatch, Router};
