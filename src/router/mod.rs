//! # Router Module
//!
//! The router maps `(method, uri)` pairs to pre-composed actions and runs them
//! through the container.
//!
//! ## Overview
//!
//! The router is responsible for:
//! - Building the route table from builder calls (`get`, `post`, `access`, ...)
//!   inside nested `prefix` / `namespace` / `pipeline` / `context` scopes
//! - Classifying URIs as static or dynamic and deriving matching expressions
//!   for dynamic ones (see [`RoutePattern`])
//! - Matching requests: exact static lookup first, then dynamic patterns in
//!   registration order, first match wins
//! - Reverse routing: `name` a route, then rebuild its URI with `uri`
//! - Dispatching: running the route's middleware onion and target, every
//!   stage invoked through [`Container::call`](crate::container::Container::call)
//!
//! ## Architecture
//!
//! 1. **Registration**: each `access` call computes the effective URI (prefix
//!    stack + uri) and target (namespace stack + name), folds the active
//!    middleware around the target into a [`Pipeline`], and inserts one shared
//!    [`Route`] under every requested method.
//!
//! 2. **Matching**: [`Router::route`] returns a [`RouteMatch`] value that owns
//!    everything needed to dispatch, so concurrent requests never share state.
//!    [`Router::match_route`] + [`Router::dispatch`] keep the two-step
//!    protocol for callers that want it; the "current route" lives in an
//!    atomically swapped slot.
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use brrtwire::container::{instance, Container, Function, Param};
//! use brrtwire::router::Router;
//! use http::Method;
//!
//! let show = Function::new([Param::untyped("id")], |args| {
//!     let id = args.get::<String>(0)?;
//!     Ok(instance(format!("user {id}")))
//! });
//!
//! let mut router = Router::new(Arc::new(Container::new()));
//! router.get(r"/users/{id:\d+}", show).unwrap().name("user").unwrap();
//!
//! let found = router.route(&Method::GET, "/users/42").unwrap();
//! let out = found.dispatch(instance(()), instance(())).unwrap();
//! assert_eq!(out.downcast_ref::<String>().unwrap(), "user 42");
//! assert_eq!(router.uri("user", &[("id", "7")]).unwrap(), "/users/7");
//! ```

mod core;
mod error;
mod pattern;
mod pipeline;
mod table;

pub use core::{Group, RouteMatch, Router, ANY_METHODS, RESOURCE_METHODS};
pub use error::RouteError;
pub use pattern::{ParamVec, RoutePattern, MAX_INLINE_PARAMS};
pub use pipeline::{
    middleware_params, Middleware, MiddlewareRef, Next, Pipeline, Target, CONTEXT, DISPATCH_ID,
    HANDLE, NEXT, REQUEST, RESPONSE,
};
pub use table::{Route, RouteTable};
