//! Built-in middleware for route pipelines.
//!
//! Both types implement [`Middleware`] and are registered with
//! [`TypeSpec::middleware`](crate::container::TypeSpec::middleware), so a
//! pipeline lists them by their bound name like any other middleware:
//!
//! ```rust
//! use std::sync::Arc;
//! use brrtwire::container::{instance, Container, Function};
//! use brrtwire::middleware::MetricsMiddleware;
//! use brrtwire::router::Router;
//! use http::Method;
//!
//! let mut container = Container::new();
//! MetricsMiddleware::install(&mut container, "metrics").unwrap();
//! let container = Arc::new(container);
//!
//! let mut router = Router::new(Arc::clone(&container));
//! router
//!     .pipeline(["metrics"], |r| {
//!         r.get("/ping", Function::new([], |_| Ok(instance("pong"))))?;
//!         Ok(())
//!     })
//!     .unwrap();
//!
//! let found = router.route(&Method::GET, "/ping").unwrap();
//! found.dispatch(instance(()), instance(())).unwrap();
//!
//! let metrics = container.invoke_as::<MetricsMiddleware>("metrics").unwrap();
//! assert_eq!(metrics.request_count(), 1);
//! ```

mod metrics;
mod tracing;

pub use crate::router::Middleware;
pub use metrics::MetricsMiddleware;
pub use self::tracing::TracingMiddleware;
