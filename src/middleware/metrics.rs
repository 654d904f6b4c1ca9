use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use crate::container::{Container, ContainerError, Instance, TypeSpec};
use crate::router::{Middleware, Next};

/// Middleware collecting dispatch counters.
///
/// All counters use atomic operations, so one instance can be shared by every
/// route and thread. Register it as a singleton (see [`MetricsMiddleware::install`])
/// so every pipeline stage updates the same counters.
pub struct MetricsMiddleware {
    request_count: AtomicUsize,
    failure_count: AtomicUsize,
    total_latency_ns: AtomicU64,
}

impl Default for MetricsMiddleware {
    fn default() -> Self {
        Self {
            request_count: AtomicUsize::new(0),
            failure_count: AtomicUsize::new(0),
            total_latency_ns: AtomicU64::new(0),
        }
    }
}

impl MetricsMiddleware {
    /// Type name under which [`MetricsMiddleware::type_spec`] registers.
    pub const TYPE_NAME: &'static str = "brrtwire::MetricsMiddleware";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn type_spec() -> TypeSpec<Self> {
        TypeSpec::default_constructed(Self::TYPE_NAME).middleware()
    }

    /// Register the type (once) and bind `name` to a shared instance, so
    /// pipelines can list `name`.
    pub fn install(container: &mut Container, name: &str) -> Result<(), ContainerError> {
        if !container.has_type(Self::TYPE_NAME) {
            container.register(Self::type_spec())?;
        }
        container.singleton(name, Self::TYPE_NAME)?;
        Ok(())
    }

    /// Total number of dispatches that passed through this middleware.
    pub fn request_count(&self) -> usize {
        self.request_count.load(Ordering::Relaxed)
    }

    /// Dispatches whose downstream stages returned an error.
    pub fn failure_count(&self) -> usize {
        self.failure_count.load(Ordering::Relaxed)
    }

    /// Mean time spent downstream of this middleware. Zero before the first
    /// dispatch.
    pub fn average_latency(&self) -> Duration {
        let count = self.request_count.load(Ordering::Relaxed) as u64;
        if count == 0 {
            Duration::from_nanos(0)
        } else {
            Duration::from_nanos(self.total_latency_ns.load(Ordering::Relaxed) / count)
        }
    }
}

impl Middleware for MetricsMiddleware {
    fn handle(
        &self,
        request: Instance,
        response: Instance,
        next: &Next,
        _context: &Container,
    ) -> Result<Instance, ContainerError> {
        let start = Instant::now();
        let result = next.run(request, response);
        let elapsed = u64::try_from(start.elapsed().as_nanos()).unwrap_or(u64::MAX);

        self.request_count.fetch_add(1, Ordering::Relaxed);
        self.total_latency_ns.fetch_add(elapsed, Ordering::Relaxed);
        if result.is_err() {
            self.failure_count.fetch_add(1, Ordering::Relaxed);
        }
        result
    }
}
