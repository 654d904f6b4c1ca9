use std::time::Instant;

use tracing::{debug, info, info_span, warn};

use crate::container::{Container, ContainerError, Instance, TypeSpec};
use crate::router::{Middleware, Next};

/// Wraps the rest of the pipeline in a `middleware` span and logs how long
/// it took.
#[derive(Default)]
pub struct TracingMiddleware;

impl TracingMiddleware {
    pub const TYPE_NAME: &'static str = "brrtwire::TracingMiddleware";

    pub fn type_spec() -> TypeSpec<Self> {
        TypeSpec::default_constructed(Self::TYPE_NAME).middleware()
    }

    /// Register the type (once) and bind `name` to it.
    pub fn install(container: &mut Container, name: &str) -> Result<(), ContainerError> {
        if !container.has_type(Self::TYPE_NAME) {
            container.register(Self::type_spec())?;
        }
        container.singleton(name, Self::TYPE_NAME)?;
        Ok(())
    }
}

impl Middleware for TracingMiddleware {
    fn handle(
        &self,
        request: Instance,
        response: Instance,
        next: &Next,
        _context: &Container,
    ) -> Result<Instance, ContainerError> {
        let span = info_span!("middleware", kind = "tracing");
        let _entered = span.enter();

        debug!("Entering pipeline");
        let start = Instant::now();
        let result = next.run(request, response);
        let duration_us = start.elapsed().as_micros();

        match &result {
            Ok(_) => info!(duration_us, "Pipeline completed"),
            Err(err) => warn!(duration_us, error = %err, "Pipeline failed"),
        }
        result
    }
}
