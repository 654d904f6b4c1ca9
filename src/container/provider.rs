use std::collections::HashMap;
use std::sync::Arc;

use tracing::info;

use super::{Container, ContainerError};

/// Startup registration of bindings.
///
/// `bind` runs once per provider while the container is being built; `boot`
/// runs after every provider has bound, so it may resolve services that other
/// providers registered.
pub trait Provider {
    fn bind(&self, container: &mut Container) -> Result<(), ContainerError>;

    fn boot(&self, _container: &Container) -> Result<(), ContainerError> {
        Ok(())
    }
}

impl<F> Provider for F
where
    F: Fn(&mut Container) -> Result<(), ContainerError>,
{
    fn bind(&self, container: &mut Container) -> Result<(), ContainerError> {
        self(container)
    }
}

/// Named containers, built once from providers and shared afterwards.
#[derive(Default)]
pub struct Contexts {
    contexts: HashMap<String, Arc<Container>>,
}

impl Contexts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn define(
        &mut self,
        name: &str,
        providers: &[&dyn Provider],
    ) -> Result<Arc<Container>, ContainerError> {
        if self.contexts.contains_key(name) {
            return Err(ContainerError::ContextRedefined {
                name: name.to_string(),
            });
        }
        let container = Arc::new(Container::with_providers(providers)?);
        info!(context = %name, "Context defined");
        self.contexts
            .insert(name.to_string(), Arc::clone(&container));
        Ok(container)
    }

    pub fn get(&self, name: &str) -> Result<Arc<Container>, ContainerError> {
        self.contexts
            .get(name)
            .map(Arc::clone)
            .ok_or_else(|| ContainerError::ContextNotFound {
                name: name.to_string(),
            })
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.contexts.keys().map(String::as_str)
    }
}
