use std::ops::{Deref, DerefMut};

use tracing::warn;

use super::ContainerError;

/// Names currently being resolved within one top-level `invoke` or `call`.
///
/// A fresh stack is created per top-level call and threaded down by `&mut`,
/// so concurrent resolutions never observe each other's chains.
#[derive(Debug, Default)]
pub struct ResolutionStack {
    fetching: Vec<String>,
}

impl ResolutionStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Push `name`, failing with `CircularDependency` if it is already present.
    ///
    /// The returned frame pops `name` when dropped, including on early returns
    /// and unwinding.
    pub fn enter(&mut self, name: &str) -> Result<Frame<'_>, ContainerError> {
        if self.contains(name) {
            let mut chain = self.fetching.clone();
            chain.push(name.to_string());
            warn!(chain = %chain.join(" -> "), "Circular dependency detected");
            return Err(ContainerError::CircularDependency { chain });
        }
        self.fetching.push(name.to_string());
        Ok(Frame { stack: self })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fetching.iter().any(|n| n == name)
    }

    pub fn depth(&self) -> usize {
        self.fetching.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fetching.is_empty()
    }

    /// The current chain, outermost first.
    pub fn chain(&self) -> &[String] {
        &self.fetching
    }
}

/// Scoped membership of one name in a [`ResolutionStack`].
pub struct Frame<'a> {
    stack: &'a mut ResolutionStack,
}

impl Deref for Frame<'_> {
    type Target = ResolutionStack;

    fn deref(&self) -> &ResolutionStack {
        self.stack
    }
}

impl DerefMut for Frame<'_> {
    fn deref_mut(&mut self) -> &mut ResolutionStack {
        self.stack
    }
}

impl Drop for Frame<'_> {
    fn drop(&mut self) {
        self.stack.fetching.pop();
    }
}
