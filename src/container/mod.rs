//! # Container Module
//!
//! The container resolves abstract names to instances. Every controller and
//! middleware the router runs is reached through it, so its resolution
//! contract is part of routing correctness.
//!
//! ## Bindings
//!
//! An abstract name is bound at most once, to one of:
//!
//! - another name (an alias, resolved recursively)
//! - a factory [`Function`] whose typed parameters are injected
//! - a pre-built instance, returned as-is and always shared
//!
//! Names without a binding are looked up among the registered [`TypeSpec`]s
//! and constructed with their declared parameters autowired.
//!
//! ## Singletons
//!
//! A singleton binding owns a write-once slot. The first successful resolution
//! fills it and every later resolution returns the same `Arc`. Concurrent first
//! resolutions run the factory at most once.
//!
//! ## Cycle detection
//!
//! Each top-level `invoke`/`call` threads a [`ResolutionStack`] through the
//! resolution tree. Entering a name already on the stack fails with
//! [`ContainerError::CircularDependency`] carrying the whole chain
//! (`A -> B -> A`). Frames are popped by a guard, so a failed resolution
//! never affects the next one.
//!
//! ## Example
//!
//! ```rust
//! use brrtwire::container::{instance, Container, NamedArgs, Param, TypeSpec};
//! use std::sync::Arc;
//!
//! struct Repo;
//! struct Users { repo: Arc<Repo> }
//!
//! let mut container = Container::new();
//! container.register(TypeSpec::new("Repo", |_| Ok(Repo))).unwrap();
//! container
//!     .register(
//!         TypeSpec::new("Users", |args| Ok(Users { repo: args.get(0)? }))
//!             .param(Param::typed("repo", "Repo"))
//!             .method("count", [Param::untyped("offset")], |_users, args| {
//!                 let offset = args.get::<usize>(0)?;
//!                 Ok(instance(*offset + 1))
//!             }),
//!     )
//!     .unwrap();
//! container.singleton("users", "Users").unwrap();
//!
//! let first = container.invoke("users").unwrap();
//! let second = container.invoke("users").unwrap();
//! assert!(Arc::ptr_eq(&first, &second));
//!
//! let count = container
//!     .call("Users@count", NamedArgs::new().with("offset", instance(41usize)))
//!     .unwrap();
//! assert_eq!(count.downcast_ref::<usize>(), Some(&42));
//! ```

mod call;
mod core;
mod error;
mod provider;
mod stack;
mod types;

pub use call::{Callable, IntoCallable, METHOD_SEPARATOR, STATIC_SEPARATOR};
pub use core::Container;
pub use error::ContainerError;
pub use provider::{Contexts, Provider};
pub use stack::{Frame, ResolutionStack};
pub use types::{downcast, instance, Args, Concrete, Function, Instance, NamedArgs, Param, TypeSpec};
