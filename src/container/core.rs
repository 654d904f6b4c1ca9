use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

use once_cell::sync::OnceCell;
use tracing::{debug, info, warn};

use super::call::{Callable, IntoCallable, METHOD_SEPARATOR};
use super::provider::Provider;
use super::stack::ResolutionStack;
use super::types::{downcast, Args, Concrete, Instance, NamedArgs, Param, TypeEntry, TypeSpec};
use super::ContainerError;

/// A binding plus its singleton slot.
///
/// `singleton` is `None` for transient bindings; an empty cell means the
/// singleton has not been built yet, a filled cell holds the shared instance.
struct Binding {
    concrete: Concrete,
    singleton: Option<OnceCell<Instance>>,
}

/// Autowiring resolution container.
///
/// Bindings and type registrations happen during setup through `&mut self`;
/// resolution (`invoke`, `call`) only needs `&self`, so a configured container
/// is shared behind an `Arc` while serving. The only state that changes after
/// setup is the singleton cache, which fills lazily and at most once per name.
#[derive(Default)]
pub struct Container {
    bindings: HashMap<String, Binding>,
    types: HashMap<String, Arc<TypeEntry>>,
    /// Registered names per Rust type, in registration order. Several
    /// `TypeSpec`s may share one Rust type.
    type_names: HashMap<TypeId, Vec<String>>,
}

impl Container {
    /// An empty container: no bindings, no registered types.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a container from providers: every `bind` runs first, then every `boot`.
    pub fn with_providers(providers: &[&dyn Provider]) -> Result<Self, ContainerError> {
        let mut container = Self::new();
        for provider in providers {
            provider.bind(&mut container)?;
        }
        for provider in providers {
            provider.boot(&container)?;
        }
        info!(
            providers = providers.len(),
            bindings = container.bindings.len(),
            types = container.types.len(),
            "Container built from providers"
        );
        Ok(container)
    }

    /// Bind `abstract_name` to `concrete`.
    ///
    /// Literal instances are always shared, so an [`Concrete::Instance`]
    /// binding is stored as an already-resolved singleton.
    pub fn bind(
        &mut self,
        abstract_name: &str,
        concrete: impl Into<Concrete>,
        singleton: bool,
    ) -> Result<&mut Self, ContainerError> {
        let concrete = concrete.into();
        if self.bindings.contains_key(abstract_name) {
            return Err(ContainerError::BindingRedefined {
                abstract_name: abstract_name.to_string(),
            });
        }
        if let Concrete::Alias(target) = &concrete {
            validate_alias(abstract_name, target)?;
        }

        let slot = match &concrete {
            Concrete::Instance(value) => Some(OnceCell::with_value(Arc::clone(value))),
            _ if singleton => Some(OnceCell::new()),
            _ => None,
        };

        debug!(
            abstract_name = %abstract_name,
            kind = concrete.kind(),
            singleton = slot.is_some(),
            "Binding registered"
        );

        self.bindings.insert(
            abstract_name.to_string(),
            Binding {
                concrete,
                singleton: slot,
            },
        );
        Ok(self)
    }

    /// Bind `abstract_name` as a singleton: the first resolution is cached
    /// and shared by every later one.
    pub fn singleton(
        &mut self,
        abstract_name: &str,
        concrete: impl Into<Concrete>,
    ) -> Result<&mut Self, ContainerError> {
        self.bind(abstract_name, concrete, true)
    }

    /// Bind `abstract_name` to a pre-built value, shared as-is.
    pub fn instance<T: Any + Send + Sync>(
        &mut self,
        abstract_name: &str,
        value: T,
    ) -> Result<&mut Self, ContainerError> {
        let value: Instance = Arc::new(value);
        self.bind(abstract_name, Concrete::Instance(value), true)
    }

    /// Register a constructible type under its `TypeSpec` name.
    pub fn register<T: Any + Send + Sync>(
        &mut self,
        spec: TypeSpec<T>,
    ) -> Result<&mut Self, ContainerError> {
        let entry = spec.into_entry();
        if self.types.contains_key(&entry.name) {
            return Err(ContainerError::TypeRedefined { name: entry.name });
        }
        debug!(
            type_name = %entry.name,
            params = entry.params.len(),
            methods = entry.methods.len(),
            statics = entry.statics.len(),
            "Type registered"
        );
        self.type_names
            .entry(entry.type_id)
            .or_default()
            .push(entry.name.clone());
        self.types.insert(entry.name.clone(), Arc::new(entry));
        Ok(self)
    }

    /// Whether `abstract_name` has a binding (alias, factory or instance).
    pub fn is_bound(&self, abstract_name: &str) -> bool {
        self.bindings.contains_key(abstract_name)
    }

    /// Whether a `TypeSpec` is registered under `name`.
    pub fn has_type(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    /// Whether `abstract_name` is a singleton whose instance is already cached.
    pub fn is_resolved(&self, abstract_name: &str) -> bool {
        self.cached(abstract_name).is_some()
    }

    /// Resolve `abstract_name` to an instance.
    pub fn invoke(&self, abstract_name: &str) -> Result<Instance, ContainerError> {
        let mut stack = ResolutionStack::new();
        self.resolve(abstract_name, &mut stack)
    }

    /// Resolve `abstract_name` and downcast the instance to `T`.
    pub fn invoke_as<T: Any + Send + Sync>(
        &self,
        abstract_name: &str,
    ) -> Result<Arc<T>, ContainerError> {
        downcast(&self.invoke(abstract_name)?, abstract_name)
    }

    /// Resolve the registered type whose Rust type is `T`.
    ///
    /// Fails with `AmbiguousType` when more than one `TypeSpec` was
    /// registered for `T`; resolve those by name instead.
    pub fn make<T: Any + Send + Sync>(&self) -> Result<Arc<T>, ContainerError> {
        let type_name = std::any::type_name::<T>();
        match self.type_names.get(&TypeId::of::<T>()).map(Vec::as_slice) {
            Some([name]) => self.invoke_as(name),
            Some(candidates) if !candidates.is_empty() => Err(ContainerError::AmbiguousType {
                type_name,
                candidates: candidates.to_vec(),
            }),
            _ => Err(ContainerError::TypeNotFound {
                name: type_name.to_string(),
            }),
        }
    }

    /// Invoke a callable, assembling its arguments from `args`, parameter
    /// defaults and injection, in that order of preference.
    pub fn call(
        &self,
        callable: impl IntoCallable,
        args: NamedArgs,
    ) -> Result<Instance, ContainerError> {
        let callable = callable.into_callable()?;
        let mut stack = ResolutionStack::new();

        match &callable {
            Callable::Method { ty, method } => {
                let receiver = self.resolve(ty, &mut stack)?;
                let entry = self.entry_for_name(ty, &receiver, method);
                self.call_method(&callable, entry, &receiver, method, &args, &mut stack)
            }
            Callable::Bound { receiver, method } => {
                let entry = self.entry_for_receiver(receiver, method);
                self.call_method(&callable, entry, receiver, method, &args, &mut stack)
            }
            Callable::Static { ty, method } => {
                let entry = self
                    .types
                    .get(ty)
                    .ok_or_else(|| ContainerError::TypeNotFound { name: ty.clone() })?;
                let function =
                    entry
                        .statics
                        .get(method)
                        .ok_or_else(|| ContainerError::NotCallable {
                            callable: callable.to_string(),
                        })?;
                let values = self.assemble(&callable, function.params(), &args, &mut stack)?;
                function.apply(Args::new(function.params(), values))
            }
            Callable::Function(function) => {
                let values = self.assemble(&callable, function.params(), &args, &mut stack)?;
                function.apply(Args::new(function.params(), values))
            }
        }
    }

    fn call_method(
        &self,
        callable: &Callable,
        entry: Option<&TypeEntry>,
        receiver: &Instance,
        method: &str,
        args: &NamedArgs,
        stack: &mut ResolutionStack,
    ) -> Result<Instance, ContainerError> {
        let target = entry
            .and_then(|entry| entry.methods.get(method))
            .ok_or_else(|| ContainerError::NotCallable {
                callable: callable.to_string(),
            })?;
        let values = self.assemble(callable, &target.params, args, stack)?;
        (target.body)(receiver, Args::new(&target.params, values))
    }

    /// The type entry whose methods `"name@method"` calls.
    ///
    /// Alias bindings are followed to the registered type they name. Names
    /// bound to factories or instances fall back to the receiver's Rust type.
    fn entry_for_name(&self, name: &str, receiver: &Instance, method: &str) -> Option<&TypeEntry> {
        let mut current = name;
        // an alias chain that resolved cannot be longer than the binding table
        for _ in 0..=self.bindings.len() {
            match self.bindings.get(current).map(|b| &b.concrete) {
                Some(Concrete::Alias(target)) => current = target,
                Some(_) => break,
                None => return self.types.get(current).map(Arc::as_ref),
            }
        }
        self.entry_for_receiver(receiver, method)
    }

    /// The first type registered for the receiver's Rust type that declares
    /// `method`.
    fn entry_for_receiver(&self, receiver: &Instance, method: &str) -> Option<&TypeEntry> {
        self.type_names
            .get(&(**receiver).type_id())?
            .iter()
            .filter_map(|name| self.types.get(name))
            .find(|entry| entry.methods.contains_key(method))
            .map(Arc::as_ref)
    }

    fn cached(&self, abstract_name: &str) -> Option<Instance> {
        self.bindings
            .get(abstract_name)
            .and_then(|b| b.singleton.as_ref())
            .and_then(OnceCell::get)
            .map(Arc::clone)
    }

    pub(crate) fn resolve(
        &self,
        abstract_name: &str,
        stack: &mut ResolutionStack,
    ) -> Result<Instance, ContainerError> {
        if let Some(shared) = self.cached(abstract_name) {
            return Ok(shared);
        }

        let mut frame = stack.enter(abstract_name)?;
        let binding = self.bindings.get(abstract_name);

        debug!(
            abstract_name = %abstract_name,
            depth = frame.depth(),
            bound = binding.is_some(),
            "Resolving"
        );

        match binding.and_then(|b| b.singleton.as_ref()) {
            // The cycle check above runs before the cell is entered, so a
            // chain can never re-enter its own initializer.
            Some(cell) => cell
                .get_or_try_init(|| self.build(abstract_name, binding, &mut frame))
                .map(Arc::clone),
            None => self.build(abstract_name, binding, &mut frame),
        }
    }

    fn build(
        &self,
        abstract_name: &str,
        binding: Option<&Binding>,
        stack: &mut ResolutionStack,
    ) -> Result<Instance, ContainerError> {
        match binding.map(|b| &b.concrete) {
            Some(Concrete::Alias(target)) => self.resolve(target, stack),
            Some(Concrete::Factory(function)) => {
                let values = self.autowire(abstract_name, function.params(), stack)?;
                function.apply(Args::new(function.params(), values))
            }
            Some(Concrete::Instance(value)) => Ok(Arc::clone(value)),
            None => self.construct(abstract_name, stack),
        }
    }

    fn construct(
        &self,
        name: &str,
        stack: &mut ResolutionStack,
    ) -> Result<Instance, ContainerError> {
        let entry = self
            .types
            .get(name)
            .ok_or_else(|| ContainerError::TypeNotFound {
                name: name.to_string(),
            })?;
        let values = self.autowire(&entry.name, &entry.params, stack)?;
        (entry.construct)(Args::new(&entry.params, values))
    }

    /// Resolve every declared parameter by its type. All parameters are
    /// checked for a type before anything is resolved.
    fn autowire(
        &self,
        owner: &str,
        params: &[Param],
        stack: &mut ResolutionStack,
    ) -> Result<Vec<Instance>, ContainerError> {
        let types = params
            .iter()
            .map(|param| {
                param.ty().ok_or_else(|| ContainerError::UntypedParameter {
                    owner: owner.to_string(),
                    param: param.name().to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        types
            .into_iter()
            .map(|ty| self.resolve(ty, stack))
            .collect()
    }

    fn assemble(
        &self,
        callable: &Callable,
        params: &[Param],
        args: &NamedArgs,
        stack: &mut ResolutionStack,
    ) -> Result<Vec<Instance>, ContainerError> {
        params
            .iter()
            .map(|param| {
                if let Some(value) = args.get(param.name()) {
                    Ok(Arc::clone(value))
                } else if let Some(default) = param.default_value() {
                    Ok(Arc::clone(default))
                } else if let Some(ty) = param.ty() {
                    self.resolve(ty, stack)
                } else {
                    warn!(
                        callable = %callable,
                        param = %param.name(),
                        "Unresolvable call parameter"
                    );
                    Err(ContainerError::UnresolvableParameter {
                        callable: callable.to_string(),
                        param: param.name().to_string(),
                    })
                }
            })
            .collect()
    }
}

fn validate_alias(abstract_name: &str, target: &str) -> Result<(), ContainerError> {
    let reason = if target.is_empty() {
        "alias target is empty"
    } else if target.chars().any(char::is_whitespace) {
        "alias target contains whitespace"
    } else if target.contains(METHOD_SEPARATOR) {
        "alias target is a method reference, not a name"
    } else {
        return Ok(());
    };
    Err(ContainerError::BindingTypeInvalid {
        abstract_name: abstract_name.to_string(),
        reason,
    })
}
