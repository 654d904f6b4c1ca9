/// Errors raised while binding, resolving or calling through a [`Container`](super::Container).
///
/// Binding and registration variants are configuration errors and normally
/// surface at startup. The remaining variants are resolution errors raised per
/// call; none of them leave partial state behind.
#[derive(Debug, thiserror::Error)]
pub enum ContainerError {
    /// The abstract name already has a binding.
    #[error("binding redefined: '{abstract_name}' is already bound")]
    BindingRedefined { abstract_name: String },

    /// The concrete cannot be used as a binding target.
    #[error("invalid binding for '{abstract_name}': {reason}")]
    BindingTypeInvalid {
        abstract_name: String,
        reason: &'static str,
    },

    /// A `TypeSpec` with the same name was already registered.
    #[error("type redefined: a type named '{name}' is already registered")]
    TypeRedefined { name: String },

    /// An abstract name appeared twice in one resolution chain.
    #[error("circular dependency: {}", .chain.join(" -> "))]
    CircularDependency { chain: Vec<String> },

    /// A constructor or factory parameter has no declared type to resolve.
    #[error("'{owner}' declares parameter '{param}' without a type")]
    UntypedParameter { owner: String, param: String },

    /// The name is neither bound nor a registered type.
    #[error("type not found: '{name}' is not bound and no type is registered under that name")]
    TypeNotFound { name: String },

    /// `make::<T>()` found several registered names for the same Rust type.
    #[error("ambiguous type: {type_name} is registered as {}", .candidates.join(", "))]
    AmbiguousType {
        type_name: &'static str,
        candidates: Vec<String>,
    },

    /// A call parameter was neither supplied, defaulted nor injectable.
    #[error("cannot resolve parameter '{param}' of '{callable}': not supplied, no default, no type")]
    UnresolvableParameter { callable: String, param: String },

    /// The value does not resolve to any callable shape.
    #[error("not callable: '{callable}'")]
    NotCallable { callable: String },

    /// A body asked for an argument position that was never assembled.
    #[error("argument {index} is missing")]
    ArgumentMissing { index: usize },

    /// An argument could not be downcast to the type the body expects.
    #[error("argument '{param}' is not a {expected}")]
    ArgumentType {
        param: String,
        expected: &'static str,
    },

    /// A named context was defined twice.
    #[error("context redefined: '{name}' already exists")]
    ContextRedefined { name: String },

    /// No context is defined under the requested name.
    #[error("context not found: '{name}' has not been defined")]
    ContextNotFound { name: String },

    /// A factory, method or handler body reported its own failure.
    #[error(transparent)]
    Handler(#[from] anyhow::Error),
}
