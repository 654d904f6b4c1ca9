use std::any::{type_name, Any, TypeId};
use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use super::ContainerError;

/// A type-erased, shareable value produced or consumed by the container.
///
/// Two resolutions yield "the same instance" when their `Instance`s are
/// [`Arc::ptr_eq`].
pub type Instance = Arc<dyn Any + Send + Sync>;

/// Wrap a value as an [`Instance`].
pub fn instance<T: Any + Send + Sync>(value: T) -> Instance {
    Arc::new(value)
}

/// Downcast an [`Instance`] to a concrete type, reporting `param` on mismatch.
pub fn downcast<T: Any + Send + Sync>(
    value: &Instance,
    param: &str,
) -> Result<Arc<T>, ContainerError> {
    Arc::clone(value)
        .downcast::<T>()
        .map_err(|_| ContainerError::ArgumentType {
            param: param.to_string(),
            expected: type_name::<T>(),
        })
}

/// A declared parameter of a constructor, factory, method or function.
#[derive(Clone)]
pub struct Param {
    name: Cow<'static, str>,
    ty: Option<Cow<'static, str>>,
    default: Option<Instance>,
}

impl Param {
    /// A parameter whose value is resolved from the abstract name `ty`.
    pub fn typed(name: impl Into<Cow<'static, str>>, ty: impl Into<Cow<'static, str>>) -> Self {
        Self {
            name: name.into(),
            ty: Some(ty.into()),
            default: None,
        }
    }

    /// A parameter that can only be supplied by name or by default.
    pub fn untyped(name: impl Into<Cow<'static, str>>) -> Self {
        Self {
            name: name.into(),
            ty: None,
            default: None,
        }
    }

    /// Attach a default used by `call` when the caller does not supply the value.
    #[must_use]
    pub fn with_default(mut self, value: Instance) -> Self {
        self.default = Some(value);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ty(&self) -> Option<&str> {
        self.ty.as_deref()
    }

    pub fn default_value(&self) -> Option<&Instance> {
        self.default.as_ref()
    }
}

impl fmt::Debug for Param {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Param")
            .field("name", &self.name)
            .field("ty", &self.ty)
            .field("has_default", &self.default.is_some())
            .finish()
    }
}

/// Positional arguments assembled for a body, in declaration order.
pub struct Args {
    names: Vec<String>,
    values: Vec<Instance>,
}

impl Args {
    pub(crate) fn new(params: &[Param], values: Vec<Instance>) -> Self {
        Self {
            names: params.iter().map(|p| p.name().to_string()).collect(),
            values,
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// The erased value at `index`.
    pub fn raw(&self, index: usize) -> Result<&Instance, ContainerError> {
        self.values
            .get(index)
            .ok_or(ContainerError::ArgumentMissing { index })
    }

    /// The value at `index`, downcast to `T`.
    pub fn get<T: Any + Send + Sync>(&self, index: usize) -> Result<Arc<T>, ContainerError> {
        let value = self.raw(index)?;
        let name = self.names.get(index).map(String::as_str).unwrap_or("?");
        downcast(value, name)
    }

    /// The value declared under `name`, downcast to `T`.
    pub fn by_name<T: Any + Send + Sync>(&self, name: &str) -> Result<Arc<T>, ContainerError> {
        let index = self
            .names
            .iter()
            .position(|n| n == name)
            .ok_or(ContainerError::ArgumentMissing {
                index: self.values.len(),
            })?;
        self.get(index)
    }
}

type Body = dyn Fn(Args) -> Result<Instance, ContainerError> + Send + Sync;
type MethodBody = dyn Fn(&Instance, Args) -> Result<Instance, ContainerError> + Send + Sync;
type Constructor = dyn Fn(Args) -> Result<Instance, ContainerError> + Send + Sync;

/// A function value with a declared parameter list: factories, function
/// targets and function middleware.
#[derive(Clone)]
pub struct Function {
    params: Arc<[Param]>,
    body: Arc<Body>,
}

impl Function {
    pub fn new<F>(params: impl IntoIterator<Item = Param>, body: F) -> Self
    where
        F: Fn(Args) -> Result<Instance, ContainerError> + Send + Sync + 'static,
    {
        Self {
            params: params.into_iter().collect(),
            body: Arc::new(body),
        }
    }

    pub fn params(&self) -> &[Param] {
        &self.params
    }

    pub(crate) fn apply(&self, args: Args) -> Result<Instance, ContainerError> {
        (self.body)(args)
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Function")
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

#[derive(Clone)]
pub(crate) struct Method {
    pub(crate) params: Arc<[Param]>,
    pub(crate) body: Arc<MethodBody>,
}

/// Erased form of a [`TypeSpec`], stored by the container.
pub(crate) struct TypeEntry {
    pub(crate) name: String,
    pub(crate) type_id: TypeId,
    pub(crate) params: Vec<Param>,
    pub(crate) construct: Arc<Constructor>,
    pub(crate) methods: HashMap<String, Method>,
    pub(crate) statics: HashMap<String, Function>,
}

/// Explicit registration of a constructible type.
///
/// This replaces constructor introspection: the declared constructor
/// parameters, instance methods and static methods are listed once at startup.
///
/// ```rust
/// use brrtwire::container::{instance, Container, Param, TypeSpec};
///
/// struct Clock;
/// struct Greeter { clock: std::sync::Arc<Clock> }
///
/// let mut container = Container::new();
/// container.register(TypeSpec::new("Clock", |_| Ok(Clock))).unwrap();
/// container
///     .register(
///         TypeSpec::new("Greeter", |args| Ok(Greeter { clock: args.get(0)? }))
///             .param(Param::typed("clock", "Clock"))
///             .method("hello", [Param::untyped("who")], |_this, args| {
///                 let who = args.get::<String>(0)?;
///                 Ok(instance(format!("hello {who}")))
///             }),
///     )
///     .unwrap();
/// ```
pub struct TypeSpec<T> {
    name: String,
    params: Vec<Param>,
    construct: Arc<Constructor>,
    methods: HashMap<String, Method>,
    statics: HashMap<String, Function>,
    _type: PhantomData<fn() -> T>,
}

impl<T: Any + Send + Sync> TypeSpec<T> {
    pub fn new<F>(name: impl Into<String>, construct: F) -> Self
    where
        F: Fn(&Args) -> Result<T, ContainerError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            params: Vec::new(),
            construct: Arc::new(move |args: Args| {
                construct(&args).map(|value| Arc::new(value) as Instance)
            }),
            methods: HashMap::new(),
            statics: HashMap::new(),
            _type: PhantomData,
        }
    }

    /// Declare the next constructor parameter.
    #[must_use]
    pub fn param(mut self, param: Param) -> Self {
        self.params.push(param);
        self
    }

    /// Register an instance method reachable as `"Name@method"`.
    #[must_use]
    pub fn method<F>(mut self, name: &str, params: impl IntoIterator<Item = Param>, body: F) -> Self
    where
        F: Fn(&T, Args) -> Result<Instance, ContainerError> + Send + Sync + 'static,
    {
        let owner = self.name.clone();
        let body = move |receiver: &Instance, args: Args| {
            let this = (**receiver)
                .downcast_ref::<T>()
                .ok_or_else(|| ContainerError::ArgumentType {
                    param: format!("{owner} receiver"),
                    expected: type_name::<T>(),
                })?;
            body(this, args)
        };
        self.methods.insert(
            name.to_string(),
            Method {
                params: params.into_iter().collect(),
                body: Arc::new(body),
            },
        );
        self
    }

    /// Register a static method reachable as `"Name::method"`.
    #[must_use]
    pub fn static_method<F>(
        mut self,
        name: &str,
        params: impl IntoIterator<Item = Param>,
        body: F,
    ) -> Self
    where
        F: Fn(Args) -> Result<Instance, ContainerError> + Send + Sync + 'static,
    {
        self.statics
            .insert(name.to_string(), Function::new(params, body));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn into_entry(self) -> TypeEntry {
        TypeEntry {
            name: self.name,
            type_id: TypeId::of::<T>(),
            params: self.params,
            construct: self.construct,
            methods: self.methods,
            statics: self.statics,
        }
    }
}

impl<T: Any + Send + Sync + Default> TypeSpec<T> {
    /// A type constructed with `Default::default()` and no parameters.
    pub fn default_constructed(name: impl Into<String>) -> Self {
        Self::new(name, |_| Ok(T::default()))
    }
}

/// What an abstract name is bound to.
#[derive(Clone)]
pub enum Concrete {
    /// Another abstract name (or registered type name).
    Alias(String),
    /// A factory whose typed parameters are resolved before it is called.
    Factory(Function),
    /// A pre-built instance, returned as-is.
    Instance(Instance),
}

impl Concrete {
    pub(crate) fn kind(&self) -> &'static str {
        match self {
            Concrete::Alias(_) => "alias",
            Concrete::Factory(_) => "factory",
            Concrete::Instance(_) => "instance",
        }
    }
}

impl From<&str> for Concrete {
    fn from(name: &str) -> Self {
        Concrete::Alias(name.to_string())
    }
}

impl From<String> for Concrete {
    fn from(name: String) -> Self {
        Concrete::Alias(name)
    }
}

impl From<Function> for Concrete {
    fn from(function: Function) -> Self {
        Concrete::Factory(function)
    }
}

impl fmt::Debug for Concrete {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Concrete::Alias(name) => f.debug_tuple("Alias").field(name).finish(),
            Concrete::Factory(function) => f.debug_tuple("Factory").field(function).finish(),
            Concrete::Instance(_) => f.write_str("Instance(..)"),
        }
    }
}

/// Arguments supplied by name to [`Container::call`](super::Container::call).
#[derive(Clone, Default)]
pub struct NamedArgs {
    values: HashMap<String, Instance>,
}

impl NamedArgs {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: Instance) -> Self {
        self.values.insert(name.into(), value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: Instance) {
        self.values.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<&Instance> {
        self.values.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }
}

impl fmt::Debug for NamedArgs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&String> = self.values.keys().collect();
        names.sort();
        f.debug_struct("NamedArgs").field("names", &names).finish()
    }
}
