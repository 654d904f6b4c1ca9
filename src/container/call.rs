use std::fmt;

use super::types::{Function, Instance};
use super::ContainerError;

/// Separator of the `"Type@method"` instance-method form.
pub const METHOD_SEPARATOR: char = '@';
/// Separator of the `"Type::method"` static-method form.
pub const STATIC_SEPARATOR: &str = "::";

/// Every shape [`Container::call`](super::Container::call) accepts.
#[derive(Clone)]
pub enum Callable {
    /// `"Type@method"`: `Type` is resolved through `invoke`, then `method` is
    /// called on the instance.
    Method { ty: String, method: String },
    /// `"Type::method"`: a static method of a registered type.
    Static { ty: String, method: String },
    /// An already-resolved receiver and the name of one of its methods.
    Bound { receiver: Instance, method: String },
    /// A bare function value.
    Function(Function),
}

impl Callable {
    /// Parse the string forms. Anything else is `NotCallable`.
    ///
    /// The static form splits on the last `::`, so namespaced type names such
    /// as `admin::Users::count` resolve to type `admin::Users`.
    pub fn parse(source: &str) -> Result<Self, ContainerError> {
        let not_callable = || ContainerError::NotCallable {
            callable: source.to_string(),
        };

        if let Some((ty, method)) = source.split_once(METHOD_SEPARATOR) {
            if ty.is_empty() || method.is_empty() || method.contains(METHOD_SEPARATOR) {
                return Err(not_callable());
            }
            return Ok(Callable::Method {
                ty: ty.to_string(),
                method: method.to_string(),
            });
        }

        match source.rsplit_once(STATIC_SEPARATOR) {
            Some((ty, method)) if !ty.is_empty() && !method.is_empty() => Ok(Callable::Static {
                ty: ty.to_string(),
                method: method.to_string(),
            }),
            _ => Err(not_callable()),
        }
    }

    pub fn bound(receiver: Instance, method: impl Into<String>) -> Self {
        Callable::Bound {
            receiver,
            method: method.into(),
        }
    }
}

impl fmt::Display for Callable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Callable::Method { ty, method } => write!(f, "{ty}{METHOD_SEPARATOR}{method}"),
            Callable::Static { ty, method } => write!(f, "{ty}{STATIC_SEPARATOR}{method}"),
            Callable::Bound { method, .. } => write!(f, "<receiver>{METHOD_SEPARATOR}{method}"),
            Callable::Function(_) => f.write_str("<function>"),
        }
    }
}

impl fmt::Debug for Callable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Callable({self})")
    }
}

impl From<Function> for Callable {
    fn from(function: Function) -> Self {
        Callable::Function(function)
    }
}

/// Conversion into a [`Callable`], fallible for the string forms.
pub trait IntoCallable {
    fn into_callable(self) -> Result<Callable, ContainerError>;
}

impl IntoCallable for Callable {
    fn into_callable(self) -> Result<Callable, ContainerError> {
        Ok(self)
    }
}

impl IntoCallable for Function {
    fn into_callable(self) -> Result<Callable, ContainerError> {
        Ok(Callable::Function(self))
    }
}

impl IntoCallable for &str {
    fn into_callable(self) -> Result<Callable, ContainerError> {
        Callable::parse(self)
    }
}

impl IntoCallable for String {
    fn into_callable(self) -> Result<Callable, ContainerError> {
        Callable::parse(&self)
    }
}

impl IntoCallable for &String {
    fn into_callable(self) -> Result<Callable, ContainerError> {
        Callable::parse(self)
    }
}
