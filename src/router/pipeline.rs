//! Onion composition of middleware around a route target.
//!
//! The middleware list is folded right to left at registration time: the
//! target becomes the innermost continuation and each middleware wraps the
//! continuation built so far. Running the result enters middleware in
//! registration order; each one decides whether to call [`Next::run`].
//!
//! Every stage is invoked through [`Container::call`], so middleware and
//! targets receive injected dependencies next to the named arguments
//! `request`, `response`, `next` (middleware only), `context` and
//! `dispatch_id`. Targets also receive each extracted route parameter by
//! name, as a `String`.

use std::fmt;
use std::sync::Arc;

use tracing::debug;

use super::pattern::ParamVec;
use crate::container::{
    instance, Callable, Container, ContainerError, Function, Instance, NamedArgs, Param, TypeSpec,
    METHOD_SEPARATOR, STATIC_SEPARATOR,
};
use crate::ids::DispatchId;

pub const REQUEST: &str = "request";
pub const RESPONSE: &str = "response";
pub const NEXT: &str = "next";
pub const CONTEXT: &str = "context";
/// Named argument carrying the [`DispatchId`] of the running dispatch.
pub const DISPATCH_ID: &str = "dispatch_id";
/// Method called on named middleware.
pub const HANDLE: &str = "handle";

/// Per-dispatch values shared by every stage of one run.
#[derive(Debug)]
struct Invocation {
    params: ParamVec,
    dispatch_id: DispatchId,
}

type Stage = dyn Fn(Instance, Instance, &Arc<Invocation>) -> Result<Instance, ContainerError>
    + Send
    + Sync;

/// The remainder of a pipeline, handed to each middleware.
#[derive(Clone)]
pub struct Next {
    inner: Arc<Stage>,
    invocation: Arc<Invocation>,
}

impl Next {
    /// Run the next middleware, or the target when this is the last one.
    pub fn run(&self, request: Instance, response: Instance) -> Result<Instance, ContainerError> {
        (self.inner)(request, response, &self.invocation)
    }

    /// Id of the dispatch this continuation belongs to.
    pub fn dispatch_id(&self) -> DispatchId {
        self.invocation.dispatch_id
    }

    /// Route parameters extracted for this dispatch.
    pub fn params(&self) -> &ParamVec {
        &self.invocation.params
    }
}

impl fmt::Debug for Next {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Next")
            .field("dispatch_id", &self.invocation.dispatch_id)
            .field("params", &self.invocation.params)
            .finish()
    }
}

/// A middleware entry: a name reference, or a function.
///
/// A bare name (`"auth"`) calls its `handle` method. A name that already
/// carries a method (`"Auth@check"`, `"Auth::check"`) is called as written.
#[derive(Clone, Debug)]
pub enum MiddlewareRef {
    Named(String),
    Function(Function),
}

impl MiddlewareRef {
    fn callable(&self) -> Result<Callable, ContainerError> {
        match self {
            MiddlewareRef::Named(name)
                if name.contains(METHOD_SEPARATOR) || name.contains(STATIC_SEPARATOR) =>
            {
                Callable::parse(name)
            }
            MiddlewareRef::Named(name) => Ok(Callable::Method {
                ty: name.clone(),
                method: HANDLE.to_string(),
            }),
            MiddlewareRef::Function(function) => Ok(Callable::Function(function.clone())),
        }
    }
}

impl From<&str> for MiddlewareRef {
    fn from(name: &str) -> Self {
        MiddlewareRef::Named(name.to_string())
    }
}

impl From<String> for MiddlewareRef {
    fn from(name: String) -> Self {
        MiddlewareRef::Named(name)
    }
}

impl From<Function> for MiddlewareRef {
    fn from(function: Function) -> Self {
        MiddlewareRef::Function(function)
    }
}

impl fmt::Display for MiddlewareRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MiddlewareRef::Named(name) => f.write_str(name),
            MiddlewareRef::Function(_) => f.write_str("<function>"),
        }
    }
}

/// What a route finally runs: a `"Type@method"` / `"Type::method"` name, or a
/// function value.
#[derive(Clone, Debug)]
pub enum Target {
    Name(String),
    Function(Function),
}

impl From<&str> for Target {
    fn from(name: &str) -> Self {
        Target::Name(name.to_string())
    }
}

impl From<String> for Target {
    fn from(name: String) -> Self {
        Target::Name(name)
    }
}

impl From<Function> for Target {
    fn from(function: Function) -> Self {
        Target::Function(function)
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Name(name) => f.write_str(name),
            Target::Function(_) => f.write_str("<function>"),
        }
    }
}

/// A composed route action.
#[derive(Clone)]
pub struct Pipeline {
    entry: Arc<Stage>,
    context: Arc<Container>,
    stages: usize,
}

impl Pipeline {
    /// Fold `middleware` around `target`, right to left.
    ///
    /// Name targets and method-qualified middleware names are parsed here,
    /// so a malformed name fails at registration with `NotCallable`.
    pub fn compose(
        context: Arc<Container>,
        middleware: &[MiddlewareRef],
        target: &Target,
    ) -> Result<Self, ContainerError> {
        let target = match target {
            Target::Name(name) => Callable::parse(name)?,
            Target::Function(function) => Callable::Function(function.clone()),
        };

        let terminal: Arc<Stage> = {
            let context = Arc::clone(&context);
            Arc::new(
                move |request: Instance, response: Instance, invocation: &Arc<Invocation>| {
                    let mut args = NamedArgs::new();
                    for (name, value) in invocation.params.iter() {
                        args.insert(name.to_string(), instance(value.clone()));
                    }
                    args.insert(REQUEST, request);
                    args.insert(RESPONSE, response);
                    args.insert(CONTEXT, context_instance(&context));
                    args.insert(DISPATCH_ID, instance(invocation.dispatch_id));
                    debug!(route_target = %target, "Invoking route target");
                    context.call(target.clone(), args)
                },
            )
        };

        let callables = middleware
            .iter()
            .map(MiddlewareRef::callable)
            .collect::<Result<Vec<_>, _>>()?;

        let entry = callables.into_iter().rev().fold(terminal, |inner, callable| {
            let context = Arc::clone(&context);
            Arc::new(
                move |request: Instance, response: Instance, invocation: &Arc<Invocation>| {
                    let next = Next {
                        inner: Arc::clone(&inner),
                        invocation: Arc::clone(invocation),
                    };
                    let args = NamedArgs::new()
                        .with(REQUEST, request)
                        .with(RESPONSE, response)
                        .with(NEXT, instance(next))
                        .with(CONTEXT, context_instance(&context))
                        .with(DISPATCH_ID, instance(invocation.dispatch_id));
                    debug!(middleware = %callable, "Entering middleware");
                    context.call(callable.clone(), args)
                },
            ) as Arc<Stage>
        });

        Ok(Self {
            entry,
            context,
            stages: middleware.len(),
        })
    }

    /// Run the pipeline with the parameters extracted by the matcher.
    pub fn run(
        &self,
        request: Instance,
        response: Instance,
        params: ParamVec,
        dispatch_id: DispatchId,
    ) -> Result<Instance, ContainerError> {
        let invocation = Arc::new(Invocation {
            params,
            dispatch_id,
        });
        (self.entry)(request, response, &invocation)
    }

    /// The container every stage is called through.
    pub fn context(&self) -> &Arc<Container> {
        &self.context
    }

    /// Number of middleware wrapped around the target.
    pub fn stages(&self) -> usize {
        self.stages
    }
}

fn context_instance(context: &Arc<Container>) -> Instance {
    Arc::clone(context) as Instance
}

/// Typed middleware, registered through [`TypeSpec::middleware`].
pub trait Middleware: Send + Sync + 'static {
    fn handle(
        &self,
        request: Instance,
        response: Instance,
        next: &Next,
        context: &Container,
    ) -> Result<Instance, ContainerError>;
}

impl<T: Middleware> TypeSpec<T> {
    /// Expose [`Middleware::handle`] as the `handle` method.
    #[must_use]
    pub fn middleware(self) -> Self {
        self.method(HANDLE, middleware_params(), |this, args| {
            let request = Arc::clone(args.raw(0)?);
            let response = Arc::clone(args.raw(1)?);
            let next = args.get::<Next>(2)?;
            let context = args.get::<Container>(3)?;
            this.handle(request, response, &next, &context)
        })
    }
}

/// The declared parameters of a middleware `handle` method.
pub fn middleware_params() -> [Param; 4] {
    [
        Param::untyped(REQUEST),
        Param::untyped(RESPONSE),
        Param::untyped(NEXT),
        Param::untyped(CONTEXT),
    ]
}
