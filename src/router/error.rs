use http::Method;

use crate::container::ContainerError;

/// Errors raised while registering routes, generating URIs or dispatching.
#[derive(Debug, thiserror::Error)]
pub enum RouteError {
    /// The static URI or derived pattern is already registered for the method.
    #[error("route redefined: {method} '{uri}' already exists")]
    RouteRedefined { method: Method, uri: String },

    /// Two routes were given the same name.
    #[error("route name conflict: '{name}' is already used")]
    RouteNameConflict { name: String },

    /// A `context` scope was entered while another one is active.
    #[error("duplicate context: contexts do not nest")]
    DuplicateContext,

    /// `name` was called before any route was registered.
    #[error("no route has been registered yet to name '{name}'")]
    NothingToName { name: String },

    /// `uri` was asked for a name no route carries.
    #[error("route name not found: '{name}'")]
    RouteNameNotFound { name: String },

    /// A required placeholder had no value when generating a URI.
    #[error("missing route argument '{param}' for route '{name}'")]
    MissingRouteArgument { name: String, param: String },

    /// `dispatch` was called without a prior successful `match_route`.
    #[error("dispatch before match: no route has been matched")]
    DispatchBeforeMatch,

    /// A placeholder body does not compile as a regular expression.
    #[error("invalid route pattern for '{uri}': {source}")]
    InvalidPattern {
        uri: String,
        #[source]
        source: regex::Error,
    },

    /// Resolving or calling a middleware or target failed.
    #[error(transparent)]
    Container(#[from] ContainerError),
}
