use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use http::Method;

use super::pattern::{ParamVec, RoutePattern};
use super::pipeline::Pipeline;
use super::RouteError;

/// A registered route: its URI shape plus the composed action.
pub struct Route {
    pub(crate) methods: Vec<Method>,
    pub(crate) uri: String,
    pub(crate) pattern: Option<RoutePattern>,
    pub(crate) target: String,
    pub(crate) middleware: Vec<String>,
    pub(crate) pipeline: Pipeline,
}

impl Route {
    /// The effective URI as registered, placeholders included.
    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// Every method this route was registered under.
    pub fn methods(&self) -> &[Method] {
        &self.methods
    }

    /// Whether the URI holds placeholders.
    pub fn is_dynamic(&self) -> bool {
        self.pattern.is_some()
    }

    pub fn pattern(&self) -> Option<&RoutePattern> {
        self.pattern.as_ref()
    }

    /// The effective target, namespace applied.
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Labels of the wrapping middleware, outermost first.
    pub fn middleware(&self) -> &[String] {
        &self.middleware
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    /// The key that must be unique per method: the URI for static routes,
    /// the pattern shape for dynamic ones.
    pub fn key(&self) -> &str {
        match &self.pattern {
            Some(pattern) => pattern.shape(),
            None => &self.uri,
        }
    }
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("methods", &self.methods)
            .field("uri", &self.uri)
            .field("pattern", &self.pattern.as_ref().map(RoutePattern::as_str))
            .field("target", &self.target)
            .field("middleware", &self.middleware)
            .finish()
    }
}

#[derive(Default)]
struct MethodRoutes {
    statics: HashMap<String, Arc<Route>>,
    dynamic: Vec<Arc<Route>>,
    patterns: HashSet<String>,
}

impl MethodRoutes {
    fn contains(&self, route: &Route) -> bool {
        match &route.pattern {
            Some(pattern) => self.patterns.contains(pattern.shape()),
            None => self.statics.contains_key(&route.uri),
        }
    }
}

/// Routes keyed by method: exact-match statics first, then dynamic patterns
/// in registration order.
#[derive(Default)]
pub struct RouteTable {
    methods: HashMap<Method, MethodRoutes>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `route`'s URI or pattern is already taken for `method`.
    pub fn contains(&self, method: &Method, route: &Route) -> bool {
        self.methods
            .get(method)
            .is_some_and(|routes| routes.contains(route))
    }

    /// Add `route` under `method`; `RouteRedefined` if its key is taken.
    pub fn insert(&mut self, method: Method, route: Arc<Route>) -> Result<(), RouteError> {
        let routes = self.methods.entry(method.clone()).or_default();
        if routes.contains(&route) {
            return Err(RouteError::RouteRedefined {
                method,
                uri: route.key().to_string(),
            });
        }
        let key = route.key().to_string();
        if route.is_dynamic() {
            routes.patterns.insert(key);
            routes.dynamic.push(route);
        } else {
            routes.statics.insert(key, route);
        }
        Ok(())
    }

    /// Exact static lookup first; otherwise the first dynamic pattern that
    /// matches the whole URI.
    pub fn lookup(&self, method: &Method, uri: &str) -> Option<(Arc<Route>, ParamVec)> {
        let routes = self.methods.get(method)?;
        if let Some(route) = routes.statics.get(uri) {
            return Some((Arc::clone(route), ParamVec::new()));
        }
        routes.dynamic.iter().find_map(|route| {
            route
                .pattern
                .as_ref()
                .and_then(|pattern| pattern.captures(uri))
                .map(|params| (Arc::clone(route), params))
        })
    }

    /// Number of (method, route) entries.
    pub fn len(&self) -> usize {
        self.methods
            .values()
            .map(|routes| routes.statics.len() + routes.dynamic.len())
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every entry, statics before dynamics within a method. Method order is
    /// unspecified.
    pub fn iter(&self) -> impl Iterator<Item = (&Method, &Arc<Route>)> {
        self.methods.iter().flat_map(|(method, routes)| {
            routes
                .statics
                .values()
                .chain(routes.dynamic.iter())
                .map(move |route| (method, route))
        })
    }
}
