use std::collections::HashMap;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use std::time::Instant;

use arc_swap::ArcSwapOption;
use http::Method;
use tracing::{debug, info, info_span, warn};

use super::pattern::{ParamVec, RoutePattern};
use super::pipeline::{MiddlewareRef, Pipeline, Target};
use super::table::{Route, RouteTable};
use super::RouteError;
use crate::container::{Container, Instance, STATIC_SEPARATOR};
use crate::ids::DispatchId;
use crate::runtime_config::RuntimeConfig;

/// Methods registered by [`Router::resource`].
pub const RESOURCE_METHODS: [Method; 4] = [Method::GET, Method::POST, Method::PUT, Method::DELETE];

/// Methods registered by [`Router::any`].
pub const ANY_METHODS: [Method; 5] = [
    Method::GET,
    Method::POST,
    Method::PUT,
    Method::DELETE,
    Method::PATCH,
];

/// Result of matching a request to a route.
///
/// A `RouteMatch` carries everything `dispatch` needs, so matching and
/// dispatching can run on any number of threads without shared state.
#[derive(Debug, Clone)]
pub struct RouteMatch {
    /// The matched route (shared with the table).
    pub route: Arc<Route>,
    /// The method the route was matched under.
    pub method: Method,
    /// Parameters extracted from the URI, in placeholder order.
    pub params: ParamVec,
}

impl RouteMatch {
    /// Get a parameter by name.
    ///
    /// Placeholder names are unique per route, so there is at most one
    /// match. An optional placeholder that matched nothing is `Some("")`.
    #[inline]
    #[must_use]
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }

    /// Parameters as an owned map.
    #[must_use]
    pub fn params_map(&self) -> HashMap<String, String> {
        self.params
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    /// Run the route's pipeline with `request` and `response` under a fresh
    /// [`DispatchId`].
    pub fn dispatch(&self, request: Instance, response: Instance) -> Result<Instance, RouteError> {
        self.dispatch_with_id(request, response, None)
    }

    /// Like [`dispatch`](RouteMatch::dispatch), but reuses an upstream
    /// correlation id when it parses as a ULID.
    ///
    /// The id names the dispatch span and reaches every stage as the
    /// `dispatch_id` argument.
    pub fn dispatch_with_id(
        &self,
        request: Instance,
        response: Instance,
        upstream_id: Option<&str>,
    ) -> Result<Instance, RouteError> {
        let dispatch_id = DispatchId::parse_or_new(upstream_id);
        let span = info_span!(
            "dispatch",
            dispatch_id = %dispatch_id,
            method = %self.method,
            route = %self.route.uri(),
        );
        let _entered = span.enter();

        let start = Instant::now();
        let result = self
            .route
            .pipeline()
            .run(request, response, self.params.clone(), dispatch_id);
        let duration_us = start.elapsed().as_micros();

        match &result {
            Ok(_) => debug!(
                route_target = %self.route.target(),
                middleware = self.route.pipeline().stages(),
                duration_us,
                "Dispatch completed"
            ),
            Err(err) => warn!(
                route_target = %self.route.target(),
                error = %err,
                duration_us,
                "Dispatch failed"
            ),
        }
        result.map_err(RouteError::from)
    }
}

/// Scope settings applied to every route registered inside a [`Router::group`].
#[derive(Default)]
pub struct Group {
    prefix: Option<String>,
    namespace: Option<String>,
    middleware: Vec<MiddlewareRef>,
    context: Option<Arc<Container>>,
}

impl Group {
    /// A group that changes nothing until configured.
    pub fn new() -> Self {
        Self::default()
    }

    /// Prepend `prefix` to every URI in the group.
    #[must_use]
    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    /// Qualify name targets in the group with `namespace`.
    #[must_use]
    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// Wrap the group's routes with `middleware`, outermost first.
    #[must_use]
    pub fn middleware<I, M>(mut self, middleware: I) -> Self
    where
        I: IntoIterator<Item = M>,
        M: Into<MiddlewareRef>,
    {
        self.middleware.extend(middleware.into_iter().map(Into::into));
        self
    }

    /// Resolve the group's routes through `context`.
    #[must_use]
    pub fn context(mut self, context: Arc<Container>) -> Self {
        self.context = Some(context);
        self
    }
}

/// Restores the builder stacks when a scope ends, including on `?` returns
/// and panics inside the block.
struct Scope<'a> {
    router: &'a mut Router,
    prefix_len: usize,
    namespace_len: usize,
    middleware_len: usize,
    owns_context: bool,
}

impl<'a> Scope<'a> {
    fn enter(router: &'a mut Router) -> Self {
        Self {
            prefix_len: router.prefixes.len(),
            namespace_len: router.namespaces.len(),
            middleware_len: router.middleware.len(),
            owns_context: false,
            router,
        }
    }
}

impl Deref for Scope<'_> {
    type Target = Router;

    fn deref(&self) -> &Router {
        self.router
    }
}

impl DerefMut for Scope<'_> {
    fn deref_mut(&mut self) -> &mut Router {
        self.router
    }
}

impl Drop for Scope<'_> {
    fn drop(&mut self) {
        self.router.prefixes.truncate(self.prefix_len);
        self.router.namespaces.truncate(self.namespace_len);
        self.router.middleware.truncate(self.middleware_len);
        if self.owns_context {
            self.router.active_context = None;
        }
    }
}

/// Route builder and matcher.
///
/// Routes are registered through `&mut self` during setup. Matching
/// (`route`, `match_route`) and dispatching only need `&self`, so a built
/// router can be shared behind an `Arc` while serving.
pub struct Router {
    table: RouteTable,
    names: HashMap<String, Arc<Route>>,
    last_route: Option<Arc<Route>>,
    prefixes: Vec<String>,
    namespaces: Vec<String>,
    middleware: Vec<MiddlewareRef>,
    root_context: Arc<Container>,
    active_context: Option<Arc<Container>>,
    current: ArcSwapOption<RouteMatch>,
    config: RuntimeConfig,
}

impl Router {
    /// Create a router whose routes resolve through `context` unless a
    /// `context` scope says otherwise.
    pub fn new(context: Arc<Container>) -> Self {
        Self::with_config(context, RuntimeConfig::default())
    }

    /// Create a router with explicit diagnostics settings.
    pub fn with_config(context: Arc<Container>, config: RuntimeConfig) -> Self {
        Self {
            table: RouteTable::new(),
            names: HashMap::new(),
            last_route: None,
            prefixes: Vec::new(),
            namespaces: Vec::new(),
            middleware: Vec::new(),
            root_context: context,
            active_context: None,
            current: ArcSwapOption::empty(),
            config,
        }
    }

    /// Diagnostics settings (slow-match threshold, route table logging).
    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// The registered routes, keyed by method.
    pub fn table(&self) -> &RouteTable {
        &self.table
    }

    /// The container routes registered right now would be called through.
    pub fn context(&self) -> &Arc<Container> {
        self.active_context.as_ref().unwrap_or(&self.root_context)
    }

    // Scopes

    /// Register the routes in `block` under `prefix`.
    pub fn prefix<F>(&mut self, prefix: &str, block: F) -> Result<&mut Self, RouteError>
    where
        F: FnOnce(&mut Router) -> Result<(), RouteError>,
    {
        self.scoped(Group::new().prefix(prefix), block)?;
        Ok(self)
    }

    /// Qualify name targets registered in `block` with `namespace`.
    pub fn namespace<F>(&mut self, namespace: &str, block: F) -> Result<&mut Self, RouteError>
    where
        F: FnOnce(&mut Router) -> Result<(), RouteError>,
    {
        self.scoped(Group::new().namespace(namespace), block)?;
        Ok(self)
    }

    /// Wrap the routes in `block` with `middleware`, outermost first.
    pub fn pipeline<I, M, F>(&mut self, middleware: I, block: F) -> Result<&mut Self, RouteError>
    where
        I: IntoIterator<Item = M>,
        M: Into<MiddlewareRef>,
        F: FnOnce(&mut Router) -> Result<(), RouteError>,
    {
        self.scoped(Group::new().middleware(middleware), block)?;
        Ok(self)
    }

    /// Resolve the routes in `block` through `context`. Contexts do not nest.
    pub fn context_scope<F>(
        &mut self,
        context: Arc<Container>,
        block: F,
    ) -> Result<&mut Self, RouteError>
    where
        F: FnOnce(&mut Router) -> Result<(), RouteError>,
    {
        self.scoped(Group::new().context(context), block)?;
        Ok(self)
    }

    /// Enter every scope `group` names at once.
    pub fn group<F>(&mut self, group: Group, block: F) -> Result<&mut Self, RouteError>
    where
        F: FnOnce(&mut Router) -> Result<(), RouteError>,
    {
        self.scoped(group, block)?;
        Ok(self)
    }

    fn scoped<F>(&mut self, group: Group, block: F) -> Result<(), RouteError>
    where
        F: FnOnce(&mut Router) -> Result<(), RouteError>,
    {
        if group.context.is_some() && self.active_context.is_some() {
            warn!("Context scope entered while another context is active");
            return Err(RouteError::DuplicateContext);
        }

        let mut scope = Scope::enter(self);
        if let Some(prefix) = group.prefix {
            scope.router.prefixes.push(prefix);
        }
        if let Some(namespace) = group.namespace {
            scope.router.namespaces.push(namespace);
        }
        scope.router.middleware.extend(group.middleware);
        if let Some(context) = group.context {
            scope.router.active_context = Some(context);
            scope.owns_context = true;
        }
        block(&mut scope)
    }

    // Registration

    /// Register `target` for every method in `methods` at `uri`.
    ///
    /// Either every method is registered or none is.
    pub fn access(
        &mut self,
        methods: &[Method],
        uri: &str,
        target: impl Into<Target>,
    ) -> Result<&mut Self, RouteError> {
        let mut unique: Vec<Method> = Vec::with_capacity(methods.len());
        for method in methods {
            if !unique.contains(method) {
                unique.push(method.clone());
            }
        }

        let uri = format!("{}{uri}", self.prefixes.concat());
        let target = self.qualify(target.into());
        let pattern = RoutePattern::parse(&uri)?;
        let pipeline = Pipeline::compose(Arc::clone(self.context()), &self.middleware, &target)?;

        let route = Arc::new(Route {
            methods: unique,
            uri,
            pattern,
            target: target.to_string(),
            middleware: self.middleware.iter().map(ToString::to_string).collect(),
            pipeline,
        });

        if let Some(method) = route
            .methods
            .iter()
            .find(|method| self.table.contains(method, &route))
        {
            warn!(method = %method, uri = %route.uri(), "Route already registered");
            return Err(RouteError::RouteRedefined {
                method: method.clone(),
                uri: route.key().to_string(),
            });
        }
        for method in &route.methods {
            self.table.insert(method.clone(), Arc::clone(&route))?;
        }

        debug!(
            methods = ?route.methods(),
            uri = %route.uri(),
            dynamic = route.is_dynamic(),
            route_target = %route.target(),
            middleware = ?route.middleware(),
            "Route registered"
        );
        self.last_route = Some(route);
        Ok(self)
    }

    /// Register `target` for GET at `uri`.
    pub fn get(&mut self, uri: &str, target: impl Into<Target>) -> Result<&mut Self, RouteError> {
        self.access(&[Method::GET], uri, target)
    }

    /// Register `target` for POST at `uri`.
    pub fn post(&mut self, uri: &str, target: impl Into<Target>) -> Result<&mut Self, RouteError> {
        self.access(&[Method::POST], uri, target)
    }

    /// Register `target` for PUT at `uri`.
    pub fn put(&mut self, uri: &str, target: impl Into<Target>) -> Result<&mut Self, RouteError> {
        self.access(&[Method::PUT], uri, target)
    }

    /// Register `target` for DELETE at `uri`.
    pub fn delete(&mut self, uri: &str, target: impl Into<Target>) -> Result<&mut Self, RouteError> {
        self.access(&[Method::DELETE], uri, target)
    }

    /// Register `target` for PATCH at `uri`.
    pub fn patch(&mut self, uri: &str, target: impl Into<Target>) -> Result<&mut Self, RouteError> {
        self.access(&[Method::PATCH], uri, target)
    }

    /// GET, POST, PUT and DELETE.
    pub fn resource(&mut self, uri: &str, target: impl Into<Target>) -> Result<&mut Self, RouteError> {
        self.access(&RESOURCE_METHODS, uri, target)
    }

    /// GET, POST, PUT, DELETE and PATCH.
    pub fn any(&mut self, uri: &str, target: impl Into<Target>) -> Result<&mut Self, RouteError> {
        self.access(&ANY_METHODS, uri, target)
    }

    fn qualify(&self, target: Target) -> Target {
        match target {
            Target::Name(name) if !self.namespaces.is_empty() => {
                let mut qualified = self.namespaces.join(STATIC_SEPARATOR);
                qualified.push_str(STATIC_SEPARATOR);
                qualified.push_str(&name);
                Target::Name(qualified)
            }
            other => other,
        }
    }

    // Reverse routing

    /// Name the most recently registered route.
    pub fn name(&mut self, name: &str) -> Result<&mut Self, RouteError> {
        let route = self
            .last_route
            .as_ref()
            .ok_or_else(|| RouteError::NothingToName {
                name: name.to_string(),
            })?;
        if self.names.contains_key(name) {
            return Err(RouteError::RouteNameConflict {
                name: name.to_string(),
            });
        }
        debug!(name = %name, uri = %route.uri(), "Route named");
        self.names.insert(name.to_string(), Arc::clone(route));
        Ok(self)
    }

    /// Build the URI of the route called `name`.
    ///
    /// Static routes return their URI as-is; dynamic routes fill their
    /// template from `args`.
    pub fn uri(&self, name: &str, args: &[(&str, &str)]) -> Result<String, RouteError> {
        let route = self
            .names
            .get(name)
            .ok_or_else(|| RouteError::RouteNameNotFound {
                name: name.to_string(),
            })?;
        match route.pattern() {
            Some(pattern) => {
                let args: HashMap<&str, &str> = args.iter().copied().collect();
                pattern.reverse(name, &args)
            }
            None => Ok(route.uri().to_string()),
        }
    }

    /// The route registered under `name`, if any.
    pub fn named(&self, name: &str) -> Option<&Arc<Route>> {
        self.names.get(name)
    }

    // Matching

    /// Match a request to a route.
    ///
    /// The static map is consulted first; dynamic patterns are then tried in
    /// registration order and the first match wins.
    #[must_use]
    pub fn route(&self, method: &Method, uri: &str) -> Option<RouteMatch> {
        debug!(method = %method, uri = %uri, "Route match attempt");

        let match_start = Instant::now();
        let result = self.table.lookup(method, uri);
        let match_duration = match_start.elapsed();
        let duration_us = match_duration.as_micros();

        if let Some((route, params)) = result {
            if duration_us > u128::from(self.config.slow_match_threshold_us) {
                warn!(
                    method = %method,
                    uri = %uri,
                    route_target = %route.target(),
                    route_pattern = %route.key(),
                    params = ?params,
                    duration_us,
                    "Slow route matching detected"
                );
            } else {
                info!(
                    method = %method,
                    uri = %uri,
                    route_target = %route.target(),
                    route_pattern = %route.key(),
                    params = ?params,
                    duration_us,
                    "Route matched"
                );
            }
            return Some(RouteMatch {
                route,
                method: method.clone(),
                params,
            });
        }

        warn!(method = %method, uri = %uri, duration_us, "No route matched");
        None
    }

    /// Match and remember the result as the current route for [`dispatch`].
    ///
    /// A failed match leaves the current route as it was.
    ///
    /// [`dispatch`]: Router::dispatch
    pub fn match_route(&self, method: &Method, uri: &str) -> bool {
        match self.route(method, uri) {
            Some(found) => {
                self.current.store(Some(Arc::new(found)));
                true
            }
            None => false,
        }
    }

    /// The route remembered by the last successful [`match_route`](Router::match_route).
    pub fn current(&self) -> Option<Arc<RouteMatch>> {
        self.current.load_full()
    }

    /// Dispatch to the current route.
    pub fn dispatch(&self, request: Instance, response: Instance) -> Result<Instance, RouteError> {
        let current = self.current.load_full().ok_or_else(|| {
            warn!("Dispatch called before a route was matched");
            RouteError::DispatchBeforeMatch
        })?;
        current.dispatch(request, response)
    }

    // Diagnostics

    /// `METHOD uri -> target` for every entry, sorted.
    pub fn routes_summary(&self) -> Vec<String> {
        let mut summary: Vec<String> = self
            .table
            .iter()
            .map(|(method, route)| format!("{method} {} -> {}", route.uri(), route.target()))
            .collect();
        summary.sort();
        summary
    }

    /// Emit the route table at `info`, unless disabled in the config.
    pub fn log_routes(&self) {
        if !self.config.log_route_table {
            return;
        }
        info!(
            routes_count = self.table.len(),
            named_routes = self.names.len(),
            routes_summary = ?self.routes_summary(),
            "Routing table loaded"
        );
    }

    /// Print all registered routes to stdout.
    pub fn dump_routes(&self) {
        println!("[routes] count={}", self.table.len());
        for line in self.routes_summary() {
            println!("[route] {line}");
        }
        self.log_routes();
    }
}
