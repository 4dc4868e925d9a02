use std::collections::HashMap;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;

use http::{Method, StatusCode};
use smallvec::SmallVec;
use tracing::{debug, error, info, trace};

use super::radix::{RouteError, Tree};
use crate::dispatcher::{
    Context, ContextPool, HandlerFunc, Outcome, PoolStats, Request, Response,
};
use crate::middleware::panic_message;

/// Maximum number of path parameters stored inline before spilling to the heap.
pub const MAX_INLINE_PARAMS: usize = 8;

/// Captured path parameters in path order.
///
/// Names are `Arc<str>` shared with the tree, so capturing a parameter clones
/// a pointer and copies only the value.
pub type ParamVec = SmallVec<[(Arc<str>, String); MAX_INLINE_PARAMS]>;

/// Body written by the built-in not-found handler.
pub const NOT_FOUND_BODY: &str = "404 page not found\n";

/// Result of resolving a method and path against the routing table.
pub struct RouteMatch {
    /// Full handler chain, middleware first
    pub handlers: Arc<[HandlerFunc]>,
    /// Parameters captured from the path
    pub path_params: ParamVec,
}

impl RouteMatch {
    /// Get a path parameter by name
    ///
    /// If the same name was captured at several depths the deepest one wins.
    #[inline]
    #[must_use]
    pub fn get_path_param(&self, name: &str) -> Option<&str> {
        self.path_params
            .iter()
            .rfind(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }

    /// Collect the parameters into a map. Allocates; prefer
    /// [`get_path_param`](Self::get_path_param) on hot paths.
    #[must_use]
    pub fn path_params_map(&self) -> HashMap<String, String> {
        self.path_params
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }
}

impl fmt::Debug for RouteMatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteMatch")
            .field("handlers", &self.handlers.len())
            .field("path_params", &self.path_params)
            .finish()
    }
}

fn default_not_found() -> HandlerFunc {
    HandlerFunc::new(|c: &mut Context| c.string(StatusCode::NOT_FOUND, NOT_FOUND_BODY))
}

/// Routing table and request entry point.
///
/// Routes are registered through `&mut self` during setup; afterwards the
/// router is shared read-only (typically as `Arc<Router>`) and
/// [`dispatch`](Self::dispatch) runs concurrently without locking the tree.
///
/// # Example
///
/// ```rust
/// use http::StatusCode;
/// use sol::dispatcher::Context;
/// use sol::{handlers, Router};
///
/// let mut router = Router::new();
/// router.get("/users/:id", handlers![|c: &mut Context| {
///     let id = c.param("id").unwrap_or_default().to_string();
///     c.string(StatusCode::OK, id);
/// }]);
///
/// let req = http::Request::get("/users/42").body(Vec::new()).unwrap();
/// let resp = router.dispatch(req);
/// assert_eq!(resp.body(), b"42");
/// ```
pub struct Router {
    trees: HashMap<Method, Tree>,
    pub(super) middlewares: Vec<HandlerFunc>,
    not_found: Arc<[HandlerFunc]>,
    pool: ContextPool,
}

impl Router {
    #[must_use]
    pub fn new() -> Self {
        Self::with_pool(ContextPool::new())
    }

    /// Router backed by a caller-configured context pool.
    #[must_use]
    pub fn with_pool(pool: ContextPool) -> Self {
        Self {
            trees: HashMap::new(),
            middlewares: Vec::new(),
            not_found: Arc::from(vec![default_not_found()]),
            pool,
        }
    }

    /// Register `middlewares ++ handlers` under `method` and `path`.
    ///
    /// Registering the same method and path again replaces the earlier chain.
    ///
    /// # Errors
    ///
    /// Returns [`RouteError`] when a parameter segment is unnamed or clashes
    /// with a differently named parameter at the same position.
    pub fn try_add_route(
        &mut self,
        method: Method,
        path: &str,
        middlewares: Vec<HandlerFunc>,
        handlers: Vec<HandlerFunc>,
    ) -> Result<(), RouteError> {
        let mut chain = middlewares;
        chain.extend(handlers);
        let chain_len = chain.len();
        self.trees
            .entry(method.clone())
            .or_default()
            .insert(path, Arc::from(chain))?;
        debug!(
            method = %method,
            path = %path,
            handlers = chain_len,
            "Route registered"
        );
        Ok(())
    }

    /// Like [`try_add_route`](Self::try_add_route) but a conflict is fatal.
    ///
    /// # Panics
    ///
    /// Panics with the [`RouteError`] message on a conflicting registration.
    pub fn add_route(
        &mut self,
        method: Method,
        path: &str,
        middlewares: Vec<HandlerFunc>,
        handlers: Vec<HandlerFunc>,
    ) {
        if let Err(err) = self.try_add_route(method, path, middlewares, handlers) {
            error!(error = %err, "Route registration failed");
            panic!("{err}");
        }
    }

    /// Register `handlers` behind the current global middleware.
    ///
    /// # Errors
    ///
    /// See [`try_add_route`](Self::try_add_route).
    pub fn try_handle(
        &mut self,
        method: Method,
        path: &str,
        handlers: Vec<HandlerFunc>,
    ) -> Result<&mut Self, RouteError> {
        let middlewares = self.middlewares.clone();
        self.try_add_route(method, path, middlewares, handlers)?;
        Ok(self)
    }

    /// Register `handlers` behind the current global middleware.
    ///
    /// # Panics
    ///
    /// Panics on a conflicting registration.
    pub fn handle(&mut self, method: Method, path: &str, handlers: Vec<HandlerFunc>) -> &mut Self {
        let middlewares = self.middlewares.clone();
        self.add_route(method, path, middlewares, handlers);
        self
    }

    pub fn get(&mut self, path: &str, handlers: Vec<HandlerFunc>) -> &mut Self {
        self.handle(Method::GET, path, handlers)
    }

    pub fn post(&mut self, path: &str, handlers: Vec<HandlerFunc>) -> &mut Self {
        self.handle(Method::POST, path, handlers)
    }

    pub fn put(&mut self, path: &str, handlers: Vec<HandlerFunc>) -> &mut Self {
        self.handle(Method::PUT, path, handlers)
    }

    pub fn delete(&mut self, path: &str, handlers: Vec<HandlerFunc>) -> &mut Self {
        self.handle(Method::DELETE, path, handlers)
    }

    pub fn patch(&mut self, path: &str, handlers: Vec<HandlerFunc>) -> &mut Self {
        self.handle(Method::PATCH, path, handlers)
    }

    pub fn options(&mut self, path: &str, handlers: Vec<HandlerFunc>) -> &mut Self {
        self.handle(Method::OPTIONS, path, handlers)
    }

    pub fn head(&mut self, path: &str, handlers: Vec<HandlerFunc>) -> &mut Self {
        self.handle(Method::HEAD, path, handlers)
    }

    /// Append global middleware. Routes registered earlier keep the chain they
    /// were built with.
    pub fn use_middleware(&mut self, middlewares: Vec<HandlerFunc>) -> &mut Self {
        self.middlewares.extend(middlewares);
        self
    }

    /// Global middleware captured by routes registered from now on.
    #[must_use]
    pub fn middlewares(&self) -> &[HandlerFunc] {
        &self.middlewares
    }

    /// Replace the fallback run when no route matches. `None` restores the
    /// built-in plain-text 404.
    pub fn not_found(&mut self, handler: Option<HandlerFunc>) -> &mut Self {
        let handler = handler.unwrap_or_else(default_not_found);
        self.not_found = Arc::from(vec![handler]);
        self
    }

    /// Resolve `method` and `path` without dispatching.
    #[must_use]
    pub fn lookup(&self, method: &Method, path: &str) -> Option<RouteMatch> {
        let found = self.trees.get(method)?.search(path);
        if found.is_none() {
            debug!(method = %method, path = %path, "No route matched");
        }
        found.map(|(handlers, path_params)| RouteMatch {
            handlers,
            path_params,
        })
    }

    /// Run one request through its handler chain.
    ///
    /// A miss runs the not-found handler on its own. A panic that escapes the
    /// chain is logged and turned into a 500 unless something was already
    /// written. The returned response carries the [`Outcome`] as an extension.
    pub fn dispatch(&self, request: Request) -> Response {
        let started = Instant::now();
        let (handlers, params) = match self.lookup(request.method(), request.uri().path()) {
            Some(m) => (m.handlers, m.path_params),
            None => (Arc::clone(&self.not_found), ParamVec::new()),
        };

        let mut ctx = self.pool.acquire(request, handlers, params);
        let outcome = match panic::catch_unwind(AssertUnwindSafe(|| ctx.next())) {
            Ok(()) => ctx.outcome(),
            Err(payload) => {
                error!(
                    request_id = %ctx.request_id(),
                    method = %ctx.method(),
                    path = %ctx.path(),
                    panic = %panic_message(payload.as_ref()),
                    "Handler panic escaped the chain"
                );
                if !ctx.writer().written() {
                    ctx.string(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error\n");
                }
                Outcome::Panicked
            }
        };

        trace!(
            request_id = %ctx.request_id(),
            method = %ctx.method(),
            path = %ctx.path(),
            outcome = %outcome,
            duration_us = started.elapsed().as_micros() as u64,
            "Dispatch finished"
        );

        let mut response = ctx.take_response();
        response.extensions_mut().insert(outcome);
        self.pool.release(ctx);
        response
    }

    #[must_use]
    pub fn pool_stats(&self) -> PoolStats {
        self.pool.stats()
    }

    /// Number of registered routes across all methods.
    #[must_use]
    pub fn route_count(&self) -> usize {
        self.trees.values().map(Tree::len).sum()
    }

    /// Registered `(method, path)` pairs, ordered by method then path.
    #[must_use]
    pub fn routes(&self) -> Vec<(Method, String)> {
        let mut methods: Vec<&Method> = self.trees.keys().collect();
        methods.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        methods
            .into_iter()
            .flat_map(|m| {
                self.trees[m]
                    .paths()
                    .into_iter()
                    .map(move |p| (m.clone(), p))
            })
            .collect()
    }

    /// Print all registered routes to stdout
    pub fn dump_routes(&self) {
        println!("[routes] count={}", self.route_count());
        for (method, path) in self.routes() {
            println!("[route] {method} {path}");
        }
    }

    /// Emit the routing table through `tracing`.
    pub fn log_routes(&self) {
        let routes = self.routes();
        info!(count = routes.len(), "Routing table loaded");
        for (method, path) in routes {
            debug!(method = %method, path = %path, "Route");
        }
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Router")
            .field("routes", &self.route_count())
            .field("middlewares", &self.middlewares.len())
            .field("pool", &self.pool)
            .finish()
    }
}
