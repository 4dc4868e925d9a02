use std::sync::Arc;

use http::Method;

use super::core::Router;
use super::path::{join_paths, normalize_path};
use super::radix::RouteError;
use crate::dispatcher::HandlerFunc;

/// Prefix and middleware of one group level, linked to its enclosing level.
struct Scope {
    prefix: String,
    middlewares: Vec<HandlerFunc>,
    parent: Option<Arc<Scope>>,
}

/// A registration scope sharing a path prefix and middleware.
///
/// Groups own no routes: everything registered through a group lands in the
/// router's trees with the prefix applied and the chain
/// `own ++ ancestors (nearest first) ++ router global ++ handlers`, resolved
/// when the route is registered.
///
/// ```rust
/// use http::Method;
/// use sol::dispatcher::Context;
/// use sol::{handlers, Router};
///
/// let mut router = Router::new();
/// let mut api = router.group("/api", handlers![|c: &mut Context| c.next()]);
/// let mut v1 = api.group("v1", handlers![]);
/// v1.get("/users", handlers![|_: &mut Context| {}]);
///
/// assert!(router.lookup(&Method::GET, "/api/v1/users").is_some());
/// ```
pub struct Group<'r> {
    router: &'r mut Router,
    scope: Arc<Scope>,
}

impl Router {
    /// Open a group rooted at `prefix`.
    pub fn group(&mut self, prefix: &str, middlewares: Vec<HandlerFunc>) -> Group<'_> {
        Group {
            router: self,
            scope: Arc::new(Scope {
                prefix: normalize_path(prefix).into_owned(),
                middlewares,
                parent: None,
            }),
        }
    }
}

impl Group<'_> {
    /// The group's full, normalized prefix.
    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.scope.prefix
    }

    /// Open a nested group. Its prefix is appended to this one and this
    /// group's middleware runs after the nested group's own.
    pub fn group(&mut self, prefix: &str, middlewares: Vec<HandlerFunc>) -> Group<'_> {
        Group {
            router: &mut *self.router,
            scope: Arc::new(Scope {
                prefix: join_paths(&self.scope.prefix, prefix),
                middlewares,
                parent: Some(Arc::clone(&self.scope)),
            }),
        }
    }

    fn collect_middlewares(&self) -> Vec<HandlerFunc> {
        let mut mids = Vec::new();
        let mut current = Some(&self.scope);
        while let Some(scope) = current {
            mids.extend(scope.middlewares.iter().cloned());
            current = scope.parent.as_ref();
        }
        mids.extend(self.router.middlewares.iter().cloned());
        mids
    }

    /// # Errors
    ///
    /// See [`Router::try_add_route`].
    pub fn try_handle(
        &mut self,
        method: Method,
        path: &str,
        handlers: Vec<HandlerFunc>,
    ) -> Result<&mut Self, RouteError> {
        let full_path = join_paths(&self.scope.prefix, path);
        let middlewares = self.collect_middlewares();
        self.router
            .try_add_route(method, &full_path, middlewares, handlers)?;
        Ok(self)
    }

    /// # Panics
    ///
    /// Panics on a conflicting registration.
    pub fn handle(&mut self, method: Method, path: &str, handlers: Vec<HandlerFunc>) -> &mut Self {
        let full_path = join_paths(&self.scope.prefix, path);
        let middlewares = self.collect_middlewares();
        self.router
            .add_route(method, &full_path, middlewares, handlers);
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
}

impl std::fmt::Debug for Group<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Group")
            .field("prefix", &self.scope.prefix)
            .field("middlewares", &self.scope.middlewares.len())
            .finish_non_exhaustive()
    }
}
