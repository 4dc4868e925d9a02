//! Per-method prefix tree for route matching
//!
//! Each HTTP method owns one `Tree`. A path is split into `/`-delimited
//! segments and every segment position is one `Node`:
//!
//! - static segments (e.g. `users`) are stored in a map keyed by the literal
//! - a parameter segment (e.g. `:id`) is stored as the single parameter child
//! - a node carrying a handler chain terminates a registered route
//!
//! ## Matching
//!
//! Lookup is greedy and never backtracks. At each position an exact static
//! child wins over the parameter child; if neither exists the path does not
//! match. Landing on a node that only exists as a prefix of other routes is a
//! miss as well.
//!
//! ```text
//! /users            static  "users"        (terminal)
//! /users/me         static  "users" -> "me" (terminal)
//! /users/:id        static  "users" -> :id  (terminal)
//! /users/:id/posts  static  "users" -> :id -> "posts" (terminal)
//! ```
//!
//! With the routes above, `/users/me` resolves to the `me` chain and never to
//! `:id` with `id = "me"`.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use super::core::ParamVec;
use super::path::{normalize_path, segments};
use crate::dispatcher::HandlerFunc;

/// Marker that turns a segment into a named parameter (`:id`).
pub const PARAM_MARKER: char = ':';

/// Registration-time structural error.
///
/// These are programmer errors: the plain registration verbs on
/// [`Router`](super::Router) panic with this message, the `try_` variants
/// hand it back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteError {
    /// A parameter segment uses a different name than the parameter already
    /// registered at the same position
    ParamConflict {
        /// The normalized path being registered
        path: String,
        /// The parameter name in the new registration
        param: String,
        /// The parameter name that owns the position
        existing: String,
    },
    /// A parameter segment without a name (a bare `:`)
    EmptyParamName {
        /// The normalized path being registered
        path: String,
    },
}

impl fmt::Display for RouteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RouteError::ParamConflict {
                path,
                param,
                existing,
            } => write!(
                f,
                "cannot register '{path}': parameter name ':{param}' conflicts with existing ':{existing}' in previously registered path"
            ),
            RouteError::EmptyParamName { path } => {
                write!(f, "cannot register '{path}': parameter segment has no name")
            }
        }
    }
}

impl std::error::Error for RouteError {}

/// One segment position in the tree.
#[derive(Default)]
struct Node {
    /// Children matched by literal equality
    static_children: HashMap<String, Node>,
    /// The single child matching any segment
    param_child: Option<Box<Node>>,
    /// Name captured by this node when it is a parameter child
    param_name: Option<Arc<str>>,
    /// Present only when this node terminates a registered route
    handlers: Option<Arc<[HandlerFunc]>>,
}

impl Node {
    fn param(name: &str) -> Self {
        Self {
            param_name: Some(Arc::from(name)),
            ..Self::default()
        }
    }

    fn count_routes(&self) -> usize {
        usize::from(self.handlers.is_some())
            + self
                .static_children
                .values()
                .map(Node::count_routes)
                .sum::<usize>()
            + self.param_child.as_ref().map_or(0, |c| c.count_routes())
    }

    fn collect_paths(&self, prefix: &str, out: &mut Vec<String>) {
        if self.handlers.is_some() {
            out.push(if prefix.is_empty() {
                "/".to_string()
            } else {
                prefix.to_string()
            });
        }
        let mut keys: Vec<&String> = self.static_children.keys().collect();
        keys.sort();
        for key in keys {
            if let Some(child) = self.static_children.get(key) {
                child.collect_paths(&format!("{prefix}/{key}"), out);
            }
        }
        if let Some(child) = &self.param_child {
            let name = child.param_name.as_deref().unwrap_or_default();
            child.collect_paths(&format!("{prefix}/{PARAM_MARKER}{name}"), out);
        }
    }
}

/// Prefix tree for one HTTP method.
#[derive(Default)]
pub(crate) struct Tree {
    root: Node,
}

impl Tree {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Insert a route, replacing any chain already registered at the same path.
    pub(crate) fn insert(
        &mut self,
        path: &str,
        handlers: Arc<[HandlerFunc]>,
    ) -> Result<(), RouteError> {
        let path = normalize_path(path);
        if path == "/" {
            self.root.handlers = Some(handlers);
            return Ok(());
        }

        let mut cur = &mut self.root;
        for segment in segments(&path) {
            cur = match segment.strip_prefix(PARAM_MARKER) {
                Some("") => {
                    return Err(RouteError::EmptyParamName {
                        path: path.to_string(),
                    })
                }
                Some(name) => {
                    if let Some(existing) = cur
                        .param_child
                        .as_ref()
                        .and_then(|c| c.param_name.as_deref())
                    {
                        if existing != name {
                            return Err(RouteError::ParamConflict {
                                path: path.to_string(),
                                param: name.to_string(),
                                existing: existing.to_string(),
                            });
                        }
                    }
                    &mut **cur
                        .param_child
                        .get_or_insert_with(|| Box::new(Node::param(name)))
                }
                None => cur.static_children.entry(segment.to_string()).or_default(),
            };
        }

        cur.handlers = Some(handlers);
        Ok(())
    }

    /// Find the chain registered for `path` and capture its parameters.
    pub(crate) fn search(&self, path: &str) -> Option<(Arc<[HandlerFunc]>, ParamVec)> {
        let path = normalize_path(path);
        let mut params = ParamVec::new();
        if path == "/" {
            return self.root.handlers.as_ref().map(|h| (Arc::clone(h), params));
        }

        let mut cur = &self.root;
        for segment in segments(&path) {
            if let Some(child) = cur.static_children.get(segment) {
                cur = child;
                continue;
            }
            let child = cur.param_child.as_deref()?;
            if let Some(name) = &child.param_name {
                params.push((Arc::clone(name), segment.to_string()));
            }
            cur = child;
        }

        cur.handlers.as_ref().map(|h| (Arc::clone(h), params))
    }

    /// Number of terminal nodes.
    pub(crate) fn len(&self) -> usize {
        self.root.count_routes()
    }

    /// Registered path patterns, statics sorted before the parameter child.
    pub(crate) fn paths(&self) -> Vec<String> {
        let mut out = Vec::new();
        self.root.collect_paths("", &mut out);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatcher::Context;

    fn chain(tag: &'static str) -> Arc<[HandlerFunc]> {
        Arc::from(vec![HandlerFunc::new(move |c: &mut Context| c.set("tag", tag))])
    }

    fn param<'a>(params: &'a ParamVec, name: &str) -> Option<&'a str> {
        params
            .iter()
            .rfind(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }

    #[test]
    fn test_root_route() {
        let mut tree = Tree::new();
        assert!(tree.search("/").is_none());
        tree.insert("", chain("root")).unwrap();
        let (_, params) = tree.search("/").unwrap();
        assert!(params.is_empty());
        assert!(tree.search("//").is_some());
    }

    #[test]
    fn test_static_route_and_trailing_slash() {
        let mut tree = Tree::new();
        tree.insert("/home", chain("home")).unwrap();
        assert!(tree.search("/home").is_some());
        assert!(tree.search("/home/").is_some());
        assert!(tree.search("home").is_some());
        assert!(tree.search("/homes").is_none());
        assert!(tree.search("/").is_none());
    }

    #[test]
    fn test_param_capture() {
        let mut tree = Tree::new();
        tree.insert("/users/:user_id/posts/:post_id", chain("post")).unwrap();
        let (_, params) = tree.search("/users/123/posts/456").unwrap();
        assert_eq!(param(&params, "user_id"), Some("123"));
        assert_eq!(param(&params, "post_id"), Some("456"));
        assert_eq!(params[0].0.as_ref(), "user_id");
    }

    #[test]
    fn test_prefix_only_node_is_a_miss() {
        let mut tree = Tree::new();
        tree.insert("/a/b/c", chain("abc")).unwrap();
        assert!(tree.search("/a").is_none());
        assert!(tree.search("/a/b").is_none());
        assert!(tree.search("/a/b/c").is_some());
        assert!(tree.search("/a/b/c/d").is_none());
    }

    #[test]
    fn test_param_name_conflict() {
        let mut tree = Tree::new();
        tree.insert("/users/:id", chain("a")).unwrap();
        let err = tree.insert("/users/:userId/", chain("b")).unwrap_err();
        assert_eq!(
            err,
            RouteError::ParamConflict {
                path: "/users/:userId".to_string(),
                param: "userId".to_string(),
                existing: "id".to_string(),
            }
        );
        assert!(err.to_string().contains("conflicts with existing ':id'"));
        tree.insert("/users/:id/posts", chain("c")).unwrap();
    }

    #[test]
    fn test_empty_param_name() {
        let mut tree = Tree::new();
        let err = tree.insert("/users/:", chain("a")).unwrap_err();
        assert!(matches!(err, RouteError::EmptyParamName { .. }));
    }

    #[test]
    fn test_static_beats_param_without_backtracking() {
        let mut tree = Tree::new();
        tree.insert("/users/me/profile", chain("profile")).unwrap();
        tree.insert("/users/:id/posts", chain("posts")).unwrap();
        assert!(tree.search("/users/me/profile").is_some());
        assert!(tree.search("/users/42/posts").is_some());
        // "me" commits to the static branch, which has no "posts" child
        assert!(tree.search("/users/me/posts").is_none());
    }

    #[test]
    fn test_len_and_paths() {
        let mut tree = Tree::new();
        tree.insert("/", chain("root")).unwrap();
        tree.insert("/users", chain("list")).unwrap();
        tree.insert("/users/:id", chain("get")).unwrap();
        tree.insert("/users/me", chain("me")).unwrap();
        tree.insert("/users/me", chain("me-again")).unwrap();
        assert_eq!(tree.len(), 4);
        assert_eq!(tree.paths(), vec!["/", "/users", "/users/me", "/users/:id"]);
    }
}
