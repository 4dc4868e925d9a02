//! # Router Module
//!
//! Path normalization, per-method prefix trees and the [`Router`] that ties
//! them to handler chains.
//!
//! ## Overview
//!
//! The router is responsible for:
//! - normalizing every registered pattern and incoming path the same way
//! - storing one prefix tree per HTTP method
//! - building each route's handler chain from global and group middleware
//! - resolving a request to its chain and path parameters
//! - driving the chain through a pooled [`Context`](crate::dispatcher::Context)
//!
//! ## Patterns
//!
//! Segments starting with `:` are parameters (`/users/:id`). Everything else
//! matches literally. There are no wildcards and no regex constraints.
//!
//! ```rust
//! use http::Method;
//! use sol::dispatcher::Context;
//! use sol::{handlers, Router};
//!
//! let mut router = Router::new();
//! router.get("/users/:id/posts/:post_id", handlers![|_: &mut Context| {}]);
//!
//! let m = router.lookup(&Method::GET, "/users/7/posts/99/").unwrap();
//! assert_eq!(m.get_path_param("id"), Some("7"));
//! assert_eq!(m.get_path_param("post_id"), Some("99"));
//! assert!(router.lookup(&Method::POST, "/users/7/posts/99").is_none());
//! ```
//!
//! ## Matching Rules
//!
//! - a static segment beats a parameter at the same position
//! - lookup never backtracks out of a static branch
//! - a path that only exists as a prefix of other routes does not match
//! - the same parameter name may repeat at different depths; the deepest
//!   capture wins on lookup by name
//!
//! ## Registration Errors
//!
//! Two parameters with different names at the same position cannot coexist.
//! The plain verbs panic on such a conflict; `try_*` variants return
//! [`RouteError`].

mod core;
mod group;
mod path;
mod radix;
#[cfg(test)]
mod performance_tests;

pub use self::core::{ParamVec, RouteMatch, Router, MAX_INLINE_PARAMS, NOT_FOUND_BODY};
pub use group::Group;
pub use path::{join_paths, normalize_path};
pub use radix::{RouteError, PARAM_MARKER};
