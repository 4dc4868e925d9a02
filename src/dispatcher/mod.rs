//! # Dispatcher Module
//!
//! Handler chains and the per-request [`Context`] they run against.
//!
//! ## Overview
//!
//! A route resolves to an ordered chain of [`HandlerFunc`]s: group and global
//! middleware first, the route's own handlers last. The router acquires a
//! context from the [`ContextPool`], calls [`Context::next`] once, and turns
//! whatever the chain wrote into an `http::Response`.
//!
//! ## Chain Control
//!
//! - [`Context::next`] runs the rest of the chain; code after it runs on the
//!   way back out
//! - [`Context::abort`] stops handlers that have not started yet
//! - a fired [`CancelToken`] stops the chain between handlers
//!
//! ```rust
//! use http::StatusCode;
//! use sol::dispatcher::Context;
//! use sol::handlers;
//!
//! let auth = |c: &mut Context| {
//!     if c.header("authorization").is_none() {
//!         c.abort_with_status(StatusCode::UNAUTHORIZED);
//!     }
//! };
//! let chain = handlers![auth, |c: &mut Context| c.string(StatusCode::OK, "secret")];
//! assert_eq!(chain.len(), 2);
//! ```
//!
//! ## Pooling
//!
//! Contexts are recycled between requests. Everything request-scoped is
//! cleared on release; a data map that was cloned out through
//! [`Context::shared_data`] is detached rather than cleared so its holder
//! keeps a consistent view.

mod cancel;
mod context;
mod cookie;
mod core;
mod pool;
mod response;

pub use self::core::{Handler, HandlerFunc, IntoHandlerFunc, Outcome, Request, Response};
pub use cancel::CancelToken;
pub use context::{Context, DataValue, SharedData};
pub use cookie::{Cookie, SameSite};
pub use pool::{ContextPool, PoolStats, DEFAULT_MAX_IDLE};
pub use response::ResponseWriter;
