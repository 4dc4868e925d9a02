//! # sol
//!
//! **sol** is a small HTTP web framework on top of the `may` coroutine runtime:
//! a per-method prefix-tree router, middleware chains, and a pooled
//! per-request context.
//!
//! ## Overview
//!
//! Routes map normalized paths with static segments and `:name` parameters to
//! ordered handler chains. Middleware is just a handler that calls
//! [`Context::next`](dispatcher::Context::next). Groups share a prefix and
//! middleware, and nest.
//!
//! ```rust
//! use http::StatusCode;
//! use sol::dispatcher::{Context, Outcome};
//! use sol::{handlers, Router};
//!
//! let mut router = Router::new();
//! router.use_middleware(handlers![|c: &mut Context| {
//!     c.set_header("x-powered-by", "sol");
//!     c.next();
//! }]);
//!
//! let mut api = router.group("/api", handlers![]);
//! api.get("/hello/:name", handlers![|c: &mut Context| {
//!     let greeting = format!("hello {}", c.param("name").unwrap_or("stranger"));
//!     c.string(StatusCode::OK, greeting);
//! }]);
//!
//! let resp = router.dispatch(http::Request::get("/api/hello/ferris/").body(Vec::new()).unwrap());
//! assert_eq!(resp.status(), StatusCode::OK);
//! assert_eq!(resp.body(), b"hello ferris");
//! assert_eq!(resp.headers()["x-powered-by"], "sol");
//! assert_eq!(resp.extensions().get::<Outcome>(), Some(&Outcome::Completed));
//! ```
//!
//! ## Architecture
//!
//! - **[`router`]** - path normalization, per-method trees, groups, dispatch
//! - **[`dispatcher`]** - handler chains, [`Context`](dispatcher::Context), context pool
//! - **[`middleware`]** - panic recovery and access logging
//! - **[`server`]** - `may_minihttp` adapter and server handle
//! - **[`binding`]** - JSON, form and query binding
//! - **[`validator`]** - rule-based validation
//! - **[`logging`]**, **[`runtime_config`]**, **[`ids`]** - ambient setup
//!
//! ## Request Lifecycle
//!
//! 1. the server turns the raw request into `http::Request<Vec<u8>>`
//! 2. the router normalizes the path and searches the method's tree
//! 3. a pooled context is seeded with the chain and captured parameters
//! 4. the chain runs until it ends, aborts or the request is cancelled
//! 5. the buffered response is written back and the context returns to the pool
//!
//! A miss runs the not-found handler. A panic is turned into a 500 by
//! [`middleware::recovery`] (installed by [`App::new`]) and, as a backstop, by
//! the dispatcher itself.
//!
//! ## Configuration
//!
//! | Variable          | Default  | Effect                               |
//! |-------------------|----------|--------------------------------------|
//! | `SOL_ADDR`        | `:23719` | listen address used by [`App::run`]  |
//! | `SOL_STACK_SIZE`  | `0x8000` | coroutine stack size                 |
//! | `SOL_LOG_LEVEL`   | `info`   | default log level                    |
//! | `SOL_LOG_FORMAT`  | `pretty` | `json` or `pretty`                   |

mod app;
pub mod binding;
pub mod dispatcher;
pub mod ids;
pub mod logging;
pub mod middleware;
pub mod router;
pub mod runtime_config;
pub mod server;
pub mod validator;

pub use app::{format_listen_url, App};
pub use dispatcher::{Context, HandlerFunc};
pub use router::{Group, RouteError, Router};
