//! # Server Module
//!
//! Glue between the `may_minihttp` coroutine server and the [`Router`](crate::Router).
//!
//! ## Request Flow
//!
//! 1. `may_minihttp` parses the request line and headers
//! 2. [`AppService`] converts it into an owned `http::Request<Vec<u8>>`
//!    (see [`into_http_request`]) with a fresh cancellation token
//! 3. the router dispatches it through the matched handler chain
//! 4. [`write_response`] copies status, headers and body back
//!
//! Each connection is served by its own coroutine; the router is shared
//! read-only between them.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use http::StatusCode;
//! use sol::dispatcher::Context;
//! use sol::server::{AppService, HttpServer};
//! use sol::{handlers, Router};
//!
//! let mut router = Router::new();
//! router.get("/ping", handlers![|c: &mut Context| c.string(StatusCode::OK, "pong")]);
//!
//! let handle = HttpServer(AppService::new(Arc::new(router)))
//!     .start("127.0.0.1:8080")
//!     .unwrap();
//! handle.wait_ready().unwrap();
//! handle.stop();
//! ```

pub mod http_server;
pub mod request;
pub mod response;
pub mod service;

pub use http_server::{HttpServer, ServerHandle};
pub use request::{client_ip, into_http_request, parse_cookie_header, RemoteAddr};
pub use response::{uncached_header_lines, write_plain, write_response};
pub use service::AppService;
