//! Built-in middleware.
//!
//! Middleware are ordinary handlers that call
//! [`Context::next`](crate::dispatcher::Context::next) and do their work
//! around it.

mod logger;
mod recovery;

pub use logger::logger;
pub use recovery::recovery;

pub(crate) use recovery::panic_message;
