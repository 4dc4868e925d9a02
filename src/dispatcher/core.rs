use std::fmt;
use std::sync::Arc;

use super::Context;

/// Request type flowing through the handler chain.
pub type Request = http::Request<Vec<u8>>;

/// Response type produced by a completed dispatch.
pub type Response = http::Response<Vec<u8>>;

/// A unit of work in a handler chain.
///
/// Middleware and terminal handlers are the same thing: a handler that wants
/// to wrap the rest of the chain calls [`Context::next`] and keeps running
/// after it returns. Any `Fn(&mut Context) + Send + Sync + 'static` closure is
/// a handler.
pub trait Handler: Send + Sync + 'static {
    fn call(&self, c: &mut Context);
}

impl<F> Handler for F
where
    F: Fn(&mut Context) + Send + Sync + 'static,
{
    fn call(&self, c: &mut Context) {
        self(c)
    }
}

/// Shared, cheaply clonable handle to a [`Handler`].
#[derive(Clone)]
pub struct HandlerFunc(Arc<dyn Handler>);

impl HandlerFunc {
    pub fn new<H: Handler>(handler: H) -> Self {
        Self(Arc::new(handler))
    }

    #[inline]
    pub fn call(&self, c: &mut Context) {
        self.0.call(c)
    }

    /// Whether both handles point at the same handler.
    #[must_use]
    pub fn ptr_eq(&self, other: &HandlerFunc) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for HandlerFunc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("HandlerFunc")
    }
}

/// Conversion used by [`handlers!`](crate::handlers) so closures and existing
/// [`HandlerFunc`]s can be mixed in one list.
pub trait IntoHandlerFunc {
    fn into_handler_func(self) -> HandlerFunc;
}

impl<F> IntoHandlerFunc for F
where
    F: Fn(&mut Context) + Send + Sync + 'static,
{
    fn into_handler_func(self) -> HandlerFunc {
        HandlerFunc::new(self)
    }
}

impl IntoHandlerFunc for HandlerFunc {
    fn into_handler_func(self) -> HandlerFunc {
        self
    }
}

/// Build a `Vec<HandlerFunc>` from closures and handler handles.
///
/// ```
/// use sol::dispatcher::Context;
/// use sol::{handlers, middleware::recovery};
///
/// let chain = handlers![recovery(), |c: &mut Context| c.next()];
/// assert_eq!(chain.len(), 2);
/// ```
#[macro_export]
macro_rules! handlers {
    () => {
        ::std::vec::Vec::<$crate::dispatcher::HandlerFunc>::new()
    };
    ($($handler:expr),+ $(,)?) => {
        ::std::vec![$($crate::dispatcher::IntoHandlerFunc::into_handler_func($handler)),+]
    };
}

/// How a dispatch ended. Attached to every dispatched response as an
/// extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The chain ran past its last handler
    Completed,
    /// A handler called [`Context::abort`]
    Aborted,
    /// The request's cancellation token fired before the chain finished
    Cancelled,
    /// A handler panicked and the panic was converted into a response
    Panicked,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Outcome::Completed => "completed",
            Outcome::Aborted => "aborted",
            Outcome::Cancelled => "cancelled",
            Outcome::Panicked => "panicked",
        };
        f.write_str(s)
    }
}
