use std::any::Any;
use std::backtrace::Backtrace;
use std::panic::{self, AssertUnwindSafe};

use http::StatusCode;
use tracing::{error, warn};

use crate::dispatcher::{Context, HandlerFunc};

/// Text of a panic payload, for logging.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// Turn a panic anywhere downstream into a `500 Internal Server Error`.
///
/// The panic is logged at `error` with the request id, method, path and a
/// backtrace (captured when `RUST_BACKTRACE` enables it). If a response was
/// already started it is left as is. Handlers after the panicking one do not
/// run.
///
/// Install it first so it wraps everything else; [`App::new`](crate::App::new)
/// does this.
#[must_use]
pub fn recovery() -> HandlerFunc {
    HandlerFunc::new(|c: &mut Context| {
        let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| c.next())) else {
            return;
        };

        error!(
            request_id = %c.request_id(),
            method = %c.method(),
            path = %c.path(),
            panic = %panic_message(payload.as_ref()),
            backtrace = %Backtrace::capture(),
            "Recovered from handler panic"
        );
        c.mark_panicked();
        c.abort();
        if c.writer().written() {
            warn!(
                request_id = %c.request_id(),
                status = c.writer().status().as_u16(),
                "Response already started; keeping it"
            );
        } else {
            c.string(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error\n");
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_panic_message() {
        let payload: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(payload.as_ref()), "boom");
        let payload: Box<dyn Any + Send> = Box::new(String::from("bang"));
        assert_eq!(panic_message(payload.as_ref()), "bang");
        let payload: Box<dyn Any + Send> = Box::new(7u8);
        assert_eq!(panic_message(payload.as_ref()), "non-string panic payload");
    }
}
