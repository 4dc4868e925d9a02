use std::time::Instant;

use tracing::{info, info_span};

use crate::dispatcher::{Context, HandlerFunc};

/// Access log: one `info` event per request once the downstream chain has
/// returned.
///
/// The downstream chain runs inside a `request` span carrying the request id,
/// so events emitted by handlers are correlated with the access line.
#[must_use]
pub fn logger() -> HandlerFunc {
    HandlerFunc::new(|c: &mut Context| {
        let start = Instant::now();
        let span = info_span!(
            "request",
            request_id = %c.request_id(),
            method = %c.method(),
            path = %c.path()
        );
        {
            let _entered = span.enter();
            c.next();
        }
        let duration = start.elapsed();

        info!(
            request_id = %c.request_id(),
            method = %c.method(),
            path = %c.path(),
            status = c.writer().status().as_u16(),
            duration_us = duration.as_micros() as u64,
            client_ip = %c.client_ip(),
            user_agent = c.header("user-agent").unwrap_or("-"),
            "Request handled"
        );
    })
}
