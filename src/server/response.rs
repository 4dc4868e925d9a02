use std::sync::atomic::{AtomicUsize, Ordering};

use dashmap::DashMap;
use http::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_LENGTH};
use http::StatusCode;
use may_minihttp::Response as RawResponse;
use once_cell::sync::Lazy;
use tracing::warn;

use crate::dispatcher::Response;

/// Header slots available in a `may_minihttp` response.
pub const MAX_RESPONSE_HEADERS: usize = 16;

/// Distinct header lines kept in the intern table.
pub const MAX_INTERNED_HEADER_LINES: usize = 4096;

// may_minihttp only accepts `&'static str` header lines. Repeated lines are
// leaked once and reused from this table; once it is full, further distinct
// lines are leaked one by one and counted.
static HEADER_LINES: Lazy<DashMap<String, &'static str>> = Lazy::new(DashMap::new);

static UNCACHED_LINES: AtomicUsize = AtomicUsize::new(0);

/// Header lines leaked outside the intern table since startup.
///
/// A steadily growing value means responses carry high-variety headers
/// (session cookies, per-request ids) and each one costs a small allocation
/// that is never freed.
#[must_use]
pub fn uncached_header_lines() -> usize {
    UNCACHED_LINES.load(Ordering::Relaxed)
}

pub(crate) fn status_reason(status: StatusCode) -> &'static str {
    status.canonical_reason().unwrap_or("Unknown")
}

fn intern(line: String) -> &'static str {
    if let Some(existing) = HEADER_LINES.get(&line) {
        return *existing;
    }
    if HEADER_LINES.len() >= MAX_INTERNED_HEADER_LINES {
        let count = UNCACHED_LINES.fetch_add(1, Ordering::Relaxed) + 1;
        if count % 1024 == 1 {
            warn!(
                uncached = count,
                limit = MAX_INTERNED_HEADER_LINES,
                "Header intern table full; leaking one-off header lines"
            );
        }
        return Box::leak(line.into_boxed_str());
    }
    let leaked: &'static str = Box::leak(line.clone().into_boxed_str());
    *HEADER_LINES.entry(line).or_insert(leaked)
}

fn header_line(name: &HeaderName, value: &HeaderValue) -> &'static str {
    // values never contain CR or LF; obs-text bytes are replaced, not dropped
    let value = String::from_utf8_lossy(value.as_bytes());
    intern(format!("{name}: {value}"))
}

/// Header lines for the transport, at most [`MAX_RESPONSE_HEADERS`] of them.
///
/// `Content-Length` is skipped because the transport computes it. When there
/// are more headers than slots, the surplus is joined with CRLF into the last
/// slot so every header still reaches the client.
pub(crate) fn header_lines(headers: &HeaderMap) -> Vec<&'static str> {
    let mut lines: Vec<&'static str> = headers
        .iter()
        .filter(|(name, _)| **name != CONTENT_LENGTH)
        .map(|(name, value)| header_line(name, value))
        .collect();
    if lines.len() > MAX_RESPONSE_HEADERS {
        let packed = lines.split_off(MAX_RESPONSE_HEADERS - 1).join("\r\n");
        lines.push(intern(packed));
    }
    lines
}

/// Copy a dispatched response onto the transport's response.
pub fn write_response(res: &mut RawResponse, response: Response) {
    let (parts, body) = response.into_parts();
    res.status_code(usize::from(parts.status.as_u16()), status_reason(parts.status));
    for line in header_lines(&parts.headers) {
        res.header(line);
    }
    res.body_vec(body);
}

/// Fixed plain-text response written without going through the router.
pub fn write_plain(res: &mut RawResponse, status: StatusCode, body: &'static str) {
    res.status_code(usize::from(status.as_u16()), status_reason(status));
    res.header("Content-Type: text/plain; charset=utf-8");
    res.body(body);
}
