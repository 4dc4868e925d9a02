use std::io::{self, Read};
use std::net::{IpAddr, SocketAddr};

use http::header::HeaderMap;
use http::Version;
use may_minihttp::Request as RawRequest;
use tracing::debug;

use crate::dispatcher::{CancelToken, Request};

/// Peer address of the connection a request arrived on, when known.
///
/// Stored in the request's extensions and used as the last fallback of
/// [`client_ip`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemoteAddr(pub SocketAddr);

/// Convert a raw `may_minihttp` request into an owned `http::Request`.
///
/// Headers are copied before the body is read since reading consumes the raw
/// request. A fresh [`CancelToken`] is attached to every request.
///
/// # Errors
///
/// Returns `InvalidData` when the method, target or a header is not valid
/// HTTP, and propagates I/O errors from reading the body.
pub fn into_http_request(req: RawRequest) -> io::Result<Request> {
    let mut builder = http::Request::builder()
        .method(req.method())
        .uri(req.path())
        .version(if req.version() == 0 {
            Version::HTTP_10
        } else {
            Version::HTTP_11
        });
    for h in req.headers() {
        builder = builder.header(h.name, h.value);
    }

    let mut body = Vec::new();
    req.body().read_to_end(&mut body)?;

    let mut request = builder
        .body(body)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    request.extensions_mut().insert(CancelToken::new());

    debug!(
        method = %request.method(),
        path = %request.uri().path(),
        header_count = request.headers().len(),
        body_size_bytes = request.body().len(),
        "HTTP request parsed"
    );
    Ok(request)
}

/// Split one `Cookie` header value into name/value pairs.
pub fn parse_cookie_header(value: &str) -> Vec<(String, String)> {
    value
        .split(';')
        .filter_map(|pair| {
            let mut parts = pair.trim().splitn(2, '=');
            let name = parts.next()?.trim();
            if name.is_empty() {
                return None;
            }
            let value = parts.next().unwrap_or("").trim().trim_matches('"');
            Some((name.to_string(), value.to_string()))
        })
        .collect()
}

fn valid_ip(raw: &str) -> Option<IpAddr> {
    raw.trim().parse().ok()
}

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
}

/// Best-effort address of the client that sent `request`.
///
/// Checked in order: the first entry of `X-Forwarded-For`, `X-Real-IP`, then
/// the [`RemoteAddr`] extension. Header values that are not IP addresses are
/// skipped. Returns `"unknown"` when nothing usable is found.
pub fn client_ip(request: &Request) -> String {
    let headers = request.headers();
    if let Some(ip) = header(headers, "x-forwarded-for")
        .and_then(|v| v.split(',').next())
        .and_then(valid_ip)
    {
        return ip.to_string();
    }
    if let Some(ip) = header(headers, "x-real-ip").and_then(valid_ip) {
        return ip.to_string();
    }
    request
        .extensions()
        .get::<RemoteAddr>()
        .map_or_else(|| "unknown".to_string(), |addr| addr.0.ip().to_string())
}
