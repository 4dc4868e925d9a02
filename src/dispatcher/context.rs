use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

use http::header::{self, HeaderName, HeaderValue};
use http::{Method, StatusCode};
use parking_lot::RwLock;
use serde::Serialize;
use tracing::{error, warn};

use super::cancel::CancelToken;
use super::cookie::Cookie;
use super::core::{HandlerFunc, Outcome, Request};
use super::response::ResponseWriter;
use crate::ids::RequestId;
use crate::router::ParamVec;
use crate::server::{client_ip, parse_cookie_header};

/// Value stored in the per-request data map.
pub type DataValue = Arc<dyn Any + Send + Sync>;

/// Handle to a request's data map. Survives the request if cloned out.
pub type SharedData = Arc<RwLock<HashMap<String, DataValue>>>;

const CONTENT_TYPE_TEXT: &str = "text/plain; charset=utf-8";
const CONTENT_TYPE_JSON: &str = "application/json; charset=utf-8";
const CONTENT_TYPE_HTML: &str = "text/html; charset=utf-8";

/// Per-request state threaded through a handler chain.
///
/// A context owns the request, the response being built, the captured path
/// parameters and a string-keyed data map shared by the handlers. Contexts are
/// pooled by the router; nothing from one request is visible to the next.
pub struct Context {
    request: Request,
    writer: ResponseWriter,
    params: ParamVec,
    handlers: Option<Arc<[HandlerFunc]>>,
    index: isize,
    aborted: bool,
    panicked: bool,
    stopped_by_cancel: bool,
    data: SharedData,
    request_id: RequestId,
    cancel: Option<CancelToken>,
}

impl Context {
    pub(crate) fn new() -> Self {
        Self {
            request: Request::default(),
            writer: ResponseWriter::default(),
            params: ParamVec::new(),
            handlers: None,
            index: -1,
            aborted: false,
            panicked: false,
            stopped_by_cancel: false,
            data: SharedData::default(),
            request_id: RequestId::new(),
            cancel: None,
        }
    }

    pub(crate) fn prepare(
        &mut self,
        request: Request,
        handlers: Arc<[HandlerFunc]>,
        params: ParamVec,
    ) {
        self.request_id = RequestId::from_header_or_new(
            request
                .headers()
                .get("x-request-id")
                .and_then(|v| v.to_str().ok()),
        );
        self.cancel = request.extensions().get::<CancelToken>().cloned();
        self.request = request;
        self.handlers = Some(handlers);
        self.params = params;
        self.index = -1;
    }

    /// Drop everything belonging to the finished request.
    pub(crate) fn reset(&mut self) {
        self.request = Request::default();
        self.writer.reset();
        self.params.clear();
        self.handlers = None;
        self.index = -1;
        self.aborted = false;
        self.panicked = false;
        self.stopped_by_cancel = false;
        self.cancel = None;
        if Arc::strong_count(&self.data) > 1 {
            // a handler kept the map alive; the next request gets its own
            self.data = SharedData::default();
        } else {
            self.data.write().clear();
        }
    }

    // ---- chain control ----

    /// Run the remaining handlers in order.
    ///
    /// Stops early when the chain is aborted or the request is cancelled.
    /// A handler that calls `next` resumes after the rest of the chain has
    /// run, which is how middleware wraps downstream work.
    pub fn next(&mut self) {
        if self.aborted {
            return;
        }
        self.index += 1;
        while let Some(handler) = self.handler_at(self.index) {
            if self.aborted {
                return;
            }
            if self.is_cancelled() {
                self.stopped_by_cancel = true;
                return;
            }
            handler.call(self);
            self.index += 1;
        }
    }

    fn handler_at(&self, index: isize) -> Option<HandlerFunc> {
        let index = usize::try_from(index).ok()?;
        self.handlers.as_ref()?.get(index).cloned()
    }

    /// Stop the chain. Handlers already on the stack still finish.
    pub fn abort(&mut self) {
        self.aborted = true;
    }

    /// Abort after committing `status`.
    pub fn abort_with_status(&mut self, status: StatusCode) {
        self.writer.write_header(status);
        self.abort();
    }

    #[must_use]
    pub fn is_aborted(&self) -> bool {
        self.aborted
    }

    /// Whether the client side of this request has gone away.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(CancelToken::is_cancelled)
    }

    pub(crate) fn mark_panicked(&mut self) {
        self.panicked = true;
    }

    pub(crate) fn outcome(&self) -> Outcome {
        if self.panicked {
            Outcome::Panicked
        } else if self.aborted {
            Outcome::Aborted
        } else if self.stopped_by_cancel {
            Outcome::Cancelled
        } else {
            Outcome::Completed
        }
    }

    pub(crate) fn take_response(&mut self) -> http::Response<Vec<u8>> {
        self.writer.take()
    }

    // ---- request ----

    #[must_use]
    pub fn request(&self) -> &Request {
        &self.request
    }

    pub fn request_mut(&mut self) -> &mut Request {
        &mut self.request
    }

    #[must_use]
    pub fn request_id(&self) -> RequestId {
        self.request_id
    }

    #[must_use]
    pub fn method(&self) -> &Method {
        self.request.method()
    }

    /// Request path without the query string.
    #[must_use]
    pub fn path(&self) -> &str {
        self.request.uri().path()
    }

    #[must_use]
    pub fn body(&self) -> &[u8] {
        self.request.body()
    }

    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.request.headers().get(name).and_then(|v| v.to_str().ok())
    }

    /// `Host` header, falling back to the authority of an absolute URI.
    #[must_use]
    pub fn host(&self) -> Option<&str> {
        self.header(header::HOST.as_str())
            .or_else(|| self.request.uri().host())
    }

    /// `https` or `http`, honouring `X-Forwarded-Proto`.
    #[must_use]
    pub fn scheme(&self) -> &str {
        self.request
            .uri()
            .scheme_str()
            .or_else(|| self.header("x-forwarded-proto"))
            .unwrap_or("http")
    }

    /// Reconstructed absolute URL of the request.
    #[must_use]
    pub fn url(&self) -> String {
        let path_and_query = self
            .request
            .uri()
            .path_and_query()
            .map_or("/", |pq| pq.as_str());
        format!(
            "{}://{}{}",
            self.scheme(),
            self.host().unwrap_or_default(),
            path_and_query
        )
    }

    /// Best-effort client address. See [`client_ip`](crate::server::client_ip).
    #[must_use]
    pub fn client_ip(&self) -> String {
        client_ip(&self.request)
    }

    /// Value of the named path parameter. When a name repeats, the deepest
    /// capture wins.
    #[must_use]
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .rfind(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }

    /// All captured path parameters, in path order.
    #[must_use]
    pub fn params(&self) -> &ParamVec {
        &self.params
    }

    /// First value of a query-string key.
    #[must_use]
    pub fn query(&self, key: &str) -> Option<String> {
        let query = self.request.uri().query()?;
        url::form_urlencoded::parse(query.as_bytes())
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.into_owned())
    }

    /// Every decoded query pair, in order.
    #[must_use]
    pub fn query_all(&self) -> Vec<(String, String)> {
        self.request
            .uri()
            .query()
            .map(|q| {
                url::form_urlencoded::parse(q.as_bytes())
                    .into_owned()
                    .collect()
            })
            .unwrap_or_default()
    }

    #[must_use]
    pub fn cookie(&self, name: &str) -> Option<String> {
        self.request
            .headers()
            .get_all(header::COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .flat_map(parse_cookie_header)
            .find(|(k, _)| k == name)
            .map(|(_, v)| v)
    }

    // ---- shared data ----

    pub fn set<T: Any + Send + Sync>(&self, key: impl Into<String>, value: T) {
        self.data.write().insert(key.into(), Arc::new(value));
    }

    /// Typed lookup. `None` when the key is missing or holds another type.
    #[must_use]
    pub fn get<T: Any + Send + Sync>(&self, key: &str) -> Option<Arc<T>> {
        let value = self.data.read().get(key).cloned()?;
        value.downcast::<T>().ok()
    }

    /// Lookup for values stored as `String` or `&'static str`.
    #[must_use]
    pub fn get_string(&self, key: &str) -> Option<String> {
        let value = self.data.read().get(key).cloned()?;
        if let Some(s) = value.downcast_ref::<String>() {
            return Some(s.clone());
        }
        value.downcast_ref::<&'static str>().map(|s| (*s).to_string())
    }

    pub fn delete(&self, key: &str) {
        self.data.write().remove(key);
    }

    /// Clone out the data map handle, e.g. for work that outlives the handler.
    #[must_use]
    pub fn shared_data(&self) -> SharedData {
        Arc::clone(&self.data)
    }

    // ---- response ----

    #[must_use]
    pub fn writer(&self) -> &ResponseWriter {
        &self.writer
    }

    pub fn writer_mut(&mut self) -> &mut ResponseWriter {
        &mut self.writer
    }

    /// Commit the response status.
    pub fn status(&mut self, status: StatusCode) {
        self.writer.write_header(status);
    }

    /// Set a response header, replacing earlier values. Invalid names or
    /// values are logged and dropped.
    pub fn set_header(&mut self, name: &str, value: &str) {
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            (Ok(name), Ok(value)) => {
                self.writer.headers_mut().insert(name, value);
            }
            _ => warn!(header = %name, "Dropping invalid response header"),
        }
    }

    pub fn set_cookie(&mut self, cookie: &Cookie) {
        match HeaderValue::from_str(&cookie.to_string()) {
            Ok(value) => {
                self.writer.headers_mut().append(header::SET_COOKIE, value);
            }
            Err(_) => warn!(cookie = %cookie.name, "Dropping invalid cookie"),
        }
    }

    /// Ask the client to forget `name`.
    pub fn delete_cookie(&mut self, name: &str) {
        self.set_cookie(&Cookie::removal(name));
    }

    /// Plain-text response.
    pub fn string(&mut self, status: StatusCode, body: impl AsRef<str>) {
        self.respond(status, CONTENT_TYPE_TEXT, body.as_ref().as_bytes());
    }

    /// HTML response.
    pub fn html(&mut self, status: StatusCode, body: impl AsRef<str>) {
        self.respond(status, CONTENT_TYPE_HTML, body.as_ref().as_bytes());
    }

    /// JSON response. A value that fails to serialize produces a 500 with a
    /// fixed error body instead.
    pub fn json<T: Serialize + ?Sized>(&mut self, status: StatusCode, value: &T) {
        match serde_json::to_vec(value) {
            Ok(body) => self.respond(status, CONTENT_TYPE_JSON, &body),
            Err(err) => {
                error!(error = %err, path = %self.path(), "JSON serialization failed");
                self.respond(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    CONTENT_TYPE_JSON,
                    br#"{"error":"json marshal failed"}"#,
                );
            }
        }
    }

    fn respond(&mut self, status: StatusCode, content_type: &'static str, body: &[u8]) {
        self.writer
            .headers_mut()
            .insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
        self.writer.write_header(status);
        self.writer.write_bytes(body);
    }
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("method", self.method())
            .field("path", &self.path())
            .field("params", &self.params)
            .field("index", &self.index)
            .field("aborted", &self.aborted)
            .field("request_id", &self.request_id)
            .finish_non_exhaustive()
    }
}
