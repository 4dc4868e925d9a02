use std::io;
use std::sync::Arc;

use http::StatusCode;
use may_minihttp::{HttpService, Request as RawRequest, Response as RawResponse};
use tracing::warn;

use super::request::into_http_request;
use super::response::{write_plain, write_response};
use crate::router::Router;

/// `may_minihttp` service that hands every request to a shared [`Router`].
///
/// One clone of the service lives in each connection coroutine; all clones
/// share the same routing table.
#[derive(Clone)]
pub struct AppService {
    router: Arc<Router>,
}

impl AppService {
    #[must_use]
    pub fn new(router: Arc<Router>) -> Self {
        Self { router }
    }

    #[must_use]
    pub fn router(&self) -> &Router {
        &self.router
    }
}

impl HttpService for AppService {
    /// Convert, dispatch and write back one request.
    ///
    /// The [`CancelToken`](crate::dispatcher::CancelToken) attached to each
    /// request is never fired from here: `may_minihttp` reports no client
    /// disconnects, so `Context::is_cancelled` only turns true when
    /// application code cancels a token it inserted or cloned itself.
    fn call(&mut self, req: RawRequest, res: &mut RawResponse) -> io::Result<()> {
        let request = match into_http_request(req) {
            Ok(request) => request,
            Err(err) if err.kind() == io::ErrorKind::InvalidData => {
                warn!(error = %err, "Rejecting malformed request");
                write_plain(res, StatusCode::BAD_REQUEST, "Bad Request\n");
                return Ok(());
            }
            Err(err) => return Err(err),
        };

        let response = self.router.dispatch(request);
        write_response(res, response);
        Ok(())
    }
}
