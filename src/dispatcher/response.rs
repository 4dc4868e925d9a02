use std::io;

use http::{HeaderMap, StatusCode};
use tracing::debug;

use super::Response;

/// Buffered response sink owned by a [`Context`](super::Context).
///
/// The status is committed by the first [`write_header`](Self::write_header)
/// or [`write`](Self::write) call; later status changes are ignored. Headers
/// stay mutable until the response leaves the dispatcher.
#[derive(Debug, Default)]
pub struct ResponseWriter {
    status: Option<StatusCode>,
    headers: HeaderMap,
    body: Vec<u8>,
}

impl ResponseWriter {
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// Commit the status code. Only the first call has an effect.
    pub fn write_header(&mut self, status: StatusCode) {
        match self.status {
            Some(current) => debug!(
                current = current.as_u16(),
                ignored = status.as_u16(),
                "Superfluous write_header call"
            ),
            None => self.status = Some(status),
        }
    }

    /// Append to the body, committing `200 OK` if no status was written yet.
    pub fn write_bytes(&mut self, bytes: &[u8]) -> usize {
        if self.status.is_none() {
            self.status = Some(StatusCode::OK);
        }
        self.body.extend_from_slice(bytes);
        bytes.len()
    }

    /// Whether a status has been committed.
    #[must_use]
    pub fn written(&self) -> bool {
        self.status.is_some()
    }

    /// The committed status, `200 OK` if none was written.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.status.unwrap_or(StatusCode::OK)
    }

    #[must_use]
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub(crate) fn take(&mut self) -> Response {
        let mut response = Response::new(std::mem::take(&mut self.body));
        *response.status_mut() = self.status();
        *response.headers_mut() = std::mem::take(&mut self.headers);
        self.status = None;
        response
    }

    pub(crate) fn reset(&mut self) {
        self.status = None;
        self.headers.clear();
        self.body.clear();
    }
}

impl io::Write for ResponseWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        Ok(self.write_bytes(buf))
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_first_status_wins() {
        let mut w = ResponseWriter::default();
        assert!(!w.written());
        w.write_header(StatusCode::CREATED);
        w.write_header(StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(w.status(), StatusCode::CREATED);
    }

    #[test]
    fn test_write_implies_ok() {
        let mut w = ResponseWriter::default();
        write!(w, "hello {}", 42).unwrap();
        w.write_header(StatusCode::NOT_FOUND);
        let resp = w.take();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.body(), b"hello 42");
        assert!(!w.written());
    }

    #[test]
    fn test_reset_clears_everything() {
        let mut w = ResponseWriter::default();
        w.headers_mut()
            .insert(http::header::CONTENT_TYPE, "text/plain".parse().unwrap());
        w.write_bytes(b"body");
        w.reset();
        assert!(!w.written());
        assert!(w.headers().is_empty());
        assert!(w.body().is_empty());
    }
}
