//! Status-observing writer decorator.

use std::sync::Arc;
use std::sync::atomic::{AtomicU16, Ordering};

use http::StatusCode;
use http::header::HeaderMap;

use crate::error::Error;
use crate::response::{ResponseWriter, Writer};

/// Wraps a [`Writer`] and remembers the last status written through it.
///
/// Every `write_status` call is recorded and forwarded, so what the client
/// receives is unchanged. Headers and body bytes pass straight through.
/// The captured status stays `0` until `write_status` is called; a handler
/// that only writes a body leaves it at `0` even though the transport sends
/// an implicit `200`.
pub struct ResponseRecorder {
    inner: Writer,
    status: Arc<AtomicU16>,
}

impl ResponseRecorder {
    pub fn new(inner: Writer) -> Self {
        Self { inner, status: Arc::new(AtomicU16::new(0)) }
    }

    /// The last status written, or `0` if none was.
    pub fn status(&self) -> u16 {
        self.status.load(Ordering::Acquire)
    }

    /// A handle to the status cell that outlives the recorder, for readers
    /// that must look at it after the writer has been given away.
    pub fn status_cell(&self) -> Arc<AtomicU16> {
        Arc::clone(&self.status)
    }
}

impl ResponseWriter for ResponseRecorder {
    fn with_headers(&self, f: &mut dyn FnMut(&mut HeaderMap)) {
        self.inner.with_headers(f);
    }

    fn write_status(&self, status: StatusCode) {
        self.status.store(status.as_u16(), Ordering::Release);
        self.inner.write_status(status);
    }

    fn write(&self, buf: &[u8]) -> Result<usize, Error> {
        self.inner.write(buf)
    }
}

#[cfg(test)]
mod tests {
    use http::header::{HeaderName, HeaderValue};

    use super::*;
    use crate::response::Response;

    #[test]
    fn records_and_forwards_status() {
        let inner = Arc::new(Response::new());
        let rec = ResponseRecorder::new(inner.clone());

        rec.write_status(StatusCode::CREATED);

        assert_eq!(rec.status(), 201);
        assert_eq!(inner.status(), StatusCode::CREATED);
    }

    #[test]
    fn body_only_leaves_sentinel() {
        let inner = Arc::new(Response::new());
        let rec = ResponseRecorder::new(inner.clone());

        assert_eq!(rec.write(b"test").unwrap(), 4);

        assert_eq!(rec.status(), 0);
        assert_eq!(&inner.body()[..], b"test");
    }

    #[test]
    fn headers_pass_through() {
        let inner = Arc::new(Response::new());
        let rec = ResponseRecorder::new(inner.clone());
        let name = HeaderName::from_static("x-test");

        rec.set_header(name.clone(), HeaderValue::from_static("test"));

        assert_eq!(inner.header(&name).unwrap(), "test");
        assert_eq!(rec.header(&name).unwrap(), "test");
    }

    #[test]
    fn cell_sees_later_writes() {
        let rec = ResponseRecorder::new(Arc::new(Response::new()));
        let cell = rec.status_cell();

        rec.write_status(StatusCode::INTERNAL_SERVER_ERROR);

        assert_eq!(cell.load(Ordering::Acquire), 500);
    }
}
