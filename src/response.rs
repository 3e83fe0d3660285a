//! The response-writer capability, its buffered implementation, and the
//! `respond` helpers handlers use to fill it.
//!
//! Handlers do not return a response value. They write into a [`Writer`]:
//! set headers, set the status once, append body bytes. This is what lets a
//! middleware slip a decorator (see [`ResponseRecorder`](crate::ResponseRecorder))
//! between the server and the handler and watch what gets written.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use bytes::{Bytes, BytesMut};
use http::header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use http::StatusCode;
use http_body_util::Full;
use serde::Serialize;
use tracing::warn;

use crate::error::Error;

/// Shared handle to the writer of one in-flight response.
pub type Writer = Arc<dyn ResponseWriter>;

// ── ResponseWriter ────────────────────────────────────────────────────────────

/// Write side of one HTTP response.
///
/// All methods take `&self`: a writer is a handle shared between the server,
/// each middleware and the route, so implementations keep their state behind
/// interior mutability.
pub trait ResponseWriter: Send + Sync {
    /// Runs `f` against the headers that will be sent.
    fn with_headers(&self, f: &mut dyn FnMut(&mut HeaderMap));

    /// Sets the response status. Only the first call takes effect on the wire.
    fn write_status(&self, status: StatusCode);

    /// Appends body bytes. Implies `200 OK` if no status was set yet.
    fn write(&self, buf: &[u8]) -> Result<usize, Error>;

    fn set_header(&self, name: HeaderName, value: HeaderValue) {
        self.with_headers(&mut |headers: &mut HeaderMap| {
            headers.insert(name.clone(), value.clone());
        });
    }

    fn header(&self, name: &HeaderName) -> Option<HeaderValue> {
        let mut found = None;
        self.with_headers(&mut |headers: &mut HeaderMap| found = headers.get(name).cloned());
        found
    }
}

// ── Response ──────────────────────────────────────────────────────────────────

/// Buffered [`ResponseWriter`].
///
/// The server hands one of these to every request and converts whatever was
/// written into an `http::Response` once the handler chain returns. It also
/// works as a test recorder:
///
/// ```rust
/// use std::sync::Arc;
/// use http::StatusCode;
/// use routekit::{Response, respond};
///
/// let w = Arc::new(Response::new());
/// respond(&*w, StatusCode::CREATED, b"done").unwrap();
///
/// assert_eq!(w.status(), StatusCode::CREATED);
/// assert_eq!(&w.body()[..], b"done");
/// ```
#[derive(Default)]
pub struct Response {
    parts: Mutex<Parts>,
}

#[derive(Default)]
struct Parts {
    status: Option<StatusCode>,
    headers: HeaderMap,
    body: BytesMut,
}

impl Response {
    pub fn new() -> Self {
        Self::default()
    }

    /// Status sent so far, `200 OK` if none was set.
    pub fn status(&self) -> StatusCode {
        self.lock().status.unwrap_or(StatusCode::OK)
    }

    pub fn headers(&self) -> HeaderMap {
        self.lock().headers.clone()
    }

    pub fn body(&self) -> Bytes {
        Bytes::copy_from_slice(&self.lock().body)
    }

    /// Drains the buffer into a response hyper can send. Leaves this writer
    /// empty; anything written afterwards is lost.
    pub(crate) fn take(&self) -> http::Response<Full<Bytes>> {
        let parts = std::mem::take(&mut *self.lock());
        let mut res = http::Response::new(Full::new(parts.body.freeze()));
        *res.status_mut() = parts.status.unwrap_or(StatusCode::OK);
        *res.headers_mut() = parts.headers;
        res
    }

    // A panic never happens while the lock is held, but a poisoned buffer is
    // still the best data we have.
    fn lock(&self) -> MutexGuard<'_, Parts> {
        self.parts.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl ResponseWriter for Response {
    fn with_headers(&self, f: &mut dyn FnMut(&mut HeaderMap)) {
        f(&mut self.lock().headers);
    }

    fn write_status(&self, status: StatusCode) {
        let mut parts = self.lock();
        match parts.status {
            Some(sent) => warn!(%sent, ignored = %status, "superfluous write_status call"),
            None => parts.status = Some(status),
        }
    }

    fn write(&self, buf: &[u8]) -> Result<usize, Error> {
        let mut parts = self.lock();
        parts.status.get_or_insert(StatusCode::OK);
        parts.body.extend_from_slice(buf);
        Ok(buf.len())
    }
}

// ── Helpers ───────────────────────────────────────────────────────────────────

/// Writes `status` followed by `payload`.
pub fn respond(w: &dyn ResponseWriter, status: StatusCode, payload: &[u8]) -> Result<(), Error> {
    w.write_status(status);
    if !payload.is_empty() {
        w.write(payload)?;
    }
    Ok(())
}

/// Serializes `payload` as compact JSON and writes it with
/// `Content-Type: application/json`.
///
/// Nothing is written if serialization fails; the error is returned so a
/// route can propagate it with `?` and let the render policy answer instead.
pub fn respond_json<T>(w: &dyn ResponseWriter, status: StatusCode, payload: &T) -> Result<(), Error>
where
    T: Serialize + ?Sized,
{
    let body = serde_json::to_vec(payload)?;
    w.set_header(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    respond(w, status, &body)
}
