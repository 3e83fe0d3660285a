//! Access log.

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU16, Ordering};
use std::time::{Duration, Instant};

use http::{Method, Version};
use tracing::info;

use crate::handler::{BoxedHandler, handler_fn};
use crate::recorder::ResponseRecorder;
use crate::request::Request;
use crate::response::Writer;

/// Emits one `info` record per request on the `routekit::access` target:
///
/// ```text
/// GET http://localhost:3000/items/42 HTTP/1.1 from=127.0.0.1:51234 status=200 took=112.4µs
/// ```
///
/// The record is written when the request finishes, and also when the
/// handler chain unwinds or the request future is dropped.
///
/// `status` is the last status passed to `write_status` downstream. The
/// writer sends the first one, so a handler that sets `200`, writes, and then
/// panics under `recover` goes out as `200` but is logged as `500`. If nothing
/// set a status, the transport sent an implicit `200`; that is what gets
/// logged, with `implicit_status=true`.
///
/// `completed=false` marks a record written while the chain was unwinding
/// with nothing below to recover it. No response was sent for such a
/// request, and the raw recorded status is logged (`0` if none was set).
pub fn logger(next: BoxedHandler) -> BoxedHandler {
    handler_fn(move |w: Writer, req: Request| {
        let next = Arc::clone(&next);
        async move {
            let recorder = ResponseRecorder::new(w);
            let _entry = AccessEntry::new(&req, recorder.status_cell());
            next.call(Arc::new(recorder), req).await;
        }
    })
}

/// Everything the log line needs, captured before the request is handed
/// downstream. Logs on drop.
struct AccessEntry {
    start: Instant,
    method: Method,
    scheme: &'static str,
    host: String,
    uri: String,
    version: Version,
    remote_addr: Option<SocketAddr>,
    status: Arc<AtomicU16>,
}

impl AccessEntry {
    fn new(req: &Request, status: Arc<AtomicU16>) -> Self {
        Self {
            start: Instant::now(),
            method: req.method().clone(),
            scheme: if req.is_tls() { "https" } else { "http" },
            host: req.host().to_owned(),
            uri: req.request_uri().to_owned(),
            version: req.version(),
            remote_addr: req.remote_addr(),
            status,
        }
    }
}

impl Drop for AccessEntry {
    fn drop(&mut self) {
        let captured = self.status.load(Ordering::Acquire);
        let completed = !std::thread::panicking();
        let took: Duration = self.start.elapsed();
        let from = self.remote_addr.map_or_else(|| "-".to_owned(), |a| a.to_string());

        info!(
            target: "routekit::access",
            from = %from,
            status = if captured == 0 && completed { 200 } else { captured },
            implicit_status = captured == 0 && completed,
            completed,
            took = ?took,
            "{} {}://{}{} {:?}",
            self.method, self.scheme, self.host, self.uri, self.version,
        );
    }
}
