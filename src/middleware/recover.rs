//! Panic recovery.

use std::any::Any;
use std::backtrace::Backtrace;
use std::cell::RefCell;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Once};

use futures::FutureExt;
use http::header::{CONNECTION, HeaderValue};
use tracing::error;

use crate::error::BoxError;
use crate::handler::{BoxedHandler, handler_fn};
use crate::request::Request;
use crate::response::Writer;

/// Catches panics raised anywhere downstream and answers `500` instead.
///
/// On a panic the response gets `Connection: close`, the panic message and
/// the backtrace of the panic site are logged at `error`, and the request's
/// error policy renders a generic "recovering from panic" error. The panic
/// never propagates further. When several `recover`s are stacked, only the
/// innermost one fires.
pub fn recover(next: BoxedHandler) -> BoxedHandler {
    install_backtrace_hook();

    handler_fn(move |w: Writer, req: Request| {
        let next = Arc::clone(&next);
        async move {
            let head = req.clone();
            let downstream = Arc::clone(&w);
            // The call happens inside the async block so a panic while
            // building the future is caught as well.
            let outcome = AssertUnwindSafe(async move { next.call(downstream, req).await })
                .catch_unwind()
                .await;

            let Err(payload) = outcome else { return };

            w.set_header(CONNECTION, HeaderValue::from_static("close"));
            let trace = take_backtrace().unwrap_or_else(Backtrace::force_capture);
            error!(panic = %panic_message(&*payload), trace = %trace, "recovering from panic");

            let err: BoxError = "recovering from panic".into();
            if let Err(render_err) = head.error_handler().render(&*w, &head, &err) {
                error!(error = %render_err, "failed to render error response");
            }
        }
    })
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload.downcast_ref::<&str>().copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}

// ── Panic-site backtraces ─────────────────────────────────────────────────────
//
// By the time catch_unwind returns, the stack that panicked is gone. A panic
// hook runs on that stack, so it captures the trace into a thread-local that
// the recovering task reads back: unwinding happens within one poll, on the
// thread that polled the future.

thread_local! {
    static LAST_PANIC: RefCell<Option<Backtrace>> = const { RefCell::new(None) };
}

fn install_backtrace_hook() {
    static INSTALL: Once = Once::new();
    INSTALL.call_once(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            // A panic raised while thread-locals are being torn down finds the
            // slot gone; the trace is skipped rather than panicking in the hook.
            let _ = LAST_PANIC.try_with(|slot| *slot.borrow_mut() = Some(Backtrace::force_capture()));
            previous(info);
        }));
    });
}

fn take_backtrace() -> Option<Backtrace> {
    LAST_PANIC.try_with(|slot| slot.borrow_mut().take()).ok().flatten()
}
