//! Handlers, routes, middleware and how they are chained.
//!
//! # Two kinds of handler
//!
//! A [`Handler`] is the platform-level capability: it receives the response
//! writer and the request and produces nothing but side effects on the
//! writer. Middleware and the router speak this trait.
//!
//! A [`Route`] is what application code writes: the same inputs, but it may
//! fail. The route adapter turns a route into a handler by calling the
//! request's error policy whenever the route returns `Err`.
//!
//! ```text
//! async fn get_item(w: Writer, req: Request) -> Result<(), E>  ← user writes this
//!        ↓ router.get("/items/{id}", get_item)
//! get_item.into_handler()                                      ← Route blanket impl
//!        ↓
//! Arc::new(RouteHandler(get_item))                             ← stored as BoxedHandler
//!        ↓ middleware[0](middleware[1](...(handler)))          ← compose
//! handler.call(w, req)  at request time
//! ```

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tracing::error;

use crate::error::BoxError;
use crate::request::Request;
use crate::response::Writer;

// ── Types ─────────────────────────────────────────────────────────────────────

/// A heap-allocated, type-erased future driving one request to completion.
pub type BoxFuture = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// A type-erased handler shared across concurrent requests.
pub type BoxedHandler = Arc<dyn Handler>;

/// A decorator turning one handler into another.
///
/// Any `Fn(BoxedHandler) -> BoxedHandler` converts into this through
/// [`middleware_fn`]. Plain functions such as
/// [`middleware::logger`](crate::middleware::logger) can be passed to the
/// router directly.
pub type Middleware = Arc<dyn Fn(BoxedHandler) -> BoxedHandler + Send + Sync + 'static>;

// ── Handler ───────────────────────────────────────────────────────────────────

/// Serves one request by writing into `w`.
pub trait Handler: Send + Sync + 'static {
    fn call(&self, w: Writer, req: Request) -> BoxFuture;
}

/// Builds a [`BoxedHandler`] from an async closure. This is the usual way to
/// write middleware:
///
/// ```rust
/// use std::sync::Arc;
/// use http::header::{HeaderName, HeaderValue};
/// use routekit::{BoxedHandler, Request, Writer, handler_fn};
///
/// fn powered_by(next: BoxedHandler) -> BoxedHandler {
///     handler_fn(move |w: Writer, req: Request| {
///         let next = Arc::clone(&next);
///         async move {
///             w.set_header(HeaderName::from_static("x-powered-by"), HeaderValue::from_static("routekit"));
///             next.call(w, req).await;
///         }
///     })
/// }
/// ```
pub fn handler_fn<F, Fut>(f: F) -> BoxedHandler
where
    F: Fn(Writer, Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    Arc::new(FnHandler(f))
}

struct FnHandler<F>(F);

impl<F, Fut> Handler for FnHandler<F>
where
    F: Fn(Writer, Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    fn call(&self, w: Writer, req: Request) -> BoxFuture {
        Box::pin((self.0)(w, req))
    }
}

// ── Route ─────────────────────────────────────────────────────────────────────

/// Implemented for every valid route.
///
/// Satisfied automatically by any async function of the shape
///
/// ```text
/// async fn name(w: Writer, req: Request) -> Result<(), E>   where E: Into<BoxError>
/// ```
///
/// Sealed: only the blanket impl below can satisfy it.
pub trait Route: private::Sealed + Send + Sync + 'static {
    #[doc(hidden)]
    fn into_handler(self) -> BoxedHandler;
}

mod private {
    pub trait Sealed {}
}

impl<F, Fut, E> private::Sealed for F
where
    F: Fn(Writer, Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), E>> + Send + 'static,
    E: Into<BoxError> + 'static,
{
}

impl<F, Fut, E> Route for F
where
    F: Fn(Writer, Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), E>> + Send + 'static,
    E: Into<BoxError> + 'static,
{
    fn into_handler(self) -> BoxedHandler {
        Arc::new(RouteHandler(self))
    }
}

/// The route adapter. On `Err` the request's error policy renders the error,
/// exactly once; on `Ok` the route has already written its response.
struct RouteHandler<F>(F);

impl<F, Fut, E> Handler for RouteHandler<F>
where
    F: Fn(Writer, Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), E>> + Send + 'static,
    E: Into<BoxError> + 'static,
{
    fn call(&self, w: Writer, req: Request) -> BoxFuture {
        // The route consumes the request; the policy still gets to see it.
        let head = req.clone();
        let fut = (self.0)(Arc::clone(&w), req);
        Box::pin(async move {
            if let Err(e) = fut.await {
                if let Err(render_err) = head.error_handler().render(&*w, &head, &e.into()) {
                    error!(error = %render_err, "failed to render error response");
                }
            }
        })
    }
}

// ── Middleware ────────────────────────────────────────────────────────────────

/// Boxes a decorator function as [`Middleware`].
pub fn middleware_fn<M>(m: M) -> Middleware
where
    M: Fn(BoxedHandler) -> BoxedHandler + Send + Sync + 'static,
{
    Arc::new(m)
}

/// Wraps `terminal` in `chain` so that `chain[0]` is outermost:
/// `chain[0](chain[1](..chain[n-1](terminal)))`.
///
/// The first middleware sees the request first and the finished response
/// last.
pub fn compose(chain: &[Middleware], terminal: BoxedHandler) -> BoxedHandler {
    chain.iter().rev().fold(terminal, |next, m| m(next))
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use http::StatusCode;

    use super::*;
    use crate::error::HttpError;
    use crate::response::{Response, respond};

    fn request() -> Request {
        Request::from(http::Request::new(bytes::Bytes::new()))
    }

    fn tracer(log: &Arc<Mutex<Vec<String>>>, name: &'static str) -> Middleware {
        let log = Arc::clone(log);
        middleware_fn(move |next: BoxedHandler| {
            let log = Arc::clone(&log);
            handler_fn(move |w, req| {
                let next = Arc::clone(&next);
                let log = Arc::clone(&log);
                async move {
                    log.lock().unwrap().push(format!("{name} in"));
                    next.call(w, req).await;
                    log.lock().unwrap().push(format!("{name} out"));
                }
            })
        })
    }

    #[tokio::test]
    async fn first_middleware_is_outermost() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let inner = Arc::clone(&log);
        let terminal = handler_fn(move |_, _| {
            let inner = Arc::clone(&inner);
            async move { inner.lock().unwrap().push("handler".to_owned()) }
        });

        let chain = [tracer(&log, "a"), tracer(&log, "b")];
        compose(&chain, terminal).call(Arc::new(Response::new()), request()).await;

        assert_eq!(*log.lock().unwrap(), ["a in", "b in", "handler", "b out", "a out"]);
    }

    #[tokio::test]
    async fn empty_chain_is_the_terminal() {
        let w = Arc::new(Response::new());
        let terminal = handler_fn(|w: Writer, _| async move {
            w.write_status(StatusCode::NO_CONTENT);
        });
        compose(&[], terminal).call(w.clone(), request()).await;
        assert_eq!(w.status(), StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn route_success_writes_nothing_extra() {
        async fn ok(w: Writer, _: Request) -> Result<(), HttpError> {
            respond(&*w, StatusCode::ACCEPTED, b"queued").map_err(|e| HttpError::new(StatusCode::INTERNAL_SERVER_ERROR, e))
        }

        let w = Arc::new(Response::new());
        ok.into_handler().call(w.clone(), request()).await;

        assert_eq!(w.status(), StatusCode::ACCEPTED);
        assert_eq!(&w.body()[..], b"queued");
    }

    #[tokio::test]
    async fn route_error_is_rendered_once() {
        async fn fail(_: Writer, _: Request) -> Result<(), BoxError> {
            Err("boom".into())
        }

        let w = Arc::new(Response::new());
        fail.into_handler().call(w.clone(), request()).await;

        assert_eq!(w.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(&w.body()[..], br#"{"error":"internal server error"}"#);
    }
}
