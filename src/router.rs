//! Method + pattern routing with ordered middleware.
//!
//! One radix tree per HTTP method, O(path-length) lookup via [`matchit`].
//! Pattern syntax (`/items/{id}`, `/files/{*path}`) is matchit's.
//!
//! # Middleware order
//!
//! Middleware registered first wraps everything registered after it, and
//! router-wide middleware wraps per-route middleware:
//!
//! ```text
//! global[0]( global[1]( … mux → per_route[0]( per_route[1]( … route ))))
//! ```
//!
//! Register [`middleware::logger`](crate::middleware::logger) before
//! [`middleware::recover`](crate::middleware::recover) so the access log
//! sees the status of the rendered panic.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use http::header::{ALLOW, CONTENT_TYPE, HeaderValue, X_CONTENT_TYPE_OPTIONS};
use http::{Method, StatusCode};
use matchit::Router as MatchitRouter;
use tracing::error;

use crate::error::{BoxError, Error};
use crate::handler::{BoxFuture, BoxedHandler, Handler, Middleware, Route, compose};
use crate::policy::ErrorHandler;
use crate::request::Request;
use crate::response::{ResponseWriter, Writer, respond};

/// The application router.
///
/// Built once at startup through consuming builder calls, then handed to
/// [`Server::serve`](crate::Server::serve) or mounted as a [`Handler`].
/// Once it is shared, nothing can register into it any more, so dispatch
/// reads it without locks.
///
/// ```rust
/// use http::StatusCode;
/// use routekit::{HttpError, Request, Router, Writer, middleware, respond_json};
///
/// async fn get_item(w: Writer, req: Request) -> Result<(), HttpError> {
///     let id = req.param("id").unwrap_or_default();
///     if id == "0" {
///         return Err(HttpError::exposed(StatusCode::NOT_FOUND, "missing"));
///     }
///     respond_json(&*w, StatusCode::OK, &serde_json::json!({ "id": id }))
///         .map_err(|e| HttpError::new(StatusCode::INTERNAL_SERVER_ERROR, e))
/// }
///
/// let app = Router::new()
///     .middleware(middleware::logger)
///     .middleware(middleware::recover)
///     .get("/items/{id}", get_item);
/// ```
pub struct Router {
    mux: Mux,
    middleware: Vec<Middleware>,
    error_handler: ErrorHandler,
    composed: OnceLock<BoxedHandler>,
}

impl Router {
    pub fn new() -> Self {
        Self {
            mux: Mux::default(),
            middleware: Vec::new(),
            error_handler: ErrorHandler::default(),
            composed: OnceLock::new(),
        }
    }

    /// Appends router-wide middleware. It wraps every request, including
    /// the ones that end in 404 or 405.
    pub fn middleware<M>(mut self, m: M) -> Self
    where
        M: Fn(BoxedHandler) -> BoxedHandler + Send + Sync + 'static,
    {
        self.middleware.push(Arc::new(m));
        self.composed = OnceLock::new();
        self
    }

    /// Replaces the policy that renders route errors and recovered panics
    /// for requests dispatched by this router. The policy receives the
    /// failed request alongside the error.
    pub fn error_handler<F>(mut self, f: F) -> Self
    where
        F: Fn(&dyn ResponseWriter, &Request, &BoxError) -> Result<(), Error> + Send + Sync + 'static,
    {
        self.error_handler = ErrorHandler::new(f);
        self
    }

    /// Registers `route` for `method` + `pattern`.
    ///
    /// # Panics
    ///
    /// Panics if `pattern` is invalid or conflicts with one already
    /// registered for `method`.
    pub fn handle(self, method: Method, pattern: &str, route: impl Route) -> Self {
        self.handle_with(method, pattern, route, Vec::new())
    }

    /// Like [`handle`](Router::handle), with middleware applied to this
    /// route only. It runs inside all router-wide middleware.
    pub fn handle_with(
        mut self,
        method: Method,
        pattern: &str,
        route: impl Route,
        middleware: impl IntoIterator<Item = Middleware>,
    ) -> Self {
        let chain: Vec<Middleware> = middleware.into_iter().collect();
        self.mux.insert(method, pattern, compose(&chain, route.into_handler()));
        self.composed = OnceLock::new();
        self
    }

    pub fn get(self, pattern: &str, route: impl Route) -> Self {
        self.handle(Method::GET, pattern, route)
    }

    pub fn post(self, pattern: &str, route: impl Route) -> Self {
        self.handle(Method::POST, pattern, route)
    }

    pub fn put(self, pattern: &str, route: impl Route) -> Self {
        self.handle(Method::PUT, pattern, route)
    }

    pub fn patch(self, pattern: &str, route: impl Route) -> Self {
        self.handle(Method::PATCH, pattern, route)
    }

    pub fn delete(self, pattern: &str, route: impl Route) -> Self {
        self.handle(Method::DELETE, pattern, route)
    }

    pub fn get_with(self, pattern: &str, route: impl Route, middleware: impl IntoIterator<Item = Middleware>) -> Self {
        self.handle_with(Method::GET, pattern, route, middleware)
    }

    pub fn post_with(self, pattern: &str, route: impl Route, middleware: impl IntoIterator<Item = Middleware>) -> Self {
        self.handle_with(Method::POST, pattern, route, middleware)
    }

    pub fn put_with(self, pattern: &str, route: impl Route, middleware: impl IntoIterator<Item = Middleware>) -> Self {
        self.handle_with(Method::PUT, pattern, route, middleware)
    }

    pub fn patch_with(self, pattern: &str, route: impl Route, middleware: impl IntoIterator<Item = Middleware>) -> Self {
        self.handle_with(Method::PATCH, pattern, route, middleware)
    }

    pub fn delete_with(self, pattern: &str, route: impl Route, middleware: impl IntoIterator<Item = Middleware>) -> Self {
        self.handle_with(Method::DELETE, pattern, route, middleware)
    }

    /// Dispatches one request: the router-wide chain runs around the lookup
    /// and the matched route.
    pub fn serve_request(&self, w: Writer, mut req: Request) -> BoxFuture {
        req.set_error_handler(self.error_handler.clone());
        self.handler().call(w, req)
    }

    // Folded on first use and reused for every later request.
    fn handler(&self) -> &BoxedHandler {
        self.composed.get_or_init(|| {
            let mux: BoxedHandler = Arc::new(self.mux.clone());
            compose(&self.middleware, mux)
        })
    }
}

impl Default for Router {
    fn default() -> Self { Self::new() }
}

impl Handler for Router {
    fn call(&self, w: Writer, req: Request) -> BoxFuture {
        self.serve_request(w, req)
    }
}

// ── Mux ───────────────────────────────────────────────────────────────────────

/// The registry: pattern lookup, path parameters, and the 404 / 405 answers
/// for requests no route claims. Those answers never reach the error policy.
#[derive(Clone, Default)]
struct Mux {
    routes: HashMap<Method, MatchitRouter<BoxedHandler>>,
}

impl Mux {
    fn insert(&mut self, method: Method, pattern: &str, handler: BoxedHandler) {
        self.routes
            .entry(method)
            .or_default()
            .insert(pattern, handler)
            .unwrap_or_else(|e| panic!("invalid route `{pattern}`: {e}"));
    }

    fn lookup(&self, method: &Method, path: &str) -> Option<(BoxedHandler, HashMap<String, String>)> {
        let tree = self.routes.get(method)?;
        let matched = tree.at(path).ok()?;
        let handler = Arc::clone(matched.value);
        let params = matched.params.iter()
            .map(|(k, v)| (k.to_owned(), v.to_owned()))
            .collect();
        Some((handler, params))
    }

    /// Methods with a route matching `path`, sorted, as an `Allow` value.
    fn allowed(&self, path: &str) -> Option<String> {
        let mut methods: Vec<&str> = self.routes.iter()
            .filter(|(_, tree)| tree.at(path).is_ok())
            .map(|(method, _)| method.as_str())
            .collect();
        if methods.is_empty() {
            return None;
        }
        if methods.contains(&"GET") && !methods.contains(&"HEAD") {
            methods.push("HEAD");
        }
        methods.sort_unstable();
        Some(methods.join(", "))
    }
}

impl Handler for Mux {
    fn call(&self, w: Writer, mut req: Request) -> BoxFuture {
        let path = req.uri().path().to_owned();

        let found = self.lookup(req.method(), &path).or_else(|| {
            // HEAD is answered by the GET route; the server drops the body.
            (*req.method() == Method::HEAD)
                .then(|| self.lookup(&Method::GET, &path))
                .flatten()
        });

        if let Some((handler, params)) = found {
            req.set_params(params);
            return handler.call(w, req);
        }

        let allowed = self.allowed(&path);
        Box::pin(async move {
            let written = match allowed {
                Some(methods) => {
                    if let Ok(value) = HeaderValue::from_str(&methods) {
                        w.set_header(ALLOW, value);
                    }
                    plain_error(&*w, StatusCode::METHOD_NOT_ALLOWED, "Method Not Allowed")
                }
                None => plain_error(&*w, StatusCode::NOT_FOUND, "404 page not found"),
            };
            if let Err(e) = written {
                error!(error = %e, "failed to write routing miss");
            }
        })
    }
}

fn plain_error(w: &dyn ResponseWriter, status: StatusCode, message: &str) -> Result<(), Error> {
    w.set_header(CONTENT_TYPE, HeaderValue::from_static("text/plain; charset=utf-8"));
    w.set_header(X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));
    respond(w, status, format!("{message}\n").as_bytes())
}
