//! Error rendering policy.
//!
//! Every error a route returns, and every panic `middleware::recover`
//! catches, ends up here. The policy decides the status and the message the
//! client sees. The default, [`render_error`], answers with
//! `{"error":"<message>"}`.
//!
//! A router carries its own policy (see [`Router::error_handler`]) and hands
//! it to each request it dispatches. Nothing here is process-global.
//!
//! [`Router::error_handler`]: crate::Router::error_handler

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use http::StatusCode;
use tracing::error;

use crate::error::{BoxError, Error, HttpError};
use crate::request::Request;
use crate::response::{ResponseWriter, respond_json};

const GENERIC_MESSAGE: &str = "internal server error";

type PolicyFn = dyn Fn(&dyn ResponseWriter, &Request, &BoxError) -> Result<(), Error> + Send + Sync + 'static;

/// A shareable error rendering policy.
#[derive(Clone)]
pub struct ErrorHandler(Arc<PolicyFn>);

impl ErrorHandler {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&dyn ResponseWriter, &Request, &BoxError) -> Result<(), Error> + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    /// Renders `err`, raised while serving `req`, into `w`. A failure here is
    /// returned to the caller and never fed back into the policy.
    pub fn render(&self, w: &dyn ResponseWriter, req: &Request, err: &BoxError) -> Result<(), Error> {
        (self.0)(w, req, err)
    }
}

impl Default for ErrorHandler {
    fn default() -> Self {
        Self::new(render_error)
    }
}

impl fmt::Debug for ErrorHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ErrorHandler(..)")
    }
}

/// The default policy.
///
/// [`HttpError`]s keep their status and, if exposed, their message. Any other
/// error becomes `500` with a generic message. The error is logged in full in
/// both cases, along with the method and path of `req`.
pub fn render_error(w: &dyn ResponseWriter, req: &Request, err: &BoxError) -> Result<(), Error> {
    let (status, message) = match err.downcast_ref::<HttpError>() {
        Some(e) if e.expose() => (e.status(), e.to_string()),
        Some(e) => (e.status(), GENERIC_MESSAGE.to_owned()),
        None => (StatusCode::INTERNAL_SERVER_ERROR, GENERIC_MESSAGE.to_owned()),
    };

    error!(
        method = %req.method(),
        path = req.uri().path(),
        error = %err,
        status = status.as_u16(),
        "route failed",
    );

    respond_json(w, status, &BTreeMap::from([("error", message)]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::response::Response;

    fn request() -> Request {
        Request::from(http::Request::builder().uri("/items/7").body(bytes::Bytes::new()).unwrap())
    }

    fn render(err: impl Into<BoxError>) -> Response {
        let w = Response::new();
        render_error(&w, &request(), &err.into()).unwrap();
        w
    }

    #[test]
    fn unclassified_is_generic_500() {
        let w = render("test error");
        assert_eq!(w.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(&w.body()[..], br#"{"error":"internal server error"}"#);
    }

    #[test]
    fn exposed_error_shows_its_message() {
        let w = render(HttpError::exposed(StatusCode::NOT_FOUND, "test error"));
        assert_eq!(w.status(), StatusCode::NOT_FOUND);
        assert_eq!(&w.body()[..], br#"{"error":"test error"}"#);
    }

    #[test]
    fn hidden_error_keeps_status_not_message() {
        for status in [StatusCode::BAD_REQUEST, StatusCode::FORBIDDEN, StatusCode::BAD_GATEWAY] {
            let w = render(HttpError::new(status, "secret detail"));
            assert_eq!(w.status(), status);
            assert_eq!(&w.body()[..], br#"{"error":"internal server error"}"#);
        }
    }

    #[test]
    fn messages_are_json_escaped() {
        let w = render(HttpError::exposed(StatusCode::BAD_REQUEST, r#"bad "name""#));
        assert_eq!(&w.body()[..], br#"{"error":"bad \"name\""}"#);
    }

    #[test]
    fn custom_policy_is_called() {
        let policy = ErrorHandler::new(|w, _, _| {
            w.write_status(StatusCode::IM_A_TEAPOT);
            Ok(())
        });
        let w = Response::new();
        policy.render(&w, &request(), &"x".into()).unwrap();
        assert_eq!(w.status(), StatusCode::IM_A_TEAPOT);
    }

    #[test]
    fn custom_policy_sees_the_request() {
        let policy = ErrorHandler::new(|w, req, _| {
            respond_json(w, StatusCode::NOT_FOUND, &BTreeMap::from([("path", req.uri().path())]))
        });
        let w = Response::new();
        policy.render(&w, &request(), &"x".into()).unwrap();
        assert_eq!(&w.body()[..], br#"{"path":"/items/7"}"#);
    }
}
