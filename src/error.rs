//! Error types.
//!
//! Two families live here. [`Error`] is the infrastructure failure: binding a
//! port, reading a request body, encoding a response. [`HttpError`] is the
//! application failure a route returns, carrying the status the client should
//! see and whether its message may be shown to them.

use http::StatusCode;

/// Any error a route may return. Classified errors are [`HttpError`]s boxed
/// into this type; everything else is treated as an internal failure.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// The error type returned by routekit's fallible operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("reading request body: {0}")]
    Body(#[source] hyper::Error),
}

/// An error carrying an HTTP status and an exposure decision.
///
/// The message of the underlying error reaches the client only when the
/// error was built with [`HttpError::exposed`] (or `with_exposed(true)`).
/// Otherwise the render policy substitutes a generic message. The full
/// error is logged either way.
///
/// ```rust
/// use routekit::HttpError;
/// use http::StatusCode;
///
/// let hidden = HttpError::new(StatusCode::CONFLICT, "row version mismatch");
/// assert!(!hidden.expose());
///
/// let shown = HttpError::exposed(StatusCode::NOT_FOUND, "missing");
/// assert_eq!(shown.to_string(), "missing");
/// ```
#[derive(Debug, thiserror::Error)]
#[error("{source}")]
pub struct HttpError {
    source: BoxError,
    status: StatusCode,
    expose: bool,
}

impl HttpError {
    pub fn new(status: StatusCode, err: impl Into<BoxError>) -> Self {
        Self { source: err.into(), status, expose: false }
    }

    /// Like [`new`](HttpError::new) but with the message marked safe to send.
    pub fn exposed(status: StatusCode, err: impl Into<BoxError>) -> Self {
        Self::new(status, err).with_exposed(true)
    }

    /// Builds from a raw status integer. Values outside `100..=999` become
    /// `500 Internal Server Error`.
    pub fn from_u16(status: u16, err: impl Into<BoxError>) -> Self {
        let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        Self::new(status, err)
    }

    pub fn with_exposed(mut self, expose: bool) -> Self {
        self.expose = expose;
        self
    }

    pub fn status(&self) -> StatusCode { self.status }
    pub fn expose(&self) -> bool { self.expose }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fails_closed_by_default() {
        let err = HttpError::new(StatusCode::BAD_REQUEST, "bad id");
        assert!(!err.expose());
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.to_string(), "bad id");
    }

    #[test]
    fn invalid_raw_status_clamps_to_500() {
        assert_eq!(HttpError::from_u16(42, "x").status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(HttpError::from_u16(1000, "x").status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(HttpError::from_u16(418, "x").status(), StatusCode::IM_A_TEAPOT);
    }

    #[test]
    fn source_is_the_wrapped_error() {
        use std::error::Error as _;

        let io = std::io::Error::other("disk gone");
        let err = HttpError::new(StatusCode::SERVICE_UNAVAILABLE, io);
        assert_eq!(err.source().map(ToString::to_string).as_deref(), Some("disk gone"));
    }
}
