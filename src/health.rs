//! Ready-made health-check routes.
//!
//! | Probe | Path | Question |
//! |---|---|---|
//! | **Liveness** | `/healthz` | Is the process alive? Failure → restart. |
//! | **Readiness** | `/readyz` | Can the pod serve traffic? Failure → pulled from load-balancer. |
//!
//! ```rust
//! use routekit::{Router, health};
//!
//! let app = Router::new()
//!     .get("/healthz", health::liveness)
//!     .get("/readyz", health::readiness);
//! ```
//!
//! Write your own readiness route if it must gate on dependencies; return an
//! [`HttpError`](crate::HttpError) with `503` and the error policy answers.

use http::StatusCode;
use http::header::{CONTENT_TYPE, HeaderValue};

use crate::error::Error;
use crate::request::Request;
use crate::response::{Writer, respond};

/// Always `200 OK` with body `"ok"`.
pub async fn liveness(w: Writer, _req: Request) -> Result<(), Error> {
    text(&w, "ok")
}

/// `200 OK` with body `"ready"`.
pub async fn readiness(w: Writer, _req: Request) -> Result<(), Error> {
    text(&w, "ready")
}

fn text(w: &Writer, body: &str) -> Result<(), Error> {
    w.set_header(CONTENT_TYPE, HeaderValue::from_static("text/plain; charset=utf-8"));
    respond(&**w, StatusCode::OK, body.as_bytes())
}
