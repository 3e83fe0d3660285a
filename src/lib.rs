//! # routekit
//!
//! Method + pattern routing, ordered middleware and one place where errors
//! become responses, on top of hyper.
//!
//! ## The pieces
//!
//! - [`Router`]: radix-tree routing via [`matchit`], router-wide and
//!   per-route middleware, a pluggable error policy.
//! - Routes: `async fn(Writer, Request) -> Result<(), E>`. Return `Err` and
//!   the policy renders it; return `Ok` and whatever you wrote is sent.
//! - [`HttpError`]: an error with a status and a decision on whether its
//!   message may reach the client. Anything else is a generic `500`.
//! - [`middleware::logger`] and [`middleware::recover`]: access log and
//!   panic recovery.
//!
//! Error bodies are always `{"error":"<message>"}`. Routing misses are plain
//! `404` / `405` answers straight from the router; they never reach the policy.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use http::StatusCode;
//! use routekit::{BoxError, HttpError, Request, Router, Server, Writer, middleware, respond_json};
//!
//! #[tokio::main]
//! async fn main() {
//!     let app = Router::new()
//!         .middleware(middleware::logger)
//!         .middleware(middleware::recover)
//!         .get("/items/{id}", get_item);
//!
//!     Server::bind("0.0.0.0:3000").serve(app).await.unwrap();
//! }
//!
//! async fn get_item(w: Writer, req: Request) -> Result<(), BoxError> {
//!     let id = req.param("id").unwrap_or_default();
//!     if id.is_empty() {
//!         return Err(HttpError::exposed(StatusCode::BAD_REQUEST, "missing id").into());
//!     }
//!     respond_json(&*w, StatusCode::OK, &serde_json::json!({ "id": id }))?;
//!     Ok(())
//! }
//! ```

mod error;
mod handler;
mod policy;
mod recorder;
mod request;
mod response;
mod router;
mod server;

pub mod health;
pub mod middleware;

pub use error::{BoxError, Error, HttpError};
pub use handler::{BoxFuture, BoxedHandler, Handler, Middleware, Route, compose, handler_fn, middleware_fn};
pub use policy::{ErrorHandler, render_error};
pub use recorder::ResponseRecorder;
pub use request::Request;
pub use response::{Response, ResponseWriter, Writer, respond, respond_json};
pub use router::Router;
pub use server::Server;
