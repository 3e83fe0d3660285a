//! Built-in middleware.
//!
//! Middleware intercepts requests and responses and is the right place for
//! cross-cutting concerns. Each built-in is a plain
//! `fn(BoxedHandler) -> BoxedHandler` and can be passed to
//! [`Router::middleware`](crate::Router::middleware) as is:
//!
//! ```rust
//! use routekit::{Router, middleware};
//!
//! let app = Router::new()
//!     .middleware(middleware::logger)
//!     .middleware(middleware::recover);
//! ```
//!
//! Order matters. `logger` registered before `recover` wraps it, so the
//! access log line of a request that panicked shows the `500` that
//! `recover` rendered.

mod logger;
mod recover;

pub use logger::logger;
pub use recover::recover;
