//! Minimal routekit example: JSON endpoints, error rendering, panic
//! recovery and health checks.
//!
//! Run with:
//!   RUST_LOG=info cargo run --example basic
//!
//! Try:
//!   curl -i http://localhost:3000/items/42
//!   curl -i http://localhost:3000/items/0          # 404 {"error":"item 0 does not exist"}
//!   curl -i -X POST http://localhost:3000/items \
//!        -H 'content-type: application/json' \
//!        -d '{"name":"wheel"}'
//!   curl -i http://localhost:3000/boom             # 500, connection: close
//!   curl -i -X DELETE http://localhost:3000/healthz  # 405
//!   curl http://localhost:3000/healthz

use std::sync::Arc;

use http::StatusCode;
use http::header::{HeaderName, HeaderValue};
use routekit::{
    BoxError, BoxedHandler, HttpError, Request, Router, Server, Writer, handler_fn, health, middleware,
    middleware_fn, respond, respond_json,
};
use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

#[derive(Serialize)]
struct Item<'a> {
    id: &'a str,
    name: &'a str,
}

#[derive(Deserialize)]
struct NewItem {
    name: String,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let app = Router::new()
        .middleware(middleware::logger)
        .middleware(middleware::recover)
        .get("/items/{id}", get_item)
        .post_with("/items", create_item, [middleware_fn(require_json)])
        .get("/boom", boom)
        .get("/healthz", health::liveness)
        .get("/readyz", health::readiness);

    Server::bind("0.0.0.0:3000")
        .serve(app)
        .await
        .expect("server error");
}

// GET /items/{id}
async fn get_item(w: Writer, req: Request) -> Result<(), BoxError> {
    let id = req.param("id").unwrap_or_default();
    if id == "0" {
        return Err(HttpError::exposed(StatusCode::NOT_FOUND, format!("item {id} does not exist")).into());
    }
    respond_json(&*w, StatusCode::OK, &Item { id, name: "wheel" })?;
    Ok(())
}

// POST /items → 201 with a location header.
//
// A malformed body is a client error the caller may see; anything else that
// goes wrong stays behind the generic 500.
async fn create_item(w: Writer, req: Request) -> Result<(), BoxError> {
    let input: NewItem = serde_json::from_slice(req.body())
        .map_err(|e| HttpError::exposed(StatusCode::BAD_REQUEST, e))?;

    w.set_header(HeaderName::from_static("location"), HeaderValue::from_static("/items/99"));
    respond_json(&*w, StatusCode::CREATED, &Item { id: "99", name: &input.name })?;
    Ok(())
}

// GET /boom: recovered by middleware::recover.
async fn boom(_w: Writer, _req: Request) -> Result<(), BoxError> {
    panic!("boom")
}

// Per-route middleware: rejects bodies that are not declared as JSON.
fn require_json(next: BoxedHandler) -> BoxedHandler {
    handler_fn(move |w: Writer, req: Request| {
        let next = Arc::clone(&next);
        async move {
            let is_json = req.header("content-type").is_some_and(|ct| ct.starts_with("application/json"));
            if is_json {
                next.call(w, req).await;
            } else if let Err(e) = respond(&*w, StatusCode::UNSUPPORTED_MEDIA_TYPE, b"") {
                tracing::error!(error = %e, "failed to reject request");
            }
        }
    })
}
