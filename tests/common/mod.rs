#![allow(dead_code)]

use std::io;
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use http::Method;
use routekit::{BoxError, Request, Response, Router, Writer, respond_json};

pub fn request(method: Method, uri: &str) -> Request {
    Request::from(
        http::Request::builder()
            .method(method)
            .uri(uri)
            .header("host", "example.com")
            .body(Bytes::new())
            .unwrap(),
    )
}

pub async fn send(app: &Router, method: Method, uri: &str) -> Arc<Response> {
    let w = Arc::new(Response::new());
    app.serve_request(w.clone(), request(method, uri)).await;
    w
}

pub fn body(w: &Response) -> String {
    String::from_utf8(w.body().to_vec()).unwrap()
}

/// Echoes the `id` path parameter as `{"id":"<id>"}`.
pub async fn echo_id(w: Writer, req: Request) -> Result<(), BoxError> {
    let id = req.param("id").unwrap_or_default();
    respond_json(&*w, http::StatusCode::OK, &serde_json::json!({ "id": id }))?;
    Ok(())
}

/// Collects everything a `tracing` fmt subscriber writes.
#[derive(Clone, Default)]
pub struct Capture(Arc<Mutex<Vec<u8>>>);

impl Capture {
    /// Installs a subscriber writing into this capture for the current
    /// thread until the guard is dropped.
    pub fn install(&self) -> tracing::subscriber::DefaultGuard {
        let sink = self.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || sink.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::INFO)
            .finish();
        tracing::subscriber::set_default(subscriber)
    }

    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }

    pub fn access_lines(&self) -> Vec<String> {
        self.contents()
            .lines()
            .filter(|l| l.contains("routekit::access"))
            .map(str::to_owned)
            .collect()
    }
}

impl io::Write for Capture {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
