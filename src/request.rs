//! Incoming HTTP request type.

use std::collections::HashMap;
use std::net::SocketAddr;

use bytes::Bytes;
use http::header::HOST;
use http::request::Parts;
use http::{HeaderMap, Method, Uri, Version};

use crate::policy::ErrorHandler;

/// An incoming HTTP request with its body fully read.
///
/// Cloning copies the head; the body is shared.
#[derive(Clone)]
pub struct Request {
    parts: Parts,
    body: Bytes,
    params: HashMap<String, String>,
    remote_addr: Option<SocketAddr>,
    tls: bool,
}

impl Request {
    pub(crate) fn from_parts(parts: Parts, body: Bytes, remote_addr: SocketAddr) -> Self {
        Self { parts, body, params: HashMap::new(), remote_addr: Some(remote_addr), tls: false }
    }

    pub fn method(&self) -> &Method { &self.parts.method }
    pub fn uri(&self) -> &Uri { &self.parts.uri }
    pub fn version(&self) -> Version { self.parts.version }
    pub fn headers(&self) -> &HeaderMap { &self.parts.headers }
    pub fn body(&self) -> &[u8] { &self.body }
    pub fn remote_addr(&self) -> Option<SocketAddr> { self.remote_addr }

    /// Whether the connection this request arrived on was TLS-terminated by
    /// this process. Always `false` behind a TLS-terminating proxy.
    pub fn is_tls(&self) -> bool { self.tls }

    /// Header lookup; header names are case-insensitive.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.parts.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// `Host` header, or the URI authority (HTTP/2 `:authority`).
    pub fn host(&self) -> &str {
        self.header(HOST.as_str())
            .or_else(|| self.parts.uri.authority().map(|a| a.as_str()))
            .unwrap_or("")
    }

    /// Path and query as the client sent them.
    pub fn request_uri(&self) -> &str {
        self.parts.uri.path_and_query().map_or("/", |pq| pq.as_str())
    }

    /// Returns a named path parameter.
    ///
    /// For a route `/users/{id}`, `req.param("id")` on `/users/42` returns `Some("42")`.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    pub fn with_remote_addr(mut self, addr: SocketAddr) -> Self {
        self.remote_addr = Some(addr);
        self
    }

    pub fn with_tls(mut self, tls: bool) -> Self {
        self.tls = tls;
        self
    }

    /// The error policy of the router dispatching this request, or the
    /// default policy outside any router.
    pub fn error_handler(&self) -> ErrorHandler {
        self.parts.extensions.get::<ErrorHandler>().cloned().unwrap_or_default()
    }

    pub(crate) fn set_error_handler(&mut self, handler: ErrorHandler) {
        self.parts.extensions.insert(handler);
    }

    pub(crate) fn set_params(&mut self, params: HashMap<String, String>) {
        self.params = params;
    }
}

/// Builds a request without a connection, e.g. for tests.
impl From<http::Request<Bytes>> for Request {
    fn from(req: http::Request<Bytes>) -> Self {
        let (parts, body) = req.into_parts();
        Self { parts, body, params: HashMap::new(), remote_addr: None, tls: false }
    }
}
