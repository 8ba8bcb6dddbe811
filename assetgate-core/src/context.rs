//! Request context seam
//!
//! The static file core never talks to a socket. It reads the request and
//! writes the response through [`RequestContext`], whose body write is
//! synchronous: once `write` returns, the bytes belong to the outer pipeline.

use http::header::{HeaderMap, HeaderName, HeaderValue};
use http::{Method, StatusCode};
use std::io;

/// The request/response exchange as seen by the static file core
pub trait RequestContext: Send + Sync {
    /// Request path (without query string)
    fn path(&self) -> &str;

    /// Request method
    fn method(&self) -> &Method;

    /// Look up a request header
    fn header(&self, name: &str) -> Option<&str>;

    /// Look up a response header set so far
    fn response_header(&self, name: &str) -> Option<&str>;

    /// Set (replace) a response header
    fn set_header(&mut self, name: &str, value: &str);

    /// Remove a response header
    fn remove_header(&mut self, name: &str);

    /// Set the response status
    fn set_status(&mut self, status: StatusCode);

    /// Write body bytes to the client, blocking until they are accepted
    fn write(&mut self, bytes: &[u8]) -> io::Result<()>;

    /// Discard the status, headers and body written so far
    fn reset_response(&mut self);
}

/// A request context that records the response in memory.
///
/// Used by the HTTP front end, which flushes it to the connection once the
/// core is done, and by tests.
#[derive(Debug)]
pub struct BufferedContext {
    method: Method,
    path: String,
    request_headers: HeaderMap,
    status: StatusCode,
    response_headers: HeaderMap,
    body: Vec<u8>,
    disconnected: bool,
}

impl BufferedContext {
    /// Create a context for a request
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            request_headers: HeaderMap::new(),
            status: StatusCode::OK,
            response_headers: HeaderMap::new(),
            body: Vec::new(),
            disconnected: false,
        }
    }

    /// Shorthand for a GET request
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    /// Replace the request headers
    pub fn with_request_headers(mut self, headers: HeaderMap) -> Self {
        self.request_headers = headers;
        self
    }

    /// Add a request header
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        if let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            self.request_headers.insert(name, value);
        }
        self
    }

    /// Make every following write fail as if the client had gone away
    pub fn disconnect(&mut self) {
        self.disconnected = true;
    }

    /// Response status
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Response headers
    pub fn response_headers(&self) -> &HeaderMap {
        &self.response_headers
    }

    /// Body written so far
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Split into status, headers and body
    pub fn into_response(self) -> (StatusCode, HeaderMap, Vec<u8>) {
        (self.status, self.response_headers, self.body)
    }
}

impl RequestContext for BufferedContext {
    fn path(&self) -> &str {
        &self.path
    }

    fn method(&self) -> &Method {
        &self.method
    }

    fn header(&self, name: &str) -> Option<&str> {
        self.request_headers.get(name).and_then(|v| v.to_str().ok())
    }

    fn response_header(&self, name: &str) -> Option<&str> {
        self.response_headers.get(name).and_then(|v| v.to_str().ok())
    }

    fn set_header(&mut self, name: &str, value: &str) {
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            (Ok(name), Ok(value)) => {
                self.response_headers.insert(name, value);
            }
            _ => tracing::warn!("⚠️ Ignoring invalid response header {}: {}", name, value),
        }
    }

    fn remove_header(&mut self, name: &str) {
        self.response_headers.remove(name);
    }

    fn set_status(&mut self, status: StatusCode) {
        self.status = status;
    }

    fn write(&mut self, bytes: &[u8]) -> io::Result<()> {
        if self.disconnected {
            return Err(io::Error::from(io::ErrorKind::BrokenPipe));
        }
        self.body.extend_from_slice(bytes);
        Ok(())
    }

    fn reset_response(&mut self) {
        self.status = StatusCode::OK;
        self.response_headers.clear();
        self.body.clear();
    }
}
