//! Assetgate HTTP front end using Pingora
//!
//! 🌐 Every request is answered in `request_filter`: the registry either
//! serves it from a static root or the front end replies 404. Nothing is
//! ever proxied upstream.

use assetgate_core::{BufferedContext, RequestContext};
use assetgate_static::HandlerRegistry;

use async_trait::async_trait;
use bytes::Bytes;
use http::{HeaderMap, Method, StatusCode};
use percent_encoding::percent_decode_str;
use pingora_core::Result as PingoraResult;
use pingora_core::upstreams::peer::HttpPeer;
use pingora_http::ResponseHeader;
use pingora_proxy::{ProxyHttp, Session};
use std::sync::Arc;
use std::time::Instant;

/// Context for each request
pub struct RequestCtx {
    /// Start time for logging
    pub start_time: Instant,
}

impl Default for RequestCtx {
    fn default() -> Self {
        Self {
            start_time: Instant::now(),
        }
    }
}

/// A fully buffered reply, ready to be written to the session
#[derive(Debug)]
pub struct Reply {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
    /// `HEAD` replies carry headers only
    pub head_only: bool,
}

impl Reply {
    /// Plain 404
    pub fn not_found(head_only: bool) -> Self {
        Self::text(StatusCode::NOT_FOUND, "Not Found", head_only)
    }

    /// Plain 405 for methods static roots never answer
    pub fn method_not_allowed() -> Self {
        let mut reply = Self::text(StatusCode::METHOD_NOT_ALLOWED, "Method Not Allowed", false);
        reply
            .headers
            .insert(http::header::ALLOW, http::HeaderValue::from_static("GET, HEAD"));
        reply
    }

    fn text(status: StatusCode, body: &'static str, head_only: bool) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(
            http::header::CONTENT_TYPE,
            http::HeaderValue::from_static("text/plain; charset=utf-8"),
        );
        Self {
            status,
            headers,
            body: Bytes::from_static(body.as_bytes()),
            head_only,
        }
    }

    /// Turn a handled request context into a reply
    pub fn from_context(ctx: BufferedContext, head_only: bool) -> Self {
        let (status, headers, body) = ctx.into_response();
        Self {
            status,
            headers,
            body: Bytes::from(body),
            head_only,
        }
    }

    /// Whether a body goes on the wire
    pub fn has_body(&self) -> bool {
        !self.head_only && self.status != StatusCode::NOT_MODIFIED
    }

    /// Build the Pingora response header
    pub fn response_header(&self) -> PingoraResult<ResponseHeader> {
        let mut header = ResponseHeader::build(self.status, Some(self.headers.len() + 2))?;
        for (name, value) in &self.headers {
            header.append_header(name.clone(), value.clone())?;
        }
        if self.status != StatusCode::NOT_MODIFIED {
            header.insert_header(http::header::CONTENT_LENGTH, self.body.len().to_string())?;
        }
        header.insert_header(http::header::SERVER, "Assetgate")?;
        Ok(header)
    }
}

/// Percent-decode a request path once.
///
/// An encoded `/` would let a single segment turn into several after
/// decoding, so such paths never resolve. Neither does invalid UTF-8.
pub fn decode_path(raw: &str) -> Option<String> {
    if raw.to_ascii_lowercase().contains("%2f") {
        return None;
    }
    percent_decode_str(raw).decode_utf8().ok().map(|p| p.into_owned())
}

/// Static resource front end
#[derive(Clone)]
pub struct StaticProxy {
    registry: Arc<HandlerRegistry>,
}

impl StaticProxy {
    /// Create a front end over `registry`
    pub fn new(registry: Arc<HandlerRegistry>) -> Self {
        Self { registry }
    }

    /// The registry requests are dispatched to
    pub fn registry(&self) -> &Arc<HandlerRegistry> {
        &self.registry
    }

    /// Dispatch a request to the static roots and buffer the reply.
    ///
    /// `raw_path` is the path as it appears on the wire.
    pub async fn dispatch(&self, method: Method, raw_path: &str, headers: HeaderMap) -> Reply {
        let head_only = method == Method::HEAD;
        if method != Method::GET && !head_only {
            return Reply::method_not_allowed();
        }

        let Some(path) = decode_path(raw_path) else {
            tracing::debug!("🚫 Undecodable request path: {}", raw_path);
            return Reply::not_found(head_only);
        };

        let mut ctx = BufferedContext::new(method, path).with_request_headers(headers);
        if self.registry.handle(&mut ctx).await {
            Reply::from_context(ctx, head_only)
        } else {
            tracing::debug!("🔍 No static root serves {}", ctx.path());
            Reply::not_found(head_only)
        }
    }

    async fn write_reply(session: &mut Session, reply: &Reply) -> PingoraResult<()> {
        let header = reply.response_header()?;
        let has_body = reply.has_body();
        session.write_response_header(Box::new(header), !has_body).await?;
        if has_body {
            session.write_response_body(Some(reply.body.clone()), true).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl ProxyHttp for StaticProxy {
    type CTX = RequestCtx;

    fn new_ctx(&self) -> Self::CTX {
        RequestCtx::default()
    }

    /// Answer the request here; `Ok(true)` means no upstream phase runs
    async fn request_filter(&self, session: &mut Session, ctx: &mut Self::CTX) -> PingoraResult<bool> {
        let (method, path, headers) = {
            let req_header = session.req_header();
            (
                req_header.method.clone(),
                req_header.uri.path().to_string(),
                req_header.headers.clone(),
            )
        };

        let reply = self.dispatch(method.clone(), &path, headers).await;

        if let Err(e) = Self::write_reply(session, &reply).await {
            // Client went away mid-response; nothing left to answer
            tracing::debug!("Failed to write response for {}: {}", path, e);
        }

        tracing::debug!(
            method = %method,
            path = %path,
            status = reply.status.as_u16(),
            bytes = reply.body.len(),
            elapsed_ms = ctx.start_time.elapsed().as_millis(),
            "✅ Request completed"
        );

        Ok(true)
    }

    /// Never reached: every request is answered in `request_filter`
    async fn upstream_peer(
        &self,
        _session: &mut Session,
        _ctx: &mut Self::CTX,
    ) -> PingoraResult<Box<HttpPeer>>
    where
        Self::CTX: Send + Sync,
    {
        Err(pingora_core::Error::new(pingora_core::ErrorType::ConnectNoRoute))
    }
}
