//! Blocking write adapter
//!
//! Encoders from `async-compression` drive their output through the
//! non-blocking [`AsyncWrite`] contract, while [`RequestContext::write`]
//! blocks until the outer pipeline has taken the bytes. [`ContextWriter`]
//! bridges the two by performing the blocking write inside `poll_write`
//! and completing at once. It never returns `Pending`, so output order is
//! exactly the order of the encoder's writes.
//!
//! This is a simplification: a context with a truly asynchronous body sink
//! would want a real `AsyncWrite` instead.

use assetgate_core::RequestContext;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::io::AsyncWrite;

/// [`AsyncWrite`] over a request context's blocking body write
pub struct ContextWriter<'a> {
    ctx: &'a mut dyn RequestContext,
    written: u64,
}

impl<'a> ContextWriter<'a> {
    /// Wrap a context
    pub fn new(ctx: &'a mut dyn RequestContext) -> Self {
        Self { ctx, written: 0 }
    }

    /// Bytes handed to the context so far
    pub fn written(&self) -> u64 {
        self.written
    }
}

impl AsyncWrite for ContextWriter<'_> {
    fn poll_write(self: Pin<&mut Self>, _cx: &mut Context<'_>, buf: &[u8]) -> Poll<io::Result<usize>> {
        let this = self.get_mut();
        let result = this.ctx.write(buf).map(|()| buf.len());
        if let Ok(n) = result {
            this.written += n as u64;
        }
        Poll::Ready(result)
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assetgate_core::BufferedContext;
    use tokio::io::AsyncWriteExt;

    #[tokio::test]
    async fn test_writes_reach_context_in_order() {
        let mut ctx = BufferedContext::get("/");
        {
            let mut writer = ContextWriter::new(&mut ctx);
            writer.write_all(b"first ").await.unwrap();
            writer.write_all(b"second").await.unwrap();
            writer.flush().await.unwrap();
            assert_eq!(writer.written(), 12);
        }
        assert_eq!(ctx.body(), b"first second");
    }

    #[tokio::test]
    async fn test_write_error_fails_the_poll() {
        let mut ctx = BufferedContext::get("/");
        ctx.disconnect();
        let mut writer = ContextWriter::new(&mut ctx);
        let err = writer.write_all(b"lost").await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
        assert_eq!(writer.written(), 0);
    }
}
