//! Compression support

use assetgate_core::config::{CompressionConfig, CompressionLevel};
use assetgate_core::{RequestContext, Result};
use async_compression::Level;
use async_compression::tokio::write::{BrotliEncoder, GzipEncoder, ZstdEncoder};
use async_trait::async_trait;
use std::io;
use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::mime::is_compressible;
use crate::writer::ContextWriter;

/// Supported compression algorithms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Algorithm {
    Brotli,
    Zstd,
    Gzip,
}

impl Algorithm {
    /// Server preference: brotli compresses best, zstd decompresses fastest,
    /// gzip is understood everywhere.
    pub const PREFERENCE: [Algorithm; 3] = [Algorithm::Brotli, Algorithm::Zstd, Algorithm::Gzip];

    /// Get the content-encoding header value
    pub fn encoding(&self) -> &'static str {
        match self {
            Algorithm::Gzip => "gzip",
            Algorithm::Brotli => "br",
            Algorithm::Zstd => "zstd",
        }
    }

    /// Suffix of a precompressed sibling file
    pub fn extension(&self) -> &'static str {
        match self {
            Algorithm::Gzip => ".gz",
            Algorithm::Brotli => ".br",
            Algorithm::Zstd => ".zst",
        }
    }
}

/// Encodings the client accepts, in server preference order.
///
/// Honors `q=0` exclusions and the `*` wildcard.
pub fn accepted_encodings(accept_encoding: Option<&str>) -> Vec<Algorithm> {
    let Some(header) = accept_encoding else {
        return Vec::new();
    };

    let mut accepted: Vec<Algorithm> = Vec::new();
    let mut rejected: Vec<Algorithm> = Vec::new();
    let mut wildcard = false;

    for item in header.split(',') {
        let mut parts = item.split(';');
        let name = parts.next().unwrap_or("").trim().to_ascii_lowercase();
        let refused = parts.any(|p| {
            let p = p.trim();
            p.strip_prefix("q=")
                .and_then(|q| q.trim().parse::<f32>().ok())
                .is_some_and(|q| q <= 0.0)
        });

        let algorithms: Vec<Algorithm> = match name.as_str() {
            "br" => vec![Algorithm::Brotli],
            "zstd" => vec![Algorithm::Zstd],
            "gzip" | "x-gzip" => vec![Algorithm::Gzip],
            "*" => {
                wildcard = !refused;
                continue;
            }
            _ => continue,
        };

        if refused {
            rejected.extend(algorithms);
        } else {
            accepted.extend(algorithms);
        }
    }

    Algorithm::PREFERENCE
        .into_iter()
        .filter(|a| !rejected.contains(a) && (wildcard || accepted.contains(a)))
        .collect()
}

/// Map the configured level onto an encoder level
pub fn encoder_level(level: CompressionLevel) -> Option<Level> {
    match level {
        CompressionLevel::None => None,
        CompressionLevel::Fast => Some(Level::Fastest),
        CompressionLevel::Default => Some(Level::Default),
        CompressionLevel::Best => Some(Level::Best),
    }
}

/// Compress `input` into `out`, returning the writer once the stream is finished
pub async fn encode<W>(algorithm: Algorithm, level: Level, input: &[u8], out: W) -> io::Result<W>
where
    W: AsyncWrite + Unpin + Send,
{
    match algorithm {
        Algorithm::Brotli => {
            let mut encoder = BrotliEncoder::with_quality(out, level);
            encoder.write_all(input).await?;
            encoder.shutdown().await?;
            Ok(encoder.into_inner())
        }
        Algorithm::Zstd => {
            let mut encoder = ZstdEncoder::with_quality(out, level);
            encoder.write_all(input).await?;
            encoder.shutdown().await?;
            Ok(encoder.into_inner())
        }
        Algorithm::Gzip => {
            let mut encoder = GzipEncoder::with_quality(out, level);
            encoder.write_all(input).await?;
            encoder.shutdown().await?;
            Ok(encoder.into_inner())
        }
    }
}

/// Compress into a fresh buffer
pub async fn compress_to_vec(algorithm: Algorithm, level: Level, input: &[u8]) -> io::Result<Vec<u8>> {
    encode(algorithm, level, input, Vec::with_capacity(input.len() / 2)).await
}

/// Mark the response as encoded with `algorithm`.
///
/// A strong `ETag` set earlier describes the identity bytes, so it is
/// downgraded to a weak one.
pub fn mark_encoded(ctx: &mut dyn RequestContext, algorithm: Algorithm) {
    ctx.set_header("Content-Encoding", algorithm.encoding());
    ctx.set_header("Vary", "Accept-Encoding");

    let weak = ctx
        .response_header("ETag")
        .filter(|tag| !tag.starts_with("W/"))
        .map(|tag| format!("W/{}", tag));
    if let Some(weak) = weak {
        ctx.set_header("ETag", &weak);
    }
}

/// Compresses an outbound body according to the negotiated encoding
#[async_trait]
pub trait CompressionStrategy: Send + Sync {
    /// Write `body` to the client, compressed when worthwhile
    async fn compress_and_write(&self, ctx: &mut dyn RequestContext, body: &[u8]) -> Result<()>;
}

/// Accept-Encoding driven compression
#[derive(Debug, Clone)]
pub struct NegotiatedCompression {
    level: CompressionLevel,
    min_size: usize,
}

impl NegotiatedCompression {
    /// Create a strategy
    pub fn new(level: CompressionLevel, min_size: usize) -> Self {
        Self { level, min_size }
    }

    /// Create a strategy from configuration
    pub fn from_config(config: &CompressionConfig) -> Self {
        Self::new(config.level, config.min_size)
    }

    fn negotiate(&self, ctx: &dyn RequestContext, len: usize) -> Option<(Algorithm, Level)> {
        let level = encoder_level(self.level)?;
        if len < self.min_size {
            return None;
        }
        if !ctx.response_header("Content-Type").is_none_or(is_compressible) {
            return None;
        }
        accepted_encodings(ctx.header("Accept-Encoding"))
            .first()
            .map(|a| (*a, level))
    }
}

impl Default for NegotiatedCompression {
    fn default() -> Self {
        Self::from_config(&CompressionConfig::default())
    }
}

#[async_trait]
impl CompressionStrategy for NegotiatedCompression {
    async fn compress_and_write(&self, ctx: &mut dyn RequestContext, body: &[u8]) -> Result<()> {
        let Some((algorithm, level)) = self.negotiate(&*ctx, body.len()) else {
            ctx.write(body)?;
            return Ok(());
        };

        tracing::debug!("🗜️ Compressing {} bytes with {}", body.len(), algorithm.encoding());
        mark_encoded(ctx, algorithm);

        encode(algorithm, level, body, ContextWriter::new(ctx)).await?;
        Ok(())
    }
}
