//! Precompressed variant delivery
//!
//! A file is sent in an encoding the client accepts, without compressing on
//! the request path:
//! 1. a sibling prepared at build time (`app.js.br`, `app.js.zst`, `app.js.gz`)
//! 2. a variant compressed on first use and kept in memory
//! 3. the original bytes
//!
//! Siblings go through the same alias policy as the file they stand in for.

use assetgate_core::config::{AliasCheckRef, CompressionLevel};
use assetgate_core::{RequestContext, Resource, Result};
use async_compression::Level;
use bytes::Bytes;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::alias;
use crate::compress::{Algorithm, accepted_encodings, compress_to_vec, encoder_level, mark_encoded};
use crate::mime::is_compressible;

/// Files above this size are never compressed into memory
pub const MAX_PRECOMPRESS_SIZE: u64 = 2 * 1024 * 1024;

#[derive(Debug)]
struct CachedVariant {
    len: u64,
    modified: Option<SystemTime>,
    data: Bytes,
}

/// Variant negotiation plus the in-memory variant cache of one root.
///
/// The cache holds at most one variant per file and algorithm; a changed
/// file replaces its stale entry.
#[derive(Debug)]
pub struct PrecompressedVariants {
    level: Option<Level>,
    alias_check: Option<AliasCheckRef>,
    cache: RwLock<HashMap<(String, Algorithm), CachedVariant>>,
}

impl PrecompressedVariants {
    /// Create an empty cache; `CompressionLevel::None` disables generated variants
    pub fn new(level: CompressionLevel, alias_check: Option<AliasCheckRef>) -> Self {
        Self {
            level: encoder_level(level),
            alias_check,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Number of cached variants
    pub fn cached(&self) -> usize {
        self.cache.read().len()
    }

    /// Write `resource` in the best encoding available to this client
    pub async fn deliver(&self, ctx: &mut dyn RequestContext, resource: &Resource, mime: &str) -> Result<()> {
        let accepted = accepted_encodings(ctx.header("Accept-Encoding"));

        if let Some(file) = resource.file_path() {
            for algorithm in &accepted {
                if let Some(content) = self.sibling(resource, file, *algorithm).await {
                    tracing::debug!("✅ Using pre-compressed file: {} ({})", file.display(), algorithm.encoding());
                    return write_encoded(ctx, *algorithm, &content);
                }
            }
        }

        if let (Some(algorithm), Some(level)) = (accepted.first().copied(), self.level) {
            if is_compressible(mime) && resource.len() <= MAX_PRECOMPRESS_SIZE {
                let content = self.variant(resource, algorithm, level).await?;
                return write_encoded(ctx, algorithm, &content);
            }
        }

        let content = resource.read().await?;
        ctx.write(&content)?;
        Ok(())
    }

    /// Load the prepared sibling of `file`, if it exists and passes the alias policy
    async fn sibling(&self, resource: &Resource, file: &Path, algorithm: Algorithm) -> Option<Bytes> {
        let mut literal = file.as_os_str().to_owned();
        literal.push(algorithm.extension());
        let literal = PathBuf::from(literal);

        let metadata = tokio::fs::metadata(&literal).await.ok()?;
        if !metadata.is_file() {
            return None;
        }
        let real = tokio::fs::canonicalize(&literal).await.ok()?;
        let base = resource.base()?.to_path_buf();
        let path = format!("{}{}", resource.path(), algorithm.extension());

        let sibling = Resource::file(
            path.clone(),
            literal,
            real,
            base,
            metadata.len(),
            metadata.modified().ok(),
        );

        match alias::guard(&path, sibling, self.alias_check.as_ref()) {
            Ok(Some(sibling)) => sibling.read().await.ok(),
            Ok(None) => None,
            Err(e) => {
                tracing::debug!("🔒 Skipping pre-compressed file: {}", e);
                None
            }
        }
    }

    async fn variant(&self, resource: &Resource, algorithm: Algorithm, level: Level) -> Result<Bytes> {
        let location = resource
            .real_path()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| resource.path().to_string());
        let key = (location, algorithm);

        let cached = self
            .cache
            .read()
            .get(&key)
            .filter(|v| v.len == resource.len() && v.modified == resource.modified())
            .map(|v| v.data.clone());
        if let Some(content) = cached {
            return Ok(content);
        }

        let original = resource.read().await?;
        let compressed = Bytes::from(compress_to_vec(algorithm, level, &original).await?);
        tracing::debug!(
            "🗜️ Cached {} variant of {} ({} -> {} bytes)",
            algorithm.encoding(),
            key.0,
            original.len(),
            compressed.len()
        );
        self.cache.write().insert(
            key,
            CachedVariant {
                len: resource.len(),
                modified: resource.modified(),
                data: compressed.clone(),
            },
        );
        Ok(compressed)
    }
}

fn write_encoded(ctx: &mut dyn RequestContext, algorithm: Algorithm, content: &[u8]) -> Result<()> {
    mark_encoded(ctx, algorithm);
    ctx.write(content)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assetgate_core::BufferedContext;
    use assetgate_core::config::DenyAllAliases;
    use async_compression::tokio::write::GzipDecoder;
    use std::time::{Duration, UNIX_EPOCH};
    use tokio::io::AsyncWriteExt;

    fn disk_resource(dir: &Path, name: &str) -> Resource {
        let dir = std::fs::canonicalize(dir).unwrap();
        let file = dir.join(name);
        let metadata = std::fs::metadata(&file).unwrap();
        Resource::file(
            format!("/{}", name),
            file.clone(),
            file,
            dir,
            metadata.len(),
            metadata.modified().ok(),
        )
    }

    async fn gunzip(data: &[u8]) -> Vec<u8> {
        let mut decoder = GzipDecoder::new(Vec::new());
        decoder.write_all(data).await.unwrap();
        decoder.shutdown().await.unwrap();
        decoder.into_inner()
    }

    #[tokio::test]
    async fn test_prefers_sibling_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("app.js"), "original").unwrap();
        std::fs::write(dir.path().join("app.js.br"), "brotli-bytes").unwrap();
        std::fs::write(dir.path().join("app.js.gz"), "gzip-bytes").unwrap();

        let variants = PrecompressedVariants::new(CompressionLevel::Default, None);
        let resource = disk_resource(dir.path(), "app.js");

        let mut ctx = BufferedContext::get("/app.js").with_header("Accept-Encoding", "gzip, br");
        variants.deliver(&mut ctx, &resource, "text/javascript").await.unwrap();
        assert_eq!(ctx.body(), b"brotli-bytes");
        assert_eq!(ctx.response_header("content-encoding"), Some("br"));

        let mut ctx = BufferedContext::get("/app.js").with_header("Accept-Encoding", "gzip");
        variants.deliver(&mut ctx, &resource, "text/javascript").await.unwrap();
        assert_eq!(ctx.body(), b"gzip-bytes");
        assert_eq!(variants.cached(), 0);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_sibling_links_follow_the_alias_policy() {
        let outside = tempfile::tempdir().unwrap();
        std::fs::write(outside.path().join("secret"), "TOP-SECRET").unwrap();

        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("app.js"), "original").unwrap();
        std::os::unix::fs::symlink(outside.path().join("secret"), dir.path().join("app.js.gz")).unwrap();
        let resource = disk_resource(dir.path(), "app.js");

        let denied = PrecompressedVariants::new(CompressionLevel::None, Some(AliasCheckRef::new(DenyAllAliases)));
        let mut ctx = BufferedContext::get("/app.js").with_header("Accept-Encoding", "gzip");
        denied.deliver(&mut ctx, &resource, "text/javascript").await.unwrap();
        assert_eq!(ctx.body(), b"original");
        assert_eq!(ctx.response_header("content-encoding"), None);

        // Without a check, a link leaving the root is ignored as well
        let default = PrecompressedVariants::new(CompressionLevel::None, None);
        let mut ctx = BufferedContext::get("/app.js").with_header("Accept-Encoding", "gzip");
        default.deliver(&mut ctx, &resource, "text/javascript").await.unwrap();
        assert_eq!(ctx.body(), b"original");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_sibling_link_inside_root_is_served() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("app.js"), "original").unwrap();
        std::fs::create_dir(dir.path().join("build")).unwrap();
        std::fs::write(dir.path().join("build/app.js.gz"), "gzip-bytes").unwrap();
        std::os::unix::fs::symlink(dir.path().join("build/app.js.gz"), dir.path().join("app.js.gz")).unwrap();
        let resource = disk_resource(dir.path(), "app.js");

        let variants = PrecompressedVariants::new(CompressionLevel::None, None);
        let mut ctx = BufferedContext::get("/app.js").with_header("Accept-Encoding", "gzip");
        variants.deliver(&mut ctx, &resource, "text/javascript").await.unwrap();
        assert_eq!(ctx.body(), b"gzip-bytes");
    }

    #[tokio::test]
    async fn test_generates_and_caches_variant() {
        let dir = tempfile::tempdir().unwrap();
        let text = "body { color: red; }\n".repeat(100);
        std::fs::write(dir.path().join("site.css"), &text).unwrap();

        let variants = PrecompressedVariants::new(CompressionLevel::Default, None);
        let resource = disk_resource(dir.path(), "site.css");

        for _ in 0..2 {
            let mut ctx = BufferedContext::get("/site.css").with_header("Accept-Encoding", "gzip");
            variants.deliver(&mut ctx, &resource, "text/css").await.unwrap();
            assert_eq!(ctx.response_header("content-encoding"), Some("gzip"));
            assert_eq!(gunzip(ctx.body()).await, text.as_bytes());
        }
        assert_eq!(variants.cached(), 1);
    }

    #[tokio::test]
    async fn test_changed_file_replaces_cached_variant() {
        let variants = PrecompressedVariants::new(CompressionLevel::Default, None);

        for (secs, text) in [(1, "first version"), (2, "second, longer version"), (3, "third")] {
            let body = text.repeat(20);
            let resource = Resource::memory(
                "/site.css",
                Bytes::from(body.clone()),
                Some(UNIX_EPOCH + Duration::from_secs(secs)),
            );
            let mut ctx = BufferedContext::get("/site.css").with_header("Accept-Encoding", "gzip");
            variants.deliver(&mut ctx, &resource, "text/css").await.unwrap();
            assert_eq!(gunzip(ctx.body()).await, body.as_bytes());
        }
        assert_eq!(variants.cached(), 1);
    }

    #[tokio::test]
    async fn test_falls_back_to_original() {
        let variants = PrecompressedVariants::new(CompressionLevel::Default, None);
        let resource = Resource::memory("/logo.png", Bytes::from_static(b"\x89PNG"), None);

        let mut no_accept = BufferedContext::get("/logo.png");
        variants.deliver(&mut no_accept, &resource, "image/png").await.unwrap();
        assert_eq!(no_accept.body(), b"\x89PNG");
        assert_eq!(no_accept.response_header("content-encoding"), None);

        let mut png = BufferedContext::get("/logo.png").with_header("Accept-Encoding", "gzip");
        variants.deliver(&mut png, &resource, "image/png").await.unwrap();
        assert_eq!(png.body(), b"\x89PNG");
        assert_eq!(variants.cached(), 0);
    }
}
