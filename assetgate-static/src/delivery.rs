//! Delivery strategy selection
//!
//! Each root picks one strategy when it is built. Every strategy sets the
//! content type and validators, answers conditional requests, and then
//! writes the body its own way.

use assetgate_core::config::{AliasCheckRef, CompressionLevel};
use assetgate_core::{RequestContext, Resource, Result};
use http::StatusCode;
use std::sync::Arc;
use std::time::UNIX_EPOCH;

use crate::compress::CompressionStrategy;
use crate::mime::MimeTypes;
use crate::precompressed::PrecompressedVariants;

/// How a root writes resolved resources
pub enum DeliveryStrategy {
    /// Serve prepared compressed variants
    Precompressed(PrecompressedVariants),
    /// Compress on the fly through the compression strategy
    Dynamic(Arc<dyn CompressionStrategy>),
    /// Write the original bytes
    Raw,
}

impl DeliveryStrategy {
    /// Pick the strategy for a root; `alias_check` also guards prepared siblings
    pub fn select(
        precompress: bool,
        compression: Option<&Arc<dyn CompressionStrategy>>,
        level: CompressionLevel,
        alias_check: Option<&AliasCheckRef>,
    ) -> Self {
        match (precompress, compression) {
            (true, _) => DeliveryStrategy::Precompressed(PrecompressedVariants::new(level, alias_check.cloned())),
            (false, Some(strategy)) => DeliveryStrategy::Dynamic(strategy.clone()),
            (false, None) => DeliveryStrategy::Raw,
        }
    }

    /// Name used in logs
    pub fn name(&self) -> &'static str {
        match self {
            DeliveryStrategy::Precompressed(_) => "precompressed",
            DeliveryStrategy::Dynamic(_) => "dynamic",
            DeliveryStrategy::Raw => "raw",
        }
    }

    /// Write `resource` to the client
    pub async fn deliver(&self, ctx: &mut dyn RequestContext, resource: &Resource, mime: &MimeTypes) -> Result<()> {
        let content_type = mime.lookup(resource.path());
        let etag = etag(resource);

        ctx.set_header("ETag", &etag);
        if let Some(modified) = resource.modified() {
            ctx.set_header("Last-Modified", &httpdate::fmt_http_date(modified));
        }

        if not_modified(ctx.header("If-None-Match"), &etag) {
            ctx.set_status(StatusCode::NOT_MODIFIED);
            return Ok(());
        }

        match self {
            DeliveryStrategy::Precompressed(variants) => {
                ctx.set_header("Content-Type", &content_type);
                variants.deliver(ctx, resource, &content_type).await
            }
            DeliveryStrategy::Dynamic(compression) => {
                // The resource decides the type, whatever was set before
                ctx.remove_header("Content-Type");
                ctx.set_header("Content-Type", &content_type);
                let body = resource.read().await?;
                compression.compress_and_write(ctx, &body).await
            }
            DeliveryStrategy::Raw => {
                ctx.set_header("Content-Type", &content_type);
                let body = resource.read().await?;
                ctx.write(&body)?;
                Ok(())
            }
        }
    }
}

impl std::fmt::Debug for DeliveryStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Strong validator derived from size and modification time
pub fn etag(resource: &Resource) -> String {
    let modified = resource
        .modified()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map(|d| d.as_secs())
        .unwrap_or(0);
    format!("\"{:x}-{:x}\"", resource.len(), modified)
}

fn not_modified(if_none_match: Option<&str>, etag: &str) -> bool {
    let Some(header) = if_none_match else {
        return false;
    };
    header
        .split(',')
        .map(|t| t.trim())
        .any(|t| t == "*" || t.strip_prefix("W/").unwrap_or(t) == etag)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compress::NegotiatedCompression;
    use assetgate_core::BufferedContext;
    use bytes::Bytes;
    use std::collections::HashMap;
    use std::time::Duration;

    fn resource() -> Resource {
        Resource::memory(
            "/app.js",
            Bytes::from_static(b"console.log('hi')"),
            Some(UNIX_EPOCH + Duration::from_secs(1_700_000_000)),
        )
    }

    #[test]
    fn test_select() {
        let strategy: Arc<dyn CompressionStrategy> = Arc::new(NegotiatedCompression::default());
        assert_eq!(DeliveryStrategy::select(true, Some(&strategy), CompressionLevel::Default, None).name(), "precompressed");
        assert_eq!(DeliveryStrategy::select(false, Some(&strategy), CompressionLevel::Default, None).name(), "dynamic");
        assert_eq!(DeliveryStrategy::select(false, None, CompressionLevel::Default, None).name(), "raw");
    }

    #[tokio::test]
    async fn test_raw_delivery_sets_headers() {
        let mut ctx = BufferedContext::get("/app.js");
        DeliveryStrategy::Raw
            .deliver(&mut ctx, &resource(), &MimeTypes::default())
            .await
            .unwrap();

        assert_eq!(ctx.status(), StatusCode::OK);
        assert_eq!(ctx.body(), b"console.log('hi')");
        assert_eq!(ctx.response_header("content-type"), Some("text/javascript"));
        assert_eq!(ctx.response_header("etag"), Some(etag(&resource()).as_str()));
        assert_eq!(ctx.response_header("last-modified"), Some("Tue, 14 Nov 2023 22:13:20 GMT"));
    }

    #[tokio::test]
    async fn test_dynamic_delivery_replaces_content_type() {
        let strategy: Arc<dyn CompressionStrategy> = Arc::new(NegotiatedCompression::default());
        let delivery = DeliveryStrategy::select(false, Some(&strategy), CompressionLevel::Default, None);

        let mut overrides = HashMap::new();
        overrides.insert("js".to_string(), "application/x-custom".to_string());

        let mut ctx = BufferedContext::get("/app.js");
        ctx.set_header("Content-Type", "text/html");
        delivery.deliver(&mut ctx, &resource(), &MimeTypes::new(&overrides)).await.unwrap();

        assert_eq!(ctx.response_header("content-type"), Some("application/x-custom"));
        assert_eq!(ctx.body(), b"console.log('hi')");
    }

    #[tokio::test]
    async fn test_if_none_match() {
        let tag = etag(&resource());
        let mut ctx = BufferedContext::get("/app.js").with_header("If-None-Match", &format!("W/{}", tag));
        DeliveryStrategy::Raw
            .deliver(&mut ctx, &resource(), &MimeTypes::default())
            .await
            .unwrap();
        assert_eq!(ctx.status(), StatusCode::NOT_MODIFIED);
        assert!(ctx.body().is_empty());

        let mut stale = BufferedContext::get("/app.js").with_header("If-None-Match", "\"0-0\"");
        DeliveryStrategy::Raw
            .deliver(&mut stale, &resource(), &MimeTypes::default())
            .await
            .unwrap();
        assert_eq!(stale.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_encoded_variants_carry_weak_etag() {
        let variants = DeliveryStrategy::select(true, None, CompressionLevel::Default, None);
        let tag = etag(&resource());

        let mut identity = BufferedContext::get("/app.js");
        variants.deliver(&mut identity, &resource(), &MimeTypes::default()).await.unwrap();
        assert_eq!(identity.response_header("etag"), Some(tag.as_str()));

        let mut gzip = BufferedContext::get("/app.js").with_header("Accept-Encoding", "gzip");
        variants.deliver(&mut gzip, &resource(), &MimeTypes::default()).await.unwrap();
        assert_eq!(gzip.response_header("content-encoding"), Some("gzip"));
        let weak = gzip.response_header("etag").unwrap().to_string();
        assert_eq!(weak, format!("W/{}", tag));

        // A cached encoded response revalidates through the weak tag
        let mut revalidate = BufferedContext::get("/app.js")
            .with_header("Accept-Encoding", "gzip")
            .with_header("If-None-Match", &weak);
        variants.deliver(&mut revalidate, &resource(), &MimeTypes::default()).await.unwrap();
        assert_eq!(revalidate.status(), StatusCode::NOT_MODIFIED);
    }
}
