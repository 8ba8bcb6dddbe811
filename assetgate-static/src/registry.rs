//! Static root registry
//!
//! Roots are tried in registration order and the first one that resolves a
//! request answers it. The root list is append-only and published as an
//! immutable snapshot, so requests in flight never observe a partially
//! updated list; a root appended concurrently may or may not be seen.

use arc_swap::ArcSwap;
use assetgate_core::config::{CompressionConfig, CompressionLevel, StaticFileConfig};
use assetgate_core::{RequestContext, Resource, Result};
use async_trait::async_trait;
use std::sync::Arc;

use crate::alias;
use crate::compress::{CompressionStrategy, NegotiatedCompression};
use crate::delivery::DeliveryStrategy;
use crate::embedded::EmbeddedAssets;
use crate::lifecycle::Lifecycle;
use crate::mime::MimeTypes;
use crate::provider::ResourceBase;
use crate::resolver::{PathResolver, normalize_hosted_path};
use crate::welcome::{Lookup, resolve_with_welcome};

/// One materialized static root
#[derive(Debug)]
pub struct RegisteredRoot {
    config: StaticFileConfig,
    resolver: PathResolver,
    delivery: DeliveryStrategy,
    mime: MimeTypes,
}

impl RegisteredRoot {
    /// Configuration this root was built from
    pub fn config(&self) -> &StaticFileConfig {
        &self.config
    }

    /// Hosted path, normalized
    pub fn hosted_path(&self) -> &str {
        self.resolver.hosted_path()
    }

    /// Delivery strategy
    pub fn delivery(&self) -> &DeliveryStrategy {
        &self.delivery
    }

    /// Whether this root sits out the request
    pub fn is_skipped(&self, ctx: &dyn RequestContext) -> bool {
        self.config.skip_file_function.should_skip(ctx)
    }

    /// Resolve a request path to a servable file, trying the welcome file
    pub async fn find(&self, path: &str) -> Result<Option<Resource>> {
        resolve_with_welcome(self, path).await
    }

    /// Apply this root's headers and write the resource
    pub async fn serve(&self, ctx: &mut dyn RequestContext, resource: &Resource) -> Result<()> {
        for (name, value) in &self.config.headers {
            ctx.set_header(name, value);
        }
        self.delivery.deliver(ctx, resource, &self.mime).await
    }
}

#[async_trait]
impl Lookup for RegisteredRoot {
    async fn lookup(&self, path: &str) -> Result<Option<Resource>> {
        let resource = self.resolver.resolve(path).await?;
        alias::guard(path, resource, self.config.alias_check.as_ref())
    }
}

/// Everything roots share: the embedded bundles and compression settings
struct RootFactory {
    assets: Arc<EmbeddedAssets>,
    compression: Option<Arc<dyn CompressionStrategy>>,
    level: CompressionLevel,
}

impl RootFactory {
    fn build(&self, config: StaticFileConfig) -> Result<RegisteredRoot> {
        let hosted_path = normalize_hosted_path(&config.hosted_path)?;
        let base = ResourceBase::open(&config, &self.assets)?;
        let delivery = DeliveryStrategy::select(
            config.precompress,
            self.compression.as_ref(),
            self.level,
            config.alias_check.as_ref(),
        );
        let mime = MimeTypes::new(&config.mime_types);

        tracing::info!(
            "📁 Static file handler added: directory={}, location={:?}, hosted_path={}, delivery={}, alias_check={}, headers={:?}. {}",
            config.directory,
            config.location,
            hosted_path,
            delivery.name(),
            config.alias_check.as_ref().map(|c| c.name()).unwrap_or("default"),
            config.headers,
            base.describe()
        );

        Ok(RegisteredRoot {
            config,
            resolver: PathResolver::new(hosted_path, base),
            delivery,
            mime,
        })
    }
}

/// Ordered set of static roots plus their lifecycle
pub struct HandlerRegistry {
    factory: RootFactory,
    lifecycle: Lifecycle,
    roots: ArcSwap<Vec<Arc<RegisteredRoot>>>,
}

impl HandlerRegistry {
    /// Create a registry serving embedded files from `assets`, with default
    /// on-the-fly compression
    pub fn new(assets: Arc<EmbeddedAssets>) -> Self {
        Self {
            factory: RootFactory {
                assets,
                compression: Some(Arc::new(NegotiatedCompression::default())),
                level: CompressionLevel::Default,
            },
            lifecycle: Lifecycle::new(),
            roots: ArcSwap::from_pointee(Vec::new()),
        }
    }

    /// Apply compression settings; disabled compression means raw delivery
    pub fn with_compression(mut self, config: &CompressionConfig) -> Self {
        self.factory.level = config.level;
        self.factory.compression = if config.enabled {
            Some(Arc::new(NegotiatedCompression::from_config(config)))
        } else {
            None
        };
        self
    }

    /// Use a custom compression strategy for dynamic delivery
    pub fn with_compression_strategy(mut self, strategy: Arc<dyn CompressionStrategy>) -> Self {
        self.factory.compression = Some(strategy);
        self
    }

    /// Register a root.
    ///
    /// Before [`server_started`](Self::server_started) the configuration is
    /// queued and `Ok(false)` is returned. Afterwards the root is built now,
    /// so a bad configuration fails here, and `Ok(true)` is returned.
    pub fn add_static_file_config(&self, config: StaticFileConfig) -> Result<bool> {
        self.lifecycle.submit(config, |config| self.materialize(config))
    }

    /// Start signal from the owning server: build every queued root in order
    pub fn server_started(&self) -> Result<()> {
        let count = self.lifecycle.start(|config| self.materialize(config))?;
        tracing::debug!("🚀 Materialized {} queued static root(s)", count);
        Ok(())
    }

    /// Whether the start signal has been received
    pub fn is_started(&self) -> bool {
        self.lifecycle.is_active()
    }

    /// Snapshot of the registered roots
    pub fn roots(&self) -> Arc<Vec<Arc<RegisteredRoot>>> {
        self.roots.load_full()
    }

    fn materialize(&self, config: StaticFileConfig) -> Result<()> {
        let root = Arc::new(self.factory.build(config)?);
        self.roots.rcu(|roots| {
            let mut next = Vec::with_capacity(roots.len() + 1);
            next.extend(roots.iter().cloned());
            next.push(root.clone());
            next
        });
        Ok(())
    }

    /// Whether some root owns this request.
    ///
    /// An alias rejection counts: the registry owns the decision to 404 it.
    pub async fn can_handle(&self, ctx: &dyn RequestContext) -> bool {
        let path = ctx.path();
        for root in self.roots().iter() {
            if root.is_skipped(ctx) {
                continue;
            }
            match root.find(path).await {
                Ok(Some(_)) => return true,
                Ok(None) => {}
                Err(e) if e.is_alias_rejection() => return true,
                Err(e) => tracing::debug!("Static root {} could not resolve {}: {}", root.hosted_path(), path, e),
            }
        }
        false
    }

    /// Serve the request from the first root that resolves it.
    ///
    /// Returns `false` when no root did; answering 404 is up to the caller.
    pub async fn handle(&self, ctx: &mut dyn RequestContext) -> bool {
        let path = ctx.path().to_string();

        for root in self.roots().iter() {
            if root.is_skipped(&*ctx) {
                continue;
            }

            let resource = match root.find(&path).await {
                Ok(Some(resource)) => resource,
                Ok(None) => continue,
                Err(e) if e.is_alias_rejection() => {
                    tracing::info!("🔒 {} (root {})", e, root.hosted_path());
                    continue;
                }
                Err(e) => {
                    tracing::info!("⚠️ Failed to resolve static resource {}: {}", path, e);
                    continue;
                }
            };

            match root.serve(ctx, &resource).await {
                Ok(()) => return true,
                Err(e) if e.is_disconnect() => return true,
                Err(e) => {
                    tracing::info!("⚠️ Exception occurred while handling static resource {}: {:?}", path, e);
                    // The next root starts from a clean response
                    ctx.reset_response();
                }
            }
        }

        false
    }
}

impl std::fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("started", &self.is_started())
            .field("roots", &self.roots().len())
            .finish()
    }
}
