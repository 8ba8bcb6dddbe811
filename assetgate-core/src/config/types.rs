//! Configuration type definitions
//!
//! These types represent the runtime configuration for Assetgate.

use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use super::alias::{AliasCheck, AliasCheckRef};
use crate::context::RequestContext;

/// Directory name that switches a root to webjar resolution
pub const WEBJARS_DIRECTORY: &str = "META-INF/resources/webjars";

/// Root configuration for Assetgate
#[derive(Debug, Clone, Deserialize)]
pub struct AssetgateConfig {
    /// Listen addresses
    #[serde(default = "default_listen")]
    pub listen: Vec<String>,

    /// Compression settings shared by every root
    #[serde(default)]
    pub compression: CompressionConfig,

    /// Static roots, tried in this order
    #[serde(default)]
    pub static_files: Vec<StaticFileConfig>,

    /// Global logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for AssetgateConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            compression: CompressionConfig::default(),
            static_files: Vec::new(),
            logging: LoggingConfig::default(),
        }
    }
}

fn default_listen() -> Vec<String> {
    vec!["0.0.0.0:8080".to_string()]
}

/// Where a root's directory lives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Location {
    /// Inside the asset bundles embedded in the process
    #[default]
    #[serde(alias = "classpath")]
    Embedded,
    /// On the filesystem
    #[serde(alias = "external")]
    Filesystem,
}

/// Predicate deciding whether a root sits out a request
#[derive(Clone)]
pub struct SkipFileFunction(Arc<dyn Fn(&dyn RequestContext) -> bool + Send + Sync>);

impl SkipFileFunction {
    /// Wrap a predicate
    pub fn new(f: impl Fn(&dyn RequestContext) -> bool + Send + Sync + 'static) -> Self {
        Self(Arc::new(f))
    }

    /// Never skip
    pub fn never() -> Self {
        Self::new(|_| false)
    }

    /// Evaluate for a request
    pub fn should_skip(&self, ctx: &dyn RequestContext) -> bool {
        (self.0)(ctx)
    }
}

impl Default for SkipFileFunction {
    fn default() -> Self {
        Self::never()
    }
}

impl fmt::Debug for SkipFileFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SkipFileFunction(..)")
    }
}

/// One static root
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StaticFileConfig {
    /// Directory to serve, on disk or inside the embedded bundles
    pub directory: String,

    /// Where `directory` lives
    pub location: Location,

    /// URL prefix the directory is mounted at
    pub hosted_path: String,

    /// Headers added to every response from this root
    pub headers: BTreeMap<String, String>,

    /// Mime type overrides keyed by file extension
    pub mime_types: HashMap<String, String>,

    /// Serve compressed variants prepared ahead of time
    pub precompress: bool,

    /// Per-request opt out
    #[serde(skip)]
    pub skip_file_function: SkipFileFunction,

    /// Alias policy; `None` keeps the default behavior
    #[serde(deserialize_with = "super::alias::deserialize_alias_check")]
    pub alias_check: Option<AliasCheckRef>,
}

impl Default for StaticFileConfig {
    fn default() -> Self {
        let mut headers = BTreeMap::new();
        headers.insert("Cache-Control".to_string(), "max-age=0".to_string());

        Self {
            directory: "/public".to_string(),
            location: Location::Embedded,
            hosted_path: "/".to_string(),
            headers,
            mime_types: HashMap::new(),
            precompress: false,
            skip_file_function: SkipFileFunction::never(),
            alias_check: None,
        }
    }
}

impl StaticFileConfig {
    /// Serve a directory on disk
    pub fn filesystem(directory: impl Into<String>) -> Self {
        Self {
            directory: directory.into(),
            location: Location::Filesystem,
            ..Default::default()
        }
    }

    /// Serve a directory from the embedded bundles
    pub fn embedded(directory: impl Into<String>) -> Self {
        Self {
            directory: directory.into(),
            location: Location::Embedded,
            ..Default::default()
        }
    }

    /// Serve webjars at `/webjars`
    pub fn webjars() -> Self {
        Self {
            directory: WEBJARS_DIRECTORY.to_string(),
            location: Location::Embedded,
            hosted_path: "/webjars".to_string(),
            ..Default::default()
        }
    }

    /// Mount under a URL prefix
    pub fn hosted_at(mut self, path: impl Into<String>) -> Self {
        self.hosted_path = path.into();
        self
    }

    /// Add a response header
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Override the mime type for an extension
    pub fn with_mime_type(mut self, extension: impl Into<String>, mime: impl Into<String>) -> Self {
        self.mime_types.insert(extension.into(), mime.into());
        self
    }

    /// Enable precompressed delivery
    pub fn with_precompress(mut self, enable: bool) -> Self {
        self.precompress = enable;
        self
    }

    /// Skip this root for requests matching `f`
    pub fn skip_when(
        mut self,
        f: impl Fn(&dyn RequestContext) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.skip_file_function = SkipFileFunction::new(f);
        self
    }

    /// Install an alias check
    pub fn with_alias_check(mut self, check: impl AliasCheck + 'static) -> Self {
        self.alias_check = Some(AliasCheckRef::new(check));
        self
    }

    /// Whether this root resolves webjars
    pub fn is_webjars(&self) -> bool {
        self.directory == WEBJARS_DIRECTORY
    }
}

/// Compression level
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompressionLevel {
    /// No compression
    None,
    /// Fast compression
    Fast,
    /// Default compression
    #[default]
    Default,
    /// Best compression (slower)
    Best,
}

/// Compression settings
#[derive(Debug, Clone, Deserialize)]
pub struct CompressionConfig {
    /// Compress responses on the fly
    #[serde(default = "default_bool_true")]
    pub enabled: bool,

    /// Encoder level
    #[serde(default)]
    pub level: CompressionLevel,

    /// Bodies smaller than this are sent as is
    #[serde(default = "default_min_size")]
    pub min_size: usize,
}

impl Default for CompressionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            level: CompressionLevel::Default,
            min_size: default_min_size(),
        }
    }
}

fn default_bool_true() -> bool {
    true
}

fn default_min_size() -> usize {
    1500
}

/// Global logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level used when `RUST_LOG` is not set
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}
