//! Resource bases
//!
//! A base is the materialized root of one static configuration: a canonical
//! directory on disk, a directory inside the embedded bundles, or the webjar
//! tree. It turns a normalized logical path into a [`Resource`].

use assetgate_core::config::{Location, StaticFileConfig, WEBJARS_DIRECTORY};
use assetgate_core::{Error, Resource, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::embedded::{EmbeddedAssets, join_key};

/// Bundle directory webjar requests are looked up in
const WEBJARS_LOOKUP_PREFIX: &str = "META-INF/resources";

/// The validated base of a static root
#[derive(Debug, Clone)]
pub enum ResourceBase {
    /// Canonical directory on disk
    Filesystem { root: PathBuf },
    /// Directory inside the embedded bundles
    Embedded {
        assets: Arc<EmbeddedAssets>,
        prefix: String,
    },
    /// Webjar tree; lookups use the raw request path
    WebJars { assets: Arc<EmbeddedAssets> },
}

impl ResourceBase {
    /// Validate and materialize the base for a configuration
    pub fn open(config: &StaticFileConfig, assets: &Arc<EmbeddedAssets>) -> Result<Self> {
        if config.is_webjars() {
            if !assets.is_dir(WEBJARS_DIRECTORY) {
                return Err(Error::Config(missing_embedded_message(WEBJARS_DIRECTORY)));
            }
            return Ok(ResourceBase::WebJars {
                assets: assets.clone(),
            });
        }

        match config.location {
            Location::Filesystem => {
                let requested = Path::new(&config.directory);
                let absolute = std::path::absolute(requested).unwrap_or_else(|_| requested.to_path_buf());
                let root = std::fs::canonicalize(&absolute).map_err(|_| {
                    Error::Config(format!(
                        "Static resource directory with path: '{}' does not exist.",
                        absolute.display()
                    ))
                })?;
                if !root.is_dir() {
                    return Err(Error::Config(format!(
                        "Static resource path '{}' is not a directory.",
                        root.display()
                    )));
                }
                Ok(ResourceBase::Filesystem { root })
            }
            Location::Embedded => {
                if !assets.is_dir(&config.directory) {
                    return Err(Error::Config(missing_embedded_message(&config.directory)));
                }
                Ok(ResourceBase::Embedded {
                    assets: assets.clone(),
                    prefix: join_key(&config.directory, ""),
                })
            }
        }
    }

    /// Whether lookups bypass hosted-path mapping
    pub fn is_webjars(&self) -> bool {
        matches!(self, ResourceBase::WebJars { .. })
    }

    /// Human readable location, for logs
    pub fn describe(&self) -> String {
        match self {
            ResourceBase::Filesystem { root } => format!("File system location: '{}'", root.display()),
            ResourceBase::Embedded { prefix, .. } => format!("Embedded location: '{}'", prefix),
            ResourceBase::WebJars { .. } => format!("Embedded location: '{}'", WEBJARS_DIRECTORY),
        }
    }

    /// Resolve a logical path below this base
    pub async fn resolve(&self, path: &str) -> Result<Resource> {
        match self {
            ResourceBase::Filesystem { root } => resolve_file(root, path).await,
            ResourceBase::Embedded { assets, prefix } => Ok(resolve_embedded(assets, prefix, path)),
            ResourceBase::WebJars { assets } => Ok(resolve_embedded(assets, WEBJARS_LOOKUP_PREFIX, path)),
        }
    }
}

fn missing_embedded_message(directory: &str) -> String {
    format!(
        "Static resource directory with path: '{}' does not exist. \
         Depending on your setup, empty folders might not get copied into the embedded bundle.",
        directory
    )
}

/// Split a logical path into segments, applying `.` and `..`.
///
/// Returns `None` when the path climbs above its base or carries a segment
/// that could be read as something other than a plain file name.
pub(crate) fn normalize_segments(path: &str) -> Option<Vec<&str>> {
    let mut segments = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop()?;
            }
            s if s.contains('\\') || s.contains('\0') => return None,
            s if cfg!(windows) && s.contains(':') => return None,
            s => segments.push(s),
        }
    }
    Some(segments)
}

async fn resolve_file(root: &Path, path: &str) -> Result<Resource> {
    let Some(segments) = normalize_segments(path) else {
        tracing::debug!("🚫 Path escapes its root: {}", path);
        return Ok(Resource::missing(path));
    };

    let literal = segments.iter().fold(root.to_path_buf(), |p, s| p.join(s));

    let metadata = match tokio::fs::metadata(&literal).await {
        Ok(m) => m,
        Err(e) => {
            tracing::trace!("{} not found: {}", literal.display(), e);
            return Ok(Resource::missing(path));
        }
    };

    if metadata.is_dir() {
        return Ok(Resource::directory(path));
    }

    let real = match tokio::fs::canonicalize(&literal).await {
        Ok(real) => real,
        Err(_) => return Ok(Resource::missing(path)),
    };

    Ok(Resource::file(
        path,
        literal,
        real,
        root.to_path_buf(),
        metadata.len(),
        metadata.modified().ok(),
    ))
}

fn resolve_embedded(assets: &EmbeddedAssets, prefix: &str, path: &str) -> Resource {
    let Some(segments) = normalize_segments(path) else {
        return Resource::missing(path);
    };
    let key = join_key(prefix, &segments.join("/"));

    if let Some((data, modified)) = assets.get(&key) {
        Resource::memory(path, data, modified)
    } else if assets.is_dir(&key) {
        Resource::directory(path)
    } else {
        Resource::missing(path)
    }
}
