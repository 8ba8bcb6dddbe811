//! Hosted path resolution
//!
//! Maps a request path onto a root's base. A root mounted at `/static`
//! only ever sees paths below `/static`; everything else is outside its
//! reach, whether or not a matching file exists in the base.

use assetgate_core::{Error, Resource, Result};

use crate::provider::ResourceBase;

/// Validate a configured hosted path and bring it to canonical form
/// (leading slash, no trailing slash unless it is `/`).
pub fn normalize_hosted_path(hosted_path: &str) -> Result<String> {
    if !hosted_path.starts_with('/') {
        return Err(Error::Config(format!(
            "Hosted path '{}' must start with '/'",
            hosted_path
        )));
    }
    let trimmed = hosted_path.trim_end_matches('/');
    Ok(if trimmed.is_empty() { "/".to_string() } else { trimmed.to_string() })
}

/// The part of `path` a root hosted at `hosted_path` resolves, if any
pub fn map_hosted_path<'a>(hosted_path: &str, path: &'a str) -> Option<&'a str> {
    if hosted_path == "/" {
        return Some(path);
    }
    if path == hosted_path {
        return Some("/");
    }
    path.strip_prefix(hosted_path).filter(|rest| rest.starts_with('/'))
}

/// Resolves request paths against one base
#[derive(Debug, Clone)]
pub struct PathResolver {
    hosted_path: String,
    base: ResourceBase,
}

impl PathResolver {
    /// Create a resolver; `hosted_path` must already be normalized
    pub fn new(hosted_path: String, base: ResourceBase) -> Self {
        Self { hosted_path, base }
    }

    /// Hosted path
    pub fn hosted_path(&self) -> &str {
        &self.hosted_path
    }

    /// Base
    pub fn base(&self) -> &ResourceBase {
        &self.base
    }

    /// Resolve a request path; outside the hosted path nothing exists
    pub async fn resolve(&self, path: &str) -> Result<Resource> {
        if self.base.is_webjars() {
            return self.base.resolve(path).await;
        }
        match map_hosted_path(&self.hosted_path, path) {
            Some(rest) => self.base.resolve(rest).await,
            None => Ok(Resource::missing(path)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedded::EmbeddedAssets;
    use assetgate_core::config::StaticFileConfig;
    use std::sync::Arc;

    #[test]
    fn test_normalize_hosted_path() {
        assert_eq!(normalize_hosted_path("/").unwrap(), "/");
        assert_eq!(normalize_hosted_path("/static/").unwrap(), "/static");
        assert_eq!(normalize_hosted_path("//").unwrap(), "/");
        assert!(normalize_hosted_path("static").is_err());
        assert!(normalize_hosted_path("").is_err());
    }

    #[test]
    fn test_map_hosted_path() {
        assert_eq!(map_hosted_path("/", "/app.js"), Some("/app.js"));
        assert_eq!(map_hosted_path("/static", "/static"), Some("/"));
        assert_eq!(map_hosted_path("/static", "/static/app.js"), Some("/app.js"));
        assert_eq!(map_hosted_path("/static", "/static/"), Some("/"));
        assert_eq!(map_hosted_path("/static", "/staticfoo/app.js"), None);
        assert_eq!(map_hosted_path("/static", "/other/app.js"), None);
        assert_eq!(map_hosted_path("/static", "/app.js"), None);
    }

    #[tokio::test]
    async fn test_containment() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("app.js"), "app()").unwrap();

        let config = StaticFileConfig::filesystem(dir.path().to_string_lossy());
        let base = ResourceBase::open(&config, &Arc::new(EmbeddedAssets::new())).unwrap();
        let resolver = PathResolver::new("/static".to_string(), base);

        assert!(resolver.resolve("/static/app.js").await.unwrap().is_file());
        assert!(resolver.resolve("/static").await.unwrap().is_dir());
        for outside in ["/app.js", "/other/app.js", "/staticapp.js", "/static/../app.js"] {
            assert!(!resolver.resolve(outside).await.unwrap().exists(), "{} resolved", outside);
        }
    }

    #[tokio::test]
    async fn test_webjars_ignore_hosted_path() {
        let assets = Arc::new(EmbeddedAssets::new());
        assets.insert("META-INF/resources/webjars/lib/1.0/lib.js", "lib()");
        let base = ResourceBase::open(&StaticFileConfig::webjars(), &assets).unwrap();
        let resolver = PathResolver::new("/webjars".to_string(), base);

        assert!(resolver.resolve("/webjars/lib/1.0/lib.js").await.unwrap().is_file());
        assert!(!resolver.resolve("/lib/1.0/lib.js").await.unwrap().exists());
    }
}
