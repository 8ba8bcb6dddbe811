//! Welcome file fallback

use assetgate_core::{Resource, Result};
use async_trait::async_trait;

/// The only welcome file
pub const WELCOME_FILE: &str = "index.html";

/// Something that resolves a request path to a guarded resource
#[async_trait]
pub trait Lookup: Send + Sync {
    async fn lookup(&self, path: &str) -> Result<Option<Resource>>;
}

/// Resolve `target`, falling back to `<target>/index.html` once when the
/// target is missing or a directory. Only files are returned.
pub async fn resolve_with_welcome<L: Lookup + ?Sized>(lookup: &L, target: &str) -> Result<Option<Resource>> {
    if let Some(resource) = lookup.lookup(target).await? {
        if resource.is_file() {
            return Ok(Some(resource));
        }
    }

    let index = format!("{}/{}", target.trim_end_matches('/'), WELCOME_FILE);
    Ok(lookup.lookup(&index).await?.filter(Resource::is_file))
}
