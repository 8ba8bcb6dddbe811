//! Alias guard
//!
//! Decides whether a resolved resource that is an alias (its canonical
//! location differs from the requested one) may be served.

use assetgate_core::config::AliasCheckRef;
use assetgate_core::{Error, Resource, Result};

/// Apply the alias policy to a resolved resource.
///
/// - `Ok(Some(_))`: serve it (or, for a directory, keep looking inside it)
/// - `Ok(None)`: nothing servable here
/// - `Err(Error::AliasRejected)`: the configured check refused the alias
pub fn guard(path: &str, resource: Resource, check: Option<&AliasCheckRef>) -> Result<Option<Resource>> {
    if !resource.exists() {
        return Ok(None);
    }
    if !resource.is_alias() {
        return Ok(Some(resource));
    }

    match check {
        Some(check) if check.check_alias(path, &resource) => Ok(Some(resource)),
        Some(check) => {
            tracing::debug!("🔒 Alias check '{}' refused {}", check.name(), path);
            Err(Error::AliasRejected(path.to_string()))
        }
        None if stays_inside_base(&resource) => Ok(Some(resource)),
        None => {
            tracing::debug!("🔒 Ignoring alias leaving its root: {}", path);
            Ok(None)
        }
    }
}

/// Default policy when no check is configured
fn stays_inside_base(resource: &Resource) -> bool {
    match (resource.real_path(), resource.base()) {
        (Some(real), Some(base)) => real.starts_with(base),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assetgate_core::config::{AllowAllAliases, DenyAllAliases};
    use std::path::PathBuf;

    fn link_to(target: &str) -> Resource {
        Resource::file(
            "/link.txt",
            PathBuf::from("/srv/www/link.txt"),
            PathBuf::from(target),
            PathBuf::from("/srv/www"),
            4,
            None,
        )
    }

    #[test]
    fn test_plain_and_missing_resources() {
        assert!(guard("/x", Resource::missing("/x"), None).unwrap().is_none());
        assert!(guard("/d", Resource::directory("/d"), None).unwrap().is_some());
        let deny = AliasCheckRef::new(DenyAllAliases);
        let plain = link_to("/srv/www/link.txt");
        assert!(guard("/link.txt", plain, Some(&deny)).unwrap().is_some());
    }

    #[test]
    fn test_default_policy() {
        assert!(guard("/link.txt", link_to("/srv/www/real.txt"), None).unwrap().is_some());
        assert!(guard("/link.txt", link_to("/etc/passwd"), None).unwrap().is_none());
    }

    #[test]
    fn test_configured_check() {
        let allow = AliasCheckRef::new(AllowAllAliases);
        assert!(guard("/link.txt", link_to("/etc/passwd"), Some(&allow)).unwrap().is_some());

        let deny = AliasCheckRef::new(DenyAllAliases);
        let err = guard("/link.txt", link_to("/srv/www/real.txt"), Some(&deny)).unwrap_err();
        assert!(err.is_alias_rejection());
    }
}
