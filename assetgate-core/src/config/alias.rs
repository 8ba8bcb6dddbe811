//! Alias check capability
//!
//! An alias is a resource whose canonical location differs from the path
//! that was asked for, typically a symlink. A root may carry an
//! [`AliasCheck`] deciding which aliases it is willing to serve.

use serde::{Deserialize, Deserializer};
use std::fmt;
use std::sync::Arc;

use crate::resource::Resource;

/// Decides whether an aliased resource may be served
pub trait AliasCheck: Send + Sync {
    /// Return `true` to serve `resource`, which was reached through `path`
    fn check_alias(&self, path: &str, resource: &Resource) -> bool;

    /// Name used in logs
    fn name(&self) -> &str {
        "custom"
    }
}

/// Serve every alias
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAllAliases;

impl AliasCheck for AllowAllAliases {
    fn check_alias(&self, _path: &str, _resource: &Resource) -> bool {
        true
    }

    fn name(&self) -> &str {
        "allow_all"
    }
}

/// Reject every alias
#[derive(Debug, Clone, Copy, Default)]
pub struct DenyAllAliases;

impl AliasCheck for DenyAllAliases {
    fn check_alias(&self, _path: &str, _resource: &Resource) -> bool {
        false
    }

    fn name(&self) -> &str {
        "deny_all"
    }
}

/// Serve aliases whose target stays inside the root directory
#[derive(Debug, Clone, Copy, Default)]
pub struct SymlinksWithinRoot;

impl AliasCheck for SymlinksWithinRoot {
    fn check_alias(&self, _path: &str, resource: &Resource) -> bool {
        match (resource.real_path(), resource.base()) {
            (Some(real), Some(base)) => real.starts_with(base),
            _ => false,
        }
    }

    fn name(&self) -> &str {
        "symlinks_within_root"
    }
}

/// Shared handle to an alias check
#[derive(Clone)]
pub struct AliasCheckRef(Arc<dyn AliasCheck>);

impl AliasCheckRef {
    /// Wrap a check
    pub fn new(check: impl AliasCheck + 'static) -> Self {
        Self(Arc::new(check))
    }

    /// Look up a built-in check by its configuration name
    pub fn named(name: &str) -> Option<Self> {
        match name {
            "allow_all" => Some(Self::new(AllowAllAliases)),
            "deny_all" => Some(Self::new(DenyAllAliases)),
            "symlinks_within_root" => Some(Self::new(SymlinksWithinRoot)),
            _ => None,
        }
    }

    /// Run the check
    pub fn check_alias(&self, path: &str, resource: &Resource) -> bool {
        self.0.check_alias(path, resource)
    }

    /// Name used in logs
    pub fn name(&self) -> &str {
        self.0.name()
    }
}

impl fmt::Debug for AliasCheckRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("AliasCheck").field(&self.name()).finish()
    }
}

/// Deserialize an optional built-in alias check from its name
pub(crate) fn deserialize_alias_check<'de, D>(
    deserializer: D,
) -> std::result::Result<Option<AliasCheckRef>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error as _;

    let name: Option<String> = Option::deserialize(deserializer)?;
    name.map(|n| {
        AliasCheckRef::named(&n).ok_or_else(|| D::Error::custom(format!("unknown alias check: {}", n)))
    })
    .transpose()
}
