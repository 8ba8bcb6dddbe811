//! Configuration for Assetgate

mod alias;
mod loader;
mod types;

pub use alias::{AliasCheck, AliasCheckRef, AllowAllAliases, DenyAllAliases, SymlinksWithinRoot};
pub use loader::ConfigLoader;
pub use types::*;
