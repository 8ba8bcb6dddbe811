//! Assetgate Core Library
//!
//! Shared building blocks for the Assetgate static resource server:
//! the error taxonomy, configuration types and loading, the request
//! context seam and the resolved resource handle.

pub mod config;
pub mod context;
pub mod error;
pub mod resource;

pub use context::{BufferedContext, RequestContext};
pub use error::{Error, Result};
pub use resource::Resource;

/// Assetgate version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
