//! Assetgate Static Resource Module
//!
//! Serves files from any number of static roots:
//! - Filesystem, embedded bundle and webjar bases
//! - Hosted path containment and alias (symlink) checks
//! - `index.html` welcome file fallback
//! - Precompressed, on-the-fly or raw delivery
//! - Deferred registration until the server starts

pub mod alias;
pub mod compress;
pub mod delivery;
pub mod embedded;
pub mod lifecycle;
pub mod mime;
pub mod precompressed;
pub mod provider;
pub mod registry;
pub mod resolver;
pub mod welcome;
mod writer;

pub use assetgate_core::config::CompressionLevel;
pub use compress::{CompressionStrategy, NegotiatedCompression};
pub use delivery::DeliveryStrategy;
pub use embedded::EmbeddedAssets;
pub use registry::{HandlerRegistry, RegisteredRoot};
pub use welcome::WELCOME_FILE;
