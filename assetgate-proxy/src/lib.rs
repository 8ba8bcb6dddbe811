//! Assetgate HTTP Front End
//!
//! Bridges Pingora sessions to the static root registry.

pub mod server;

pub use server::{Reply, StaticProxy};
