//! Resolved resource handle
//!
//! A [`Resource`] is produced per request by a resource base and never
//! outlives the request. Reading the bytes is deferred until delivery.

use bytes::Bytes;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::error::Result;

/// Where the bytes of a resource live
#[derive(Debug, Clone)]
enum Content {
    /// A file on disk (the literal, non-canonical path)
    File(PathBuf),
    /// Bytes held in memory (embedded bundles)
    Memory(Bytes),
    /// A directory, which has no bytes of its own
    Directory,
    /// Nothing at this path
    Missing,
}

/// A resource resolved from a logical request path
#[derive(Debug, Clone)]
pub struct Resource {
    path: String,
    content: Content,
    real_path: Option<PathBuf>,
    base: Option<PathBuf>,
    len: u64,
    modified: Option<SystemTime>,
}

impl Resource {
    /// Nothing exists at `path`
    pub fn missing(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content: Content::Missing,
            real_path: None,
            base: None,
            len: 0,
            modified: None,
        }
    }

    /// A directory at `path`
    pub fn directory(path: impl Into<String>) -> Self {
        Self {
            content: Content::Directory,
            ..Self::missing(path)
        }
    }

    /// A file on disk.
    ///
    /// `real_path` is the canonical location; when it differs from `file`
    /// the resource is an alias.
    pub fn file(
        path: impl Into<String>,
        file: PathBuf,
        real_path: PathBuf,
        base: PathBuf,
        len: u64,
        modified: Option<SystemTime>,
    ) -> Self {
        Self {
            path: path.into(),
            content: Content::File(file),
            real_path: Some(real_path),
            base: Some(base),
            len,
            modified,
        }
    }

    /// A file held in memory
    pub fn memory(path: impl Into<String>, data: Bytes, modified: Option<SystemTime>) -> Self {
        Self {
            path: path.into(),
            len: data.len() as u64,
            content: Content::Memory(data),
            real_path: None,
            base: None,
            modified,
        }
    }

    /// Logical path this resource was resolved from
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Whether anything exists at the path
    pub fn exists(&self) -> bool {
        !matches!(self.content, Content::Missing)
    }

    /// Whether the resource is a directory
    pub fn is_dir(&self) -> bool {
        matches!(self.content, Content::Directory)
    }

    /// Whether the resource is a servable file
    pub fn is_file(&self) -> bool {
        matches!(self.content, Content::File(_) | Content::Memory(_))
    }

    /// Whether the literal location differs from the canonical one
    pub fn is_alias(&self) -> bool {
        match (&self.content, &self.real_path) {
            (Content::File(file), Some(real)) => file != real,
            _ => false,
        }
    }

    /// Literal file location, for disk-backed resources
    pub fn file_path(&self) -> Option<&Path> {
        match &self.content {
            Content::File(file) => Some(file),
            _ => None,
        }
    }

    /// Canonical file location, for disk-backed resources
    pub fn real_path(&self) -> Option<&Path> {
        self.real_path.as_deref()
    }

    /// Canonical base directory the resource was resolved under
    pub fn base(&self) -> Option<&Path> {
        self.base.as_deref()
    }

    /// Size in bytes
    pub fn len(&self) -> u64 {
        self.len
    }

    /// Whether the resource has no bytes
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Last modification time, when known
    pub fn modified(&self) -> Option<SystemTime> {
        self.modified
    }

    /// Load the full content
    pub async fn read(&self) -> Result<Bytes> {
        match &self.content {
            Content::File(file) => Ok(Bytes::from(tokio::fs::read(file).await?)),
            Content::Memory(data) => Ok(data.clone()),
            Content::Directory | Content::Missing => Err(crate::Error::Delivery(format!(
                "{} has no content",
                self.path
            ))),
        }
    }
}
