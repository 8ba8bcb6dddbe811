//! Embedded asset bundles
//!
//! Files compiled into the binary (via `rust-embed`) or registered at runtime
//! live in one process-wide store addressed by slash-separated keys, e.g.
//! `public/index.html` or `META-INF/resources/webjars/jquery/3.7.1/jquery.js`.
//! Roots with an embedded location serve a directory of this store.

use bytes::Bytes;
use parking_lot::RwLock;
use rust_embed::RustEmbed;
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

#[derive(Debug, Clone)]
struct EmbeddedFile {
    data: Bytes,
    modified: Option<SystemTime>,
}

/// In-process store of embedded files
#[derive(Debug, Default)]
pub struct EmbeddedAssets {
    files: RwLock<BTreeMap<String, EmbeddedFile>>,
}

impl EmbeddedAssets {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or replace) a single file
    pub fn insert(&self, path: &str, data: impl Into<Bytes>) {
        self.files.write().insert(
            normalize_key(path),
            EmbeddedFile {
                data: data.into(),
                modified: None,
            },
        );
    }

    /// Add every file of a `rust-embed` bundle under `prefix`.
    ///
    /// Returns the number of files added.
    pub fn mount<E: RustEmbed>(&self, prefix: &str) -> usize {
        let prefix = normalize_key(prefix);
        let mut files = self.files.write();
        let mut count = 0;

        for name in E::iter() {
            let Some(file) = E::get(&name) else {
                continue;
            };
            let data = match file.data {
                Cow::Borrowed(bytes) => Bytes::from_static(bytes),
                Cow::Owned(bytes) => Bytes::from(bytes),
            };
            let modified = file
                .metadata
                .last_modified()
                .map(|secs| UNIX_EPOCH + Duration::from_secs(secs));

            files.insert(join_key(&prefix, &name), EmbeddedFile { data, modified });
            count += 1;
        }

        tracing::debug!("📦 Mounted {} embedded file(s) under '{}'", count, prefix);
        count
    }

    /// Content and modification time of a file
    pub fn get(&self, path: &str) -> Option<(Bytes, Option<SystemTime>)> {
        self.files
            .read()
            .get(&normalize_key(path))
            .map(|f| (f.data.clone(), f.modified))
    }

    /// Whether any file lives below `path`
    pub fn is_dir(&self, path: &str) -> bool {
        let key = normalize_key(path);
        let files = self.files.read();

        if key.is_empty() {
            return !files.is_empty();
        }
        let prefix = format!("{}/", key);
        files
            .range(prefix.clone()..)
            .next()
            .is_some_and(|(k, _)| k.starts_with(&prefix))
    }

    /// Number of files
    pub fn len(&self) -> usize {
        self.files.read().len()
    }

    /// Whether the store is empty
    pub fn is_empty(&self) -> bool {
        self.files.read().is_empty()
    }
}

/// Canonical key form: no leading, trailing or doubled slashes
pub(crate) fn normalize_key(path: &str) -> String {
    path.split('/')
        .filter(|s| !s.is_empty() && *s != ".")
        .collect::<Vec<_>>()
        .join("/")
}

pub(crate) fn join_key(prefix: &str, rest: &str) -> String {
    let prefix = normalize_key(prefix);
    let rest = normalize_key(rest);
    match (prefix.is_empty(), rest.is_empty()) {
        (true, _) => rest,
        (_, true) => prefix,
        _ => format!("{}/{}", prefix, rest),
    }
}
