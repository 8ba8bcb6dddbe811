//! MIME type handling

use std::collections::HashMap;
use std::path::Path;

/// Fallback for unknown extensions
pub const OCTET_STREAM: &str = "application/octet-stream";

/// Get MIME type for a file extension
pub fn guess_mime_type(path: &str) -> &'static str {
    mime_guess::from_path(path).first_raw().unwrap_or(OCTET_STREAM)
}

/// Per-root mime table: configured overrides first, then the platform guess
#[derive(Debug, Clone, Default)]
pub struct MimeTypes {
    overrides: HashMap<String, String>,
}

impl MimeTypes {
    /// Build from `extension -> mime` overrides
    pub fn new(overrides: &HashMap<String, String>) -> Self {
        let overrides = overrides
            .iter()
            .map(|(ext, mime)| (ext.trim_start_matches('.').to_ascii_lowercase(), mime.clone()))
            .collect();
        Self { overrides }
    }

    /// Resolve the mime type of a path
    pub fn lookup(&self, path: &str) -> String {
        let ext = Path::new(path)
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);

        if let Some(mime) = ext.as_deref().and_then(|e| self.overrides.get(e)) {
            return mime.clone();
        }
        guess_mime_type(path).to_string()
    }
}

/// Whether compressing this content type is worth it.
///
/// Media and archive formats are already compressed.
pub fn is_compressible(mime: &str) -> bool {
    let essence = mime.split(';').next().unwrap_or("").trim().to_ascii_lowercase();

    if essence.starts_with("image/") && essence != "image/svg+xml" {
        return false;
    }
    if essence.starts_with("audio/") || essence.starts_with("video/") {
        return false;
    }
    !matches!(
        essence.as_str(),
        "application/compress"
            | "application/zip"
            | "application/gzip"
            | "application/x-gzip"
            | "application/bzip2"
            | "application/x-bzip2"
            | "application/brotli"
            | "application/zstd"
            | "application/x-xz"
            | "application/x-rar-compressed"
            | "application/x-7z-compressed"
            | "font/woff2"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mime_types() {
        assert_eq!(guess_mime_type("index.html"), "text/html");
        assert_eq!(guess_mime_type("style.css"), "text/css");
        assert_eq!(guess_mime_type("app.js"), "text/javascript");
        assert_eq!(guess_mime_type("no-extension"), OCTET_STREAM);
    }

    #[test]
    fn test_overrides() {
        let mut overrides = HashMap::new();
        overrides.insert(".Foo".to_string(), "application/x-foo".to_string());
        overrides.insert("js".to_string(), "application/javascript".to_string());
        let mime = MimeTypes::new(&overrides);

        assert_eq!(mime.lookup("/data/file.foo"), "application/x-foo");
        assert_eq!(mime.lookup("/data/FILE.FOO"), "application/x-foo");
        assert_eq!(mime.lookup("/app.js"), "application/javascript");
        assert_eq!(mime.lookup("/index.html"), "text/html");
    }

    #[test]
    fn test_compressible() {
        assert!(is_compressible("text/html; charset=utf-8"));
        assert!(is_compressible("application/json"));
        assert!(is_compressible("image/svg+xml"));
        assert!(!is_compressible("image/png"));
        assert!(!is_compressible("video/mp4"));
        assert!(!is_compressible("application/zip"));
    }
}
