//! Configuration loader

use crate::config::AssetgateConfig;
use crate::error::{Error, Result};
use std::path::Path;

/// Configuration loader for various formats
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from a file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<AssetgateConfig> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read config file {}: {}", path.display(), e)))?;

        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");

        match ext {
            "json" => Self::from_json(&content),
            "toml" => Self::from_toml(&content),
            _ => Err(Error::Config(format!("Unknown config format: {:?}", ext))),
        }
    }

    /// Parse JSON configuration
    pub fn from_json(content: &str) -> Result<AssetgateConfig> {
        serde_json::from_str(content).map_err(|e| Error::Config(format!("Invalid JSON: {}", e)))
    }

    /// Parse TOML configuration
    pub fn from_toml(content: &str) -> Result<AssetgateConfig> {
        toml::from_str(content).map_err(|e| Error::Config(format!("Invalid TOML: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CompressionLevel, Location};

    #[test]
    fn test_json_loading() {
        let json = r#"{"static_files": []}"#;
        let config = ConfigLoader::from_json(json).unwrap();
        assert!(config.static_files.is_empty());
    }

    #[test]
    fn test_toml_loading() {
        let toml = r#"
            listen = ["127.0.0.1:8081"]

            [compression]
            level = "best"
            min_size = 64

            [logging]
            level = "debug"

            [[static_files]]
            directory = "/srv/assets"
            location = "filesystem"
            hosted_path = "/assets"
            precompress = true

            [static_files.headers]
            "Cache-Control" = "public, max-age=3600"
        "#;
        let config = ConfigLoader::from_toml(toml).unwrap();
        assert_eq!(config.compression.level, CompressionLevel::Best);
        assert_eq!(config.compression.min_size, 64);
        assert_eq!(config.logging.level, "debug");

        let root = &config.static_files[0];
        assert_eq!(root.location, Location::Filesystem);
        assert_eq!(root.hosted_path, "/assets");
        assert!(root.precompress);
        assert_eq!(
            root.headers.get("Cache-Control").map(String::as_str),
            Some("public, max-age=3600")
        );
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("assetgate.json");
        std::fs::write(&path, r#"{"listen": ["127.0.0.1:1"]}"#).unwrap();
        let config = ConfigLoader::load(&path).unwrap();
        assert_eq!(config.listen, vec!["127.0.0.1:1".to_string()]);

        let yaml = dir.path().join("assetgate.yaml");
        std::fs::write(&yaml, "listen: []").unwrap();
        assert!(matches!(ConfigLoader::load(&yaml), Err(Error::Config(_))));

        assert!(ConfigLoader::load(dir.path().join("missing.json")).is_err());
    }

    #[test]
    fn test_invalid_json() {
        let err = ConfigLoader::from_json("{not json").unwrap_err();
        assert!(err.to_string().starts_with("Configuration error: Invalid JSON"));
    }
}
