//! Configuration management for the DocShelf daemon.
//!
//! This module provides TOML-based configuration file loading and saving.
//! The default configuration path is `~/.config/docshelf/config.toml`.

use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::files::service::DEFAULT_MAX_TEXT_PREVIEW_BYTES;
use crate::files::tree::DEFAULT_MAX_DEPTH;

/// Default HTTP listen address.
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:5080";

/// Upper bound accepted for `documents.max_tree_depth`.
pub const MAX_TREE_DEPTH_LIMIT: usize = 4096;

/// Configuration validation errors.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("bind_addr must be a socket address like 127.0.0.1:5080, got {0}")]
    InvalidBindAddr(String),

    #[error("documents path must not be empty")]
    EmptyDocumentsPath,

    #[error("max_tree_depth must be between 1 and 4096, got {0}")]
    InvalidMaxTreeDepth(usize),

    #[error("max_text_preview_bytes must be greater than 0, got {0}")]
    InvalidPreviewLimit(u64),

    #[error("log_level must be one of: trace, debug, info, warn, error; got {0}")]
    InvalidLogLevel(String),
}

/// Valid log level values for tracing configuration.
const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Main configuration structure for the DocShelf daemon.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    /// HTTP server configuration.
    pub server: ServerConfig,

    /// Documents root configuration.
    pub documents: DocumentsConfig,

    /// Logging configuration.
    pub logging: LoggingConfig,
}

/// HTTP server configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    /// Address the HTTP listener binds to.
    pub bind_addr: String,

    /// Send `Access-Control-Allow-Origin: *` on every response.
    pub cors_allow_any: bool,
}

/// Documents root configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DocumentsConfig {
    /// Directory served to clients. Created on startup if absent.
    pub path: PathBuf,

    /// Directory levels enumerated when building the tree.
    pub max_tree_depth: usize,

    /// Largest text file returned inline by the preview endpoint.
    pub max_text_preview_bytes: u64,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Logging level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Directory for daily-rolling log files. Console only when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_dir: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            cors_allow_any: true,
        }
    }
}

impl Default for DocumentsConfig {
    fn default() -> Self {
        Self {
            path: default_documents_dir(),
            max_tree_depth: DEFAULT_MAX_DEPTH,
            max_text_preview_bytes: DEFAULT_MAX_TEXT_PREVIEW_BYTES,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_dir: None,
        }
    }
}

/// Returns the default configuration file path.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("docshelf")
        .join("config.toml")
}

/// Returns the default documents directory.
fn default_documents_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("docshelf")
        .join("Documents")
}

impl Config {
    /// Apply environment variable overrides to the configuration.
    ///
    /// Environment variables take precedence over config file values.
    /// Supported variables:
    /// - DOCSHELF_DOCUMENTS_PATH: Override the documents root
    /// - DOCSHELF_BIND_ADDR: Override the HTTP listen address
    /// - DOCSHELF_LOG_LEVEL: Override log level (trace, debug, info, warn, error)
    pub fn apply_env_overrides(&mut self) {
        if let Ok(path) = std::env::var("DOCSHELF_DOCUMENTS_PATH") {
            if !path.is_empty() {
                tracing::info!("Overriding documents path from environment: {}", path);
                self.documents.path = PathBuf::from(path);
            }
        }

        if let Ok(addr) = std::env::var("DOCSHELF_BIND_ADDR") {
            if !addr.is_empty() {
                tracing::info!("Overriding bind_addr from environment: {}", addr);
                self.server.bind_addr = addr;
            }
        }

        if let Ok(level) = std::env::var("DOCSHELF_LOG_LEVEL") {
            if !level.is_empty() {
                tracing::info!("Overriding log_level from environment: {}", level);
                self.logging.log_level = level;
            }
        }
    }

    /// Validate the configuration values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.bind_addr.parse::<SocketAddr>().is_err() {
            return Err(ConfigError::InvalidBindAddr(self.server.bind_addr.clone()));
        }

        if self.documents.path.as_os_str().is_empty() {
            return Err(ConfigError::EmptyDocumentsPath);
        }

        let depth = self.documents.max_tree_depth;
        if !(1..=MAX_TREE_DEPTH_LIMIT).contains(&depth) {
            return Err(ConfigError::InvalidMaxTreeDepth(depth));
        }

        if self.documents.max_text_preview_bytes == 0 {
            return Err(ConfigError::InvalidPreviewLimit(
                self.documents.max_text_preview_bytes,
            ));
        }

        let level = self.logging.log_level.to_lowercase();
        if !VALID_LOG_LEVELS.contains(&level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(self.logging.log_level.clone()));
        }

        Ok(())
    }

    /// Parsed listen address. Call [`Config::validate`] first.
    pub fn bind_addr(&self) -> Result<SocketAddr> {
        self.server
            .bind_addr
            .parse::<SocketAddr>()
            .map_err(|_| ConfigError::InvalidBindAddr(self.server.bind_addr.clone()).into())
    }

    /// Create the documents directory if needed and return its canonical path.
    pub fn ensure_documents_root(&self) -> Result<PathBuf> {
        let path = &self.documents.path;

        if !path.exists() {
            tracing::info!("Creating documents directory {:?}", path);
        }
        fs::create_dir_all(path).with_context(|| {
            format!("Failed to create documents directory: {}", path.display())
        })?;

        fs::canonicalize(path)
            .with_context(|| format!("Failed to resolve documents directory: {}", path.display()))
    }

    /// Load configuration from a file.
    ///
    /// If the file does not exist, returns the default configuration.
    /// If the file exists but is invalid TOML, returns an error with
    /// a helpful message.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            tracing::debug!("Config file not found at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::from_toml(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Load configuration from the default path.
    pub fn load_default() -> Result<Self> {
        Self::load(default_config_path())
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        toml::from_str(toml_str)
            .map_err(|e| anyhow::anyhow!("Invalid TOML configuration: {}", format_toml_error(&e)))
    }

    /// Save configuration to a file.
    ///
    /// Creates parent directories if they don't exist.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let contents = self.to_toml()?;
        fs::write(path, contents)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        tracing::debug!("Configuration saved to {:?}", path);
        Ok(())
    }

    /// Serialize configuration to a TOML string.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")
    }
}

/// Format a TOML deserialization error for user-friendly display.
fn format_toml_error(error: &toml::de::Error) -> String {
    let mut msg = error.message().to_string();

    if let Some(span) = error.span() {
        msg.push_str(&format!(" (at position {}..{})", span.start, span.end));
    }

    msg
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::TempDir;

    fn clear_env() {
        std::env::remove_var("DOCSHELF_DOCUMENTS_PATH");
        std::env::remove_var("DOCSHELF_BIND_ADDR");
        std::env::remove_var("DOCSHELF_LOG_LEVEL");
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.server.bind_addr, "127.0.0.1:5080");
        assert!(config.server.cors_allow_any);
        assert_eq!(config.documents.max_tree_depth, 32);
        assert_eq!(config.documents.max_text_preview_bytes, 10 * 1024 * 1024);
        assert!(config.documents.path.ends_with("docshelf/Documents"));
        assert_eq!(config.logging.log_level, "info");
        assert!(config.logging.log_dir.is_none());
    }

    #[test]
    fn test_from_toml_empty() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_from_toml_partial() {
        let toml = r#"
[documents]
path = "/srv/docs"

[logging]
log_level = "debug"
"#;
        let config = Config::from_toml(toml).unwrap();

        assert_eq!(config.documents.path, PathBuf::from("/srv/docs"));
        assert_eq!(config.logging.log_level, "debug");
        // Other values should be defaults
        assert_eq!(config.server.bind_addr, DEFAULT_BIND_ADDR);
        assert_eq!(config.documents.max_tree_depth, DEFAULT_MAX_DEPTH);
    }

    #[test]
    fn test_from_toml_full() {
        let toml = r#"
[server]
bind_addr = "0.0.0.0:8080"
cors_allow_any = false

[documents]
path = "/srv/docs"
max_tree_depth = 8
max_text_preview_bytes = 4096

[logging]
log_level = "trace"
log_dir = "/var/log/docshelf"
"#;
        let config = Config::from_toml(toml).unwrap();

        assert_eq!(config.server.bind_addr, "0.0.0.0:8080");
        assert!(!config.server.cors_allow_any);
        assert_eq!(config.documents.path, PathBuf::from("/srv/docs"));
        assert_eq!(config.documents.max_tree_depth, 8);
        assert_eq!(config.documents.max_text_preview_bytes, 4096);
        assert_eq!(config.logging.log_level, "trace");
        assert_eq!(
            config.logging.log_dir,
            Some(PathBuf::from("/var/log/docshelf"))
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_toml_invalid_syntax() {
        let toml = r#"
[documents
path = "/srv/docs"
"#;
        let result = Config::from_toml(toml);
        assert!(result.is_err());
        let err = result.unwrap_err().to_string();
        assert!(err.contains("Invalid TOML"));
    }

    #[test]
    fn test_from_toml_wrong_type() {
        let toml = r#"
[documents]
max_tree_depth = "deep"
"#;
        assert!(Config::from_toml(toml).is_err());
    }

    #[test]
    fn test_to_toml_roundtrip() {
        let mut original = Config::default();
        original.documents.path = PathBuf::from("/data/documents");
        original.logging.log_dir = Some(PathBuf::from("/var/log/docshelf"));

        let toml = original.to_toml().unwrap();
        assert!(toml.contains("[server]"));
        assert!(toml.contains("[documents]"));
        assert!(toml.contains("[logging]"));

        let loaded = Config::from_toml(&toml).unwrap();
        assert_eq!(original, loaded);
    }

    #[test]
    fn test_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("nested/config.toml");

        let mut config = Config::default();
        config.server.bind_addr = "127.0.0.1:9999".to_string();
        config.save(&config_path).unwrap();

        let loaded = Config::load(&config_path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config = Config::load(temp_dir.path().join("missing.toml")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_load_invalid_file_mentions_path() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("bad.toml");
        fs::write(&config_path, "[server").unwrap();

        let err = Config::load(&config_path).unwrap_err();
        assert!(format!("{:#}", err).contains("bad.toml"));
    }

    #[test]
    fn test_validate_default_config() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_validate_bind_addr() {
        let mut config = Config::default();
        config.server.bind_addr = "localhost".to_string();
        assert_eq!(
            config.validate(),
            Err(ConfigError::InvalidBindAddr("localhost".to_string()))
        );
        assert!(config.bind_addr().is_err());
    }

    #[test]
    fn test_validate_empty_documents_path() {
        let mut config = Config::default();
        config.documents.path = PathBuf::new();
        assert_eq!(config.validate(), Err(ConfigError::EmptyDocumentsPath));
    }

    #[test]
    fn test_validate_tree_depth_bounds() {
        let mut config = Config::default();

        config.documents.max_tree_depth = 0;
        assert_eq!(config.validate(), Err(ConfigError::InvalidMaxTreeDepth(0)));

        config.documents.max_tree_depth = 4097;
        assert_eq!(
            config.validate(),
            Err(ConfigError::InvalidMaxTreeDepth(4097))
        );

        config.documents.max_tree_depth = 4096;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_preview_limit() {
        let mut config = Config::default();
        config.documents.max_text_preview_bytes = 0;
        assert_eq!(config.validate(), Err(ConfigError::InvalidPreviewLimit(0)));
    }

    #[test]
    fn test_validate_log_level() {
        let mut config = Config::default();
        config.logging.log_level = "WARN".to_string();
        assert!(config.validate().is_ok());

        config.logging.log_level = "verbose".to_string();
        assert_eq!(
            config.validate(),
            Err(ConfigError::InvalidLogLevel("verbose".to_string()))
        );
    }

    #[test]
    fn test_ensure_documents_root_creates_directory() {
        let temp_dir = TempDir::new().unwrap();
        let mut config = Config::default();
        config.documents.path = temp_dir.path().join("a/b/Documents");

        let root = config.ensure_documents_root().unwrap();
        assert!(root.is_dir());
        assert!(root.is_absolute());

        // Second call is a no-op
        assert_eq!(config.ensure_documents_root().unwrap(), root);
    }

    #[test]
    #[serial]
    fn test_env_override_documents_path() {
        clear_env();
        std::env::set_var("DOCSHELF_DOCUMENTS_PATH", "/tmp/override-docs");

        let mut config = Config::default();
        config.apply_env_overrides();

        assert_eq!(config.documents.path, PathBuf::from("/tmp/override-docs"));

        clear_env();
    }

    #[test]
    #[serial]
    fn test_env_override_bind_and_log_level() {
        clear_env();
        std::env::set_var("DOCSHELF_BIND_ADDR", "0.0.0.0:7000");
        std::env::set_var("DOCSHELF_LOG_LEVEL", "debug");

        let mut config = Config::default();
        config.apply_env_overrides();

        assert_eq!(config.server.bind_addr, "0.0.0.0:7000");
        assert_eq!(config.logging.log_level, "debug");

        clear_env();
    }

    #[test]
    #[serial]
    fn test_env_override_empty_does_not_override() {
        clear_env();
        std::env::set_var("DOCSHELF_DOCUMENTS_PATH", "");
        std::env::set_var("DOCSHELF_LOG_LEVEL", "");

        let mut config = Config::default();
        let original = config.clone();
        config.apply_env_overrides();

        assert_eq!(config, original);

        clear_env();
    }

    #[test]
    #[serial]
    fn test_env_override_unset_does_not_override() {
        clear_env();

        let mut config = Config::default();
        let original = config.clone();
        config.apply_env_overrides();

        assert_eq!(config, original);
    }
}
