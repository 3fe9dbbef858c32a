// File: src/config.rs
// Purpose: Configuration parsing from jsweb.toml

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Application configuration
///
/// Routing carries this through to every request untouched. `testing` and
/// `debug` are read by handlers and by the application's error responses,
/// never by matching.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub debug: bool,

    #[serde(default)]
    pub testing: bool,

    #[serde(default)]
    pub secret_key: Option<String>,

    #[serde(default)]
    pub database_url: Option<String>,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub routing: RoutingConfig,

    #[serde(default)]
    pub static_files: StaticFilesConfig,

    /// Any other top-level keys, kept for handlers and extensions
    #[serde(flatten)]
    pub extra: toml::Table,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_host")]
    pub host: String,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// One of `trace`, `debug`, `info`, `warn`, `error` (default: "info")
    #[serde(default = "default_level")]
    pub level: String,
}

/// Routing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingConfig {
    /// Request targets longer than this are answered as not found
    #[serde(default = "default_max_path_length")]
    pub max_path_length: usize,
}

/// Static file configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StaticFilesConfig {
    /// URL prefix the directory is mounted under (default: "/static")
    #[serde(default = "default_static_url")]
    pub url: String,

    /// Directory to serve; nothing is mounted when unset
    #[serde(default)]
    pub dir: Option<PathBuf>,
}

// Default values
fn default_port() -> u16 {
    8000
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_level() -> String {
    "info".to_string()
}

fn default_max_path_length() -> usize {
    2048
}

fn default_static_url() -> String {
    "/static".to_string()
}

// Default implementations
impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
        }
    }
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            max_path_length: default_max_path_length(),
        }
    }
}

impl Default for StaticFilesConfig {
    fn default() -> Self {
        Self {
            url: default_static_url(),
            dir: None,
        }
    }
}

impl Config {
    /// Load configuration from jsweb.toml
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        // If file doesn't exist or is empty, return default config
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path))?;

        Ok(config)
    }

    /// Load configuration from default path (./jsweb.toml)
    pub fn load_default() -> Result<Self> {
        Self::load("jsweb.toml")
    }

    /// Configuration used by test suites: `testing` on, fixed secret key
    pub fn for_testing() -> Self {
        Self {
            testing: true,
            secret_key: Some("test-secret-key".to_string()),
            database_url: Some("sqlite::memory:".to_string()),
            ..Self::default()
        }
    }

    /// Applies `JSWEB_TESTING` and `JSWEB_DEBUG` from the environment
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides_from(|key| std::env::var(key).ok())
    }

    fn with_overrides_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(testing) = lookup("JSWEB_TESTING").and_then(|v| parse_flag(&v)) {
            self.testing = testing;
        }
        if let Some(debug) = lookup("JSWEB_DEBUG").and_then(|v| parse_flag(&v)) {
            self.debug = debug;
        }
        self
    }

    /// Raw value of a key outside the known sections
    pub fn get_extra(&self, key: &str) -> Option<&toml::Value> {
        self.extra.get(key)
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.routing.max_path_length, 2048);
        assert!(config.static_files.dir.is_none());
        assert!(!config.testing);
        assert!(!config.debug);
    }

    #[test]
    fn test_empty_config() {
        let config = toml::from_str::<Config>("").unwrap_or_default();
        assert_eq!(config.server.port, 8000);
        assert!(config.extra.is_empty());
    }

    #[test]
    fn test_full_config() {
        let toml = r#"
            debug = true
            testing = true
            secret_key = "s3cret"
            database_url = "sqlite:///app.db"
            upload_dir = "uploads"

            [server]
            port = 9000

            [logging]
            level = "debug"

            [routing]
            max_path_length = 512

            [static_files]
            dir = "public"
        "#;
        let config: Config = toml::from_str(toml).unwrap();
        assert!(config.debug);
        assert!(config.testing);
        assert_eq!(config.secret_key.as_deref(), Some("s3cret"));
        assert_eq!(config.database_url.as_deref(), Some("sqlite:///app.db"));
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.routing.max_path_length, 512);
        assert_eq!(config.static_files.url, "/static");
        assert_eq!(config.static_files.dir, Some(PathBuf::from("public")));
        assert_eq!(
            config.get_extra("upload_dir").and_then(|v| v.as_str()),
            Some("uploads")
        );
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let config = Config::load("does/not/exist/jsweb.toml").unwrap();
        assert_eq!(config.server.port, 8000);
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [("JSWEB_TESTING", "1"), ("JSWEB_DEBUG", "nonsense")]
            .into_iter()
            .collect();
        let config = Config::default().with_overrides_from(|key| env.get(key).map(|v| v.to_string()));
        assert!(config.testing);
        assert!(!config.debug);
    }

    #[test]
    fn test_for_testing() {
        let config = Config::for_testing();
        assert!(config.testing);
        assert!(config.secret_key.is_some());
    }
}
