//! Configuration module for filevault.

use serde::Deserialize;
use std::path::Path;

use crate::{Result, VaultError};

/// Session store backend names accepted in `[sessions] backend`.
pub const SESSION_BACKENDS: &[&str] = &["sqlite", "memory"];

/// HTTP server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port number to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
    /// CORS allowed origins. Empty allows any origin.
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origins: vec![],
        }
    }
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_db_path")]
    pub path: String,
}

fn default_db_path() -> String {
    "data/files_manager.db".to_string()
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

/// Blob storage configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct FilesConfig {
    /// Directory holding uploaded blobs and their thumbnails.
    #[serde(default = "default_storage_path")]
    pub storage_path: String,
    /// Maximum decoded upload size in megabytes.
    #[serde(default = "default_max_upload_size")]
    pub max_upload_size_mb: u64,
}

fn default_storage_path() -> String {
    "/tmp/files_manager".to_string()
}

fn default_max_upload_size() -> u64 {
    10
}

impl FilesConfig {
    /// Maximum decoded upload size in bytes.
    pub fn max_upload_bytes(&self) -> usize {
        (self.max_upload_size_mb as usize).saturating_mul(1024 * 1024)
    }
}

impl Default for FilesConfig {
    fn default() -> Self {
        Self {
            storage_path: default_storage_path(),
            max_upload_size_mb: default_max_upload_size(),
        }
    }
}

/// Session configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionsConfig {
    /// Session store backend (sqlite, memory).
    #[serde(default = "default_session_backend")]
    pub backend: String,
    /// Token lifetime in seconds.
    #[serde(default = "default_session_ttl")]
    pub ttl_secs: u64,
}

fn default_session_backend() -> String {
    "sqlite".to_string()
}

fn default_session_ttl() -> u64 {
    86400 // 24 hours
}

impl Default for SessionsConfig {
    fn default() -> Self {
        Self {
            backend: default_session_backend(),
            ttl_secs: default_session_ttl(),
        }
    }
}

/// Thumbnail worker configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ThumbnailsConfig {
    /// Total delivery attempts per job, including the first.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

fn default_max_attempts() -> u32 {
    1
}

impl Default for ThumbnailsConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Path to the log file. Empty disables file logging.
    #[serde(default = "default_log_file")]
    pub file: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_file() -> String {
    "logs/filevault.log".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: default_log_file(),
        }
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    /// HTTP server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Database configuration.
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Blob storage configuration.
    #[serde(default)]
    pub files: FilesConfig,
    /// Session configuration.
    #[serde(default)]
    pub sessions: SessionsConfig,
    /// Thumbnail worker configuration.
    #[serde(default)]
    pub thumbnails: ThumbnailsConfig,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(VaultError::Io)?;
        Self::parse(&content)
    }

    /// Load configuration from a TOML file and apply environment variable overrides.
    pub fn load_with_env<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| VaultError::Config(format!("config parse error: {e}")))
    }

    /// Apply environment variable overrides to the configuration.
    ///
    /// Supported environment variables:
    /// - `PORT`: HTTP listen port
    /// - `FOLDER_PATH`: blob storage directory
    /// - `DB_PATH`: SQLite database file
    ///
    /// Empty or unparsable values are ignored.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(port) = std::env::var("PORT") {
            match port.trim().parse::<u16>() {
                Ok(port) => self.server.port = port,
                Err(_) if port.is_empty() => {}
                Err(_) => tracing::warn!("Ignoring invalid PORT value: {}", port),
            }
        }

        if let Ok(folder) = std::env::var("FOLDER_PATH") {
            if !folder.is_empty() {
                self.files.storage_path = folder;
            }
        }

        if let Ok(db_path) = std::env::var("DB_PATH") {
            if !db_path.is_empty() {
                self.database.path = db_path;
            }
        }
    }

    /// Validate the configuration.
    ///
    /// Returns an error if:
    /// - the storage path is empty
    /// - the session TTL is zero
    /// - the session backend is unknown
    /// - the thumbnail attempt budget is zero
    pub fn validate(&self) -> Result<()> {
        if self.files.storage_path.trim().is_empty() {
            return Err(VaultError::Config(
                "files.storage_path must not be empty".to_string(),
            ));
        }
        if self.sessions.ttl_secs == 0 {
            return Err(VaultError::Config(
                "sessions.ttl_secs must be greater than zero".to_string(),
            ));
        }
        if !SESSION_BACKENDS.contains(&self.sessions.backend.as_str()) {
            return Err(VaultError::Config(format!(
                "unknown session backend '{}' (expected one of: {})",
                self.sessions.backend,
                SESSION_BACKENDS.join(", ")
            )));
        }
        if self.thumbnails.max_attempts == 0 {
            return Err(VaultError::Config(
                "thumbnails.max_attempts must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
