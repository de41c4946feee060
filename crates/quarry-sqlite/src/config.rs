//! SQLite connection configuration

use crate::error::{SqliteError, SqliteResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Settings applied when opening a connection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SqliteConfig {
    /// Database file, or `:memory:`
    pub path: PathBuf,

    /// Write-ahead logging (ignored for in-memory databases)
    pub wal_mode: bool,

    /// Enforce foreign keys
    pub foreign_keys: bool,

    /// How long a statement waits on a locked database
    pub busy_timeout_ms: u32,

    /// `PRAGMA cache_size`; negative values are KiB
    pub cache_size: i64,

    /// `PRAGMA mmap_size` in bytes; 0 disables
    pub mmap_size: u64,

    /// Log every rendered statement at info level
    pub show_sql: bool,
}

impl Default for SqliteConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(":memory:"),
            wal_mode: true,
            foreign_keys: true,
            busy_timeout_ms: 5000,
            cache_size: -16000,
            mmap_size: 0,
            show_sql: false,
        }
    }
}

impl SqliteConfig {
    /// File-backed database with default settings
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            ..Self::default()
        }
    }

    /// In-memory database
    pub fn memory() -> Self {
        Self::default()
    }

    pub fn is_memory(&self) -> bool {
        self.path.to_str() == Some(":memory:")
    }

    pub fn with_show_sql(mut self, show_sql: bool) -> Self {
        self.show_sql = show_sql;
        self
    }

    /// Parse a `[sqlite]`-less TOML document; missing keys take defaults.
    pub fn from_toml_str(content: &str) -> SqliteResult<Self> {
        toml::from_str(content).map_err(|e| SqliteError::Config(e.to_string()))
    }

    /// Read configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> SqliteResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            SqliteError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_is_memory() {
        let config = SqliteConfig::default();
        assert!(config.is_memory());
        assert!(config.foreign_keys);
        assert!(!config.show_sql);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = SqliteConfig::from_toml_str(
            r#"
            path = "data/quarry.db"
            show_sql = true
            busy_timeout_ms = 250
            "#,
        )
        .unwrap();

        assert_eq!(config.path, PathBuf::from("data/quarry.db"));
        assert!(config.show_sql);
        assert_eq!(config.busy_timeout_ms, 250);
        assert!(config.wal_mode);
        assert_eq!(config.cache_size, -16000);
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let err = SqliteConfig::from_toml_str("busy_timeout_ms = \"soon\"").unwrap_err();
        assert!(matches!(err, SqliteError::Config(_)));
    }

    #[test]
    fn test_load_from_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sqlite.toml");
        std::fs::write(&path, "foreign_keys = false\n").unwrap();

        let config = SqliteConfig::load(&path).unwrap();
        assert!(!config.foreign_keys);
        assert!(config.is_memory());
    }

    #[test]
    fn test_toml_roundtrip() {
        let config = SqliteConfig::new("quarry.db").with_show_sql(true);
        let text = toml::to_string(&config).unwrap();
        assert_eq!(SqliteConfig::from_toml_str(&text).unwrap(), config);
    }
}
