//! File configuration for catalog hosts and tooling.
//!
//! Every key is optional; missing keys fall back to library defaults.
//!
//! ```toml
//! db_path = "/var/lib/catalog/items.sqlite3"
//! log_level = "info"
//! log_dir = "/var/log/catalog"
//! busy_timeout_ms = 2000
//! ```

use crate::db::DEFAULT_BUSY_TIMEOUT;
use crate::logging::default_log_level;
use serde::Deserialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CatalogConfig {
    /// SQLite file holding the item collection.
    pub db_path: Option<PathBuf>,
    pub log_level: Option<String>,
    /// Absolute directory for rolling log files; logging stays off if unset.
    pub log_dir: Option<PathBuf>,
    pub busy_timeout_ms: Option<u64>,
}

impl CatalogConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: Some(path.to_path_buf()),
            source,
        })
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|source| ConfigError::Parse { path: None, source })
    }

    pub fn log_level_or_default(&self) -> &str {
        self.log_level.as_deref().unwrap_or(default_log_level())
    }

    pub fn busy_timeout(&self) -> Duration {
        self.busy_timeout_ms
            .map_or(DEFAULT_BUSY_TIMEOUT, Duration::from_millis)
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Parse {
        path: Option<PathBuf>,
        source: toml::de::Error,
    },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "failed to read config file `{}`: {source}", path.display())
            }
            Self::Parse {
                path: Some(path),
                source,
            } => write!(f, "failed to parse config file `{}`: {source}", path.display()),
            Self::Parse { path: None, source } => write!(f, "failed to parse config: {source}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse { source, .. } => Some(source),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{CatalogConfig, ConfigError};
    use crate::db::DEFAULT_BUSY_TIMEOUT;
    use std::path::PathBuf;
    use std::time::Duration;

    #[test]
    fn empty_document_uses_defaults() {
        let config = CatalogConfig::from_toml_str("").unwrap();
        assert_eq!(config, CatalogConfig::default());
        assert_eq!(config.busy_timeout(), DEFAULT_BUSY_TIMEOUT);
        assert!(!config.log_level_or_default().is_empty());
    }

    #[test]
    fn parses_all_keys() {
        let config = CatalogConfig::from_toml_str(
            r#"
            db_path = "/tmp/items.sqlite3"
            log_level = "warn"
            log_dir = "/tmp/catalog-logs"
            busy_timeout_ms = 250
            "#,
        )
        .unwrap();

        assert_eq!(config.db_path, Some(PathBuf::from("/tmp/items.sqlite3")));
        assert_eq!(config.log_level_or_default(), "warn");
        assert_eq!(config.log_dir, Some(PathBuf::from("/tmp/catalog-logs")));
        assert_eq!(config.busy_timeout(), Duration::from_millis(250));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = CatalogConfig::from_toml_str("db_file = \"x\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { path: None, .. }));
    }

    #[test]
    fn load_reports_missing_file_path() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("catalog.toml");

        let err = CatalogConfig::load(&missing).unwrap_err();
        assert!(matches!(err, ConfigError::Io { ref path, .. } if path == &missing));
        assert!(err.to_string().contains("catalog.toml"));
    }
}
