//! Application configuration loaded from TOML
//!
//! Lookup order:
//! 1. an explicit path passed with `--config` (must exist)
//! 2. `$XDG_CONFIG_HOME/tabscan/config.toml` (or the platform equivalent)
//! 3. built-in defaults
//!
//! Example:
//! ```toml
//! data_dir = "/var/lib/tabscan"
//!
//! [reader]
//! worker_count = 6
//! buffer_size_mb = 16
//! lines_batch_size = 100000
//! queue_capacity = 24
//!
//! [search]
//! page_size = 50
//! ```
//!
//! Command line flags take precedence over every value here.

use crate::error::{Result, TabscanError};
use crate::ingest::ReaderSettings;
use crate::parser::TextEncoding;
use crate::search::DEFAULT_PAGE_SIZE;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReaderConfig {
    pub worker_count: usize,
    pub buffer_size_mb: usize,
    pub lines_batch_size: usize,
    /// Defaults to four batches per worker when absent
    pub queue_capacity: Option<usize>,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            worker_count: ReaderSettings::default_worker_count(),
            buffer_size_mb: ReaderSettings::DEFAULT_BUFFER_SIZE_MB,
            lines_batch_size: ReaderSettings::DEFAULT_LINES_BATCH_SIZE,
            queue_capacity: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub page_size: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub reader: ReaderConfig,
    pub search: SearchConfig,
    /// Root for persisted settings; `~/.tabscan` when absent
    pub data_dir: Option<PathBuf>,
}

impl AppConfig {
    /// Default location of the config file
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("tabscan").join("config.toml"))
    }

    /// Load from `path`, or from [`AppConfig::default_path`] when `None`.
    ///
    /// A missing default file yields the defaults; a missing explicit file is an
    /// error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load_file(path),
            None => match Self::default_path() {
                Some(path) if path.is_file() => Self::load_file(&path),
                _ => Ok(Self::default()),
            },
        }
    }

    pub fn load_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            TabscanError::config(format!("cannot read {}: {e}", path.display()))
        })?;
        let config = Self::from_toml(&content)?;
        log::debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(content).map_err(|e| TabscanError::config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.reader.worker_count == 0 {
            return Err(TabscanError::config("reader.worker_count must be at least 1"));
        }
        if self.reader.buffer_size_mb == 0 {
            return Err(TabscanError::config("reader.buffer_size_mb must be positive"));
        }
        if self.reader.lines_batch_size == 0 {
            return Err(TabscanError::config("reader.lines_batch_size must be positive"));
        }
        if self.reader.queue_capacity == Some(0) {
            return Err(TabscanError::config("reader.queue_capacity must be at least 1"));
        }
        if self.search.page_size == 0 {
            return Err(TabscanError::config("search.page_size must be positive"));
        }
        Ok(())
    }

    /// Directory holding persisted column settings and file history
    pub fn data_dir(&self) -> PathBuf {
        self.data_dir.clone().unwrap_or_else(|| {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".tabscan")
        })
    }

    /// Reader settings for `delimiter` using the configured reader values
    pub fn reader_settings(&self, delimiter: u8, encoding: TextEncoding) -> ReaderSettings {
        let reader = &self.reader;
        ReaderSettings::new(delimiter)
            .with_encoding(encoding)
            .with_worker_count(reader.worker_count)
            .with_buffer_size_mb(reader.buffer_size_mb)
            .with_lines_batch_size(reader.lines_batch_size)
            .with_queue_capacity(reader.queue_capacity.unwrap_or(reader.worker_count * 4))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_empty_document_uses_defaults() {
        let config = AppConfig::from_toml("").unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.search.page_size, 50);
        assert_eq!(config.reader.lines_batch_size, 100_000);
    }

    #[test]
    fn test_partial_document() {
        let config = AppConfig::from_toml(
            r#"
            data_dir = "/tmp/tabscan-data"

            [reader]
            worker_count = 3
            "#,
        )
        .unwrap();

        assert_eq!(config.reader.worker_count, 3);
        assert_eq!(config.reader.buffer_size_mb, 16);
        assert_eq!(config.data_dir(), PathBuf::from("/tmp/tabscan-data"));

        let settings = config.reader_settings(b',', TextEncoding::Ascii);
        assert_eq!(settings.worker_count, 3);
        assert_eq!(settings.queue_capacity, 12);
        assert_eq!(settings.delimiter, b',');
        assert_eq!(settings.encoding, TextEncoding::Ascii);
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(AppConfig::from_toml("[reader]\nworker_count = 0").is_err());
        assert!(AppConfig::from_toml("[search]\npage_size = 0").is_err());
        assert!(AppConfig::from_toml("[reader]\nworker_count = \"many\"").is_err());
    }

    #[test]
    fn test_load_explicit_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[search]\npage_size = 10").unwrap();

        let config = AppConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.search.page_size, 10);
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let err = AppConfig::load(Some(Path::new("/definitely/not/here.toml"))).unwrap_err();
        assert!(matches!(err, TabscanError::ConfigError { .. }));
    }
}
