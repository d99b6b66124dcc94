//! Persisted per-file state keyed by content hash
//!
//! Two kinds of JSON documents live under the data directory:
//!
//! - `file-settings/<hash>.json`: the column layout chosen for a file
//! - `prev-read-files/<hash>.json`: the parameters a file was last opened with
//!
//! The hash is [`IngestionResult::content_hash`], so moving or editing a file
//! detaches it from its stored state.

use crate::error::{Result, TabscanError};
use crate::ingest::{ColumnDescriptor, IngestionResult, ReaderSettings};
use crate::parser::{parse_delimiter, TextEncoding};
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

const FILE_SETTINGS_DIR: &str = "file-settings";
const PREVIOUS_FILES_DIR: &str = "prev-read-files";

/// Column layout stored for one file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct StoredFileSettings {
    pub file_name: String,
    #[serde(rename = "FileColumns")]
    pub columns: Vec<ColumnDescriptor>,
}

/// Parameters a file was opened with
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct FileSelection {
    pub full_name: PathBuf,
    pub encoding: TextEncoding,
    pub delimiter: String,
}

impl FileSelection {
    pub fn from_result(result: &IngestionResult) -> Self {
        Self {
            full_name: result.path.clone(),
            encoding: result.encoding,
            delimiter: char::from(result.delimiter).to_string(),
        }
    }

    /// Reader settings that reopen the file the same way
    pub fn reader_settings(&self) -> Result<ReaderSettings> {
        Ok(ReaderSettings::new(parse_delimiter(&self.delimiter)?).with_encoding(self.encoding))
    }
}

/// Reads and writes persisted state below one data directory
#[derive(Debug, Clone)]
pub struct SettingsStore {
    root: PathBuf,
}

impl SettingsStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn column_settings_path(&self, hash: &str) -> PathBuf {
        self.root.join(FILE_SETTINGS_DIR).join(format!("{hash}.json"))
    }

    pub fn selection_path(&self, hash: &str) -> PathBuf {
        self.root.join(PREVIOUS_FILES_DIR).join(format!("{hash}.json"))
    }

    /// Persist the current column layout of `result`
    pub async fn store_columns(&self, result: &IngestionResult) -> Result<PathBuf> {
        let hash = require_hash(result)?;
        let settings = StoredFileSettings {
            file_name: result.file_name(),
            columns: result.columns.descriptors().to_vec(),
        };

        let path = self.column_settings_path(hash);
        write_json(&path, &settings).await?;
        log::info!("Stored column settings for {} at {}", settings.file_name, path.display());
        Ok(path)
    }

    /// Stored column layout for `hash`, if one exists
    pub async fn load_columns(&self, hash: &str) -> Result<Option<StoredFileSettings>> {
        read_json(&self.column_settings_path(hash)).await
    }

    /// Replace the columns of `result` with its stored layout.
    ///
    /// Returns `false` when nothing was stored for the file.
    pub async fn apply_stored_columns(&self, result: &mut IngestionResult) -> Result<bool> {
        let hash = require_hash(result)?;
        let Some(stored) = self.load_columns(hash).await? else {
            return Ok(false);
        };

        result.columns.replace(stored.columns)?;
        log::debug!("Applied stored column settings for {}", stored.file_name);
        Ok(true)
    }

    /// Forget the stored layout and restore default columns
    pub async fn reset_columns(&self, result: &mut IngestionResult) -> Result<()> {
        let hash = require_hash(result)?;
        remove_if_exists(&self.column_settings_path(hash)).await?;
        result.reset_columns();
        Ok(())
    }

    /// Remember how `result` was opened
    pub async fn record_selection(&self, result: &IngestionResult) -> Result<PathBuf> {
        let hash = require_hash(result)?;
        let path = self.selection_path(hash);
        write_json(&path, &FileSelection::from_result(result)).await?;
        Ok(path)
    }

    /// Every recorded selection, ordered by file name.
    ///
    /// Documents that cannot be parsed are skipped with a warning.
    pub async fn previous_selections(&self) -> Result<Vec<FileSelection>> {
        let dir = self.root.join(PREVIOUS_FILES_DIR);
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(TabscanError::file_error(
                    format!("Failed to list {}", dir.display()),
                    e,
                ))
            }
        };

        let mut selections = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            match read_json::<FileSelection>(&path).await {
                Ok(Some(selection)) => selections.push(selection),
                Ok(None) => {}
                Err(e) => log::warn!("Skipping {}: {e}", path.display()),
            }
        }

        selections.sort_by(|a, b| a.full_name.cmp(&b.full_name));
        Ok(selections)
    }

    /// Delete every recorded selection
    pub async fn clear_previous_selections(&self) -> Result<()> {
        let dir = self.root.join(PREVIOUS_FILES_DIR);
        match tokio::fs::remove_dir_all(&dir).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(TabscanError::file_error(
                format!("Failed to clear {}", dir.display()),
                e,
            )),
        }
    }
}

fn require_hash(result: &IngestionResult) -> Result<&str> {
    if result.content_hash.is_empty() {
        return Err(TabscanError::settings(format!(
            "missing content hash for {}",
            result.path.display()
        )));
    }
    Ok(&result.content_hash)
}

async fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await.map_err(|e| {
            TabscanError::file_error(format!("Failed to create {}", parent.display()), e)
        })?;
    }
    let json = serde_json::to_string_pretty(value)?;
    tokio::fs::write(path, json)
        .await
        .map_err(|e| TabscanError::file_error(format!("Failed to write {}", path.display()), e))
}

async fn read_json<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<Option<T>> {
    match tokio::fs::read(path).await {
        Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(TabscanError::file_error(
            format!("Failed to read {}", path.display()),
            e,
        )),
    }
}

async fn remove_if_exists(path: &Path) -> Result<()> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(TabscanError::file_error(
            format!("Failed to remove {}", path.display()),
            e,
        )),
    }
}
