//! File validation utilities for ensuring files are suitable for processing.
//!
//! This module provides validation functions to check that files can be safely
//! ingested before the pipeline starts counting and streaming them.

use crate::error::{Result, TabscanError};
use std::fs::File;
use std::io::ErrorKind;
use std::path::Path;

/// Validate that a file path is accessible and suitable for processing
///
/// # Validations Performed
/// - Path exists
/// - Path is a regular file (not a directory)
/// - File is readable by the current process
///
/// Empty files are accepted: they ingest to zero columns and an empty line table.
pub fn validate_file_path(path: &Path) -> Result<()> {
    let metadata = match std::fs::metadata(path) {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(TabscanError::FileNotFound {
                path: path.to_path_buf(),
            })
        }
        Err(e) if e.kind() == ErrorKind::PermissionDenied => {
            return Err(TabscanError::PermissionDenied {
                path: path.to_path_buf(),
            })
        }
        Err(e) => return Err(TabscanError::file_error("Failed to read file metadata", e)),
    };

    if !metadata.is_file() {
        return Err(TabscanError::NotAFile {
            path: path.to_path_buf(),
        });
    }

    // Try to open the file to verify read permissions
    File::open(path).map_err(|e| match e.kind() {
        ErrorKind::PermissionDenied => TabscanError::PermissionDenied {
            path: path.to_path_buf(),
        },
        _ => TabscanError::file_error(
            format!("Cannot open file for reading: {}", path.display()),
            e,
        ),
    })?;

    Ok(())
}
