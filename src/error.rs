//! Error types and handling infrastructure for tabscan.
//!
//! This module provides a centralized error handling system using `thiserror` for
//! custom error types. The binary layers `anyhow` on top for context.
//!
//! ## Error Categories
//!
//! - **I/O failures**: missing or unreadable files abort the operation in progress
//! - **Stage failures**: any error raised inside a workflow step is wrapped with the
//!   stage and step name so the operator knows where ingestion stopped
//! - **Invariant violations**: contract failures between pipeline stages, reported
//!   separately from I/O and data problems
//!
//! Malformed row data is not represented here: the column parser degrades to
//! empty fields instead of failing.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for tabscan operations.
#[derive(Error, Debug)]
pub enum TabscanError {
    /// File system related errors (file not found, permission denied, etc.)
    #[error("File operation failed: {message}")]
    FileError {
        message: String,
        #[source]
        source: std::io::Error,
    },

    /// File not found specifically (common case for user feedback)
    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    /// Path exists but is not a regular file
    #[error("Path is not a regular file: {path}")]
    NotAFile { path: PathBuf },

    /// Permission denied accessing file
    #[error("Permission denied accessing file: {path}")]
    PermissionDenied { path: PathBuf },

    /// A workflow step failed; carries the stage and step for retry context
    #[error("Stage '{stage}' failed at step '{step}': {source}")]
    StepFailed {
        stage: String,
        step: String,
        #[source]
        source: Box<TabscanError>,
    },

    /// A later stage found data an earlier stage should have produced missing
    #[error("Invariant violated: {message}")]
    InvariantViolation { message: String },

    /// Search operation errors
    #[error("Search operation failed: {message}")]
    SearchError { message: String },

    /// Configuration related errors
    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    /// Persisted settings could not be read, written or applied
    #[error("Settings error: {message}")]
    SettingsError { message: String },

    /// Invalid command line arguments or operation parameters
    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },

    /// Generic error for cases not covered by specific variants
    #[error("Operation failed: {message}")]
    Other { message: String },
}

/// Standard Result type for tabscan operations.
pub type Result<T> = std::result::Result<T, TabscanError>;

impl TabscanError {
    /// Create a FileError from an io::Error with additional context
    pub fn file_error(message: impl Into<String>, source: std::io::Error) -> Self {
        Self::FileError {
            message: message.into(),
            source,
        }
    }

    /// Wrap an error raised by a workflow step
    pub fn step_failed(stage: impl Into<String>, step: impl Into<String>, source: Self) -> Self {
        Self::StepFailed {
            stage: stage.into(),
            step: step.into(),
            source: Box::new(source),
        }
    }

    /// Create an InvariantViolation with a descriptive message
    pub fn invariant(message: impl Into<String>) -> Self {
        Self::InvariantViolation {
            message: message.into(),
        }
    }

    /// Create a SearchError with a descriptive message
    pub fn search(message: impl Into<String>) -> Self {
        Self::SearchError {
            message: message.into(),
        }
    }

    /// Create a ConfigError with a descriptive message
    pub fn config(message: impl Into<String>) -> Self {
        Self::ConfigError {
            message: message.into(),
        }
    }

    /// Create a SettingsError with a descriptive message
    pub fn settings(message: impl Into<String>) -> Self {
        Self::SettingsError {
            message: message.into(),
        }
    }

    /// Create an InvalidArgument error with a descriptive message
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Create a generic Other error with a descriptive message
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other {
            message: message.into(),
        }
    }

    /// Whether this error (or the step error it wraps) is an invariant violation
    pub fn is_invariant_violation(&self) -> bool {
        match self {
            Self::InvariantViolation { .. } => true,
            Self::StepFailed { source, .. } => source.is_invariant_violation(),
            _ => false,
        }
    }

    /// Whether this error (or the step error it wraps) comes from the file system
    pub fn is_io(&self) -> bool {
        match self {
            Self::FileError { .. }
            | Self::FileNotFound { .. }
            | Self::NotAFile { .. }
            | Self::PermissionDenied { .. } => true,
            Self::StepFailed { source, .. } => source.is_io(),
            _ => false,
        }
    }
}

// Automatic conversion from io::Error to TabscanError
impl From<std::io::Error> for TabscanError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => Self::FileError {
                message: "File not found".to_string(),
                source: err,
            },
            std::io::ErrorKind::PermissionDenied => Self::FileError {
                message: "Permission denied".to_string(),
                source: err,
            },
            _ => Self::FileError {
                message: "IO operation failed".to_string(),
                source: err,
            },
        }
    }
}

impl From<serde_json::Error> for TabscanError {
    fn from(err: serde_json::Error) -> Self {
        Self::settings(err.to_string())
    }
}
