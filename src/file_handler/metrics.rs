//! Streaming file metrics: line count and content identity hash
//!
//! Both metrics read the file front to back through a fixed-size buffer, so memory
//! use stays flat regardless of file size.

use crate::error::{Result, TabscanError};
use memchr::memchr_iter;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tokio::fs::File;
use tokio::io::AsyncReadExt;
use tokio::sync::OnceCell;

/// Read buffer used for line counting and hashing (32MB)
pub const DEFAULT_COUNT_BUFFER_SIZE: usize = 32 * 1024 * 1024;

/// Lazily computed metrics for one file.
///
/// The line count is memoized: the first call streams the file, every later call
/// returns the cached value.
#[derive(Debug)]
pub struct FileMetrics {
    path: PathBuf,
    buffer_size: usize,
    line_count: OnceCell<u64>,
}

impl FileMetrics {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::with_buffer_size(path, DEFAULT_COUNT_BUFFER_SIZE)
    }

    pub fn with_buffer_size(path: impl Into<PathBuf>, buffer_size: usize) -> Self {
        Self {
            path: path.into(),
            buffer_size: buffer_size.max(1),
            line_count: OnceCell::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of lines in the file, header included.
    ///
    /// This is not a plain count of `\n` bytes: a final line without a trailing
    /// newline is counted too, matching the lines [`LineReader`] yields, so
    /// `"a\nb"` counts as 2 where a line-feed count would give 1. The value is
    /// computed once and cached.
    ///
    /// [`LineReader`]: crate::ingest::LineReader
    pub async fn count_lines(&self) -> Result<u64> {
        self.line_count
            .get_or_try_init(|| count_lines_in_file(&self.path, self.buffer_size))
            .await
            .copied()
    }

    /// The memoized line count, if `count_lines` has completed
    pub fn cached_line_count(&self) -> Option<u64> {
        self.line_count.get().copied()
    }

    /// Hex identity of the file: SHA-256 of the content followed by SHA-256 of
    /// the absolute path.
    ///
    /// Identical content at two locations produces two different identities.
    pub async fn content_hash(&self) -> Result<String> {
        let mut file = open(&self.path).await?;
        let mut hasher = Sha256::new();
        let mut buffer = vec![0u8; self.buffer_size];

        loop {
            let read = file.read(&mut buffer).await.map_err(|e| {
                TabscanError::file_error(format!("Failed to hash {}", self.path.display()), e)
            })?;
            if read == 0 {
                break;
            }
            hasher.update(&buffer[..read]);
        }

        let content_digest = hasher.finalize();

        let full_path = tokio::fs::canonicalize(&self.path).await.map_err(|e| {
            TabscanError::file_error(format!("Failed to resolve {}", self.path.display()), e)
        })?;
        let path_digest = Sha256::digest(full_path.to_string_lossy().as_bytes());

        let mut combined = Vec::with_capacity(content_digest.len() + path_digest.len());
        combined.extend_from_slice(&content_digest);
        combined.extend_from_slice(&path_digest);

        Ok(hex::encode_upper(combined))
    }
}

async fn open(path: &Path) -> Result<File> {
    File::open(path)
        .await
        .map_err(|e| TabscanError::file_error(format!("Failed to open {}", path.display()), e))
}

async fn count_lines_in_file(path: &Path, buffer_size: usize) -> Result<u64> {
    let mut file = open(path).await?;
    let mut buffer = vec![0u8; buffer_size];
    let mut newlines = 0u64;
    let mut last_byte = None;

    loop {
        let read = file.read(&mut buffer).await.map_err(|e| {
            TabscanError::file_error(format!("Failed to count lines in {}", path.display()), e)
        })?;
        if read == 0 {
            break;
        }
        newlines += memchr_iter(b'\n', &buffer[..read]).count() as u64;
        last_byte = Some(buffer[read - 1]);
    }

    let unterminated = matches!(last_byte, Some(b) if b != b'\n');
    let total = newlines + u64::from(unterminated);

    log::debug!("Counted {} lines in {}", total, path.display());
    Ok(total)
}
