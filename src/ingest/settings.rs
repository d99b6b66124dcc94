//! Resolved reader settings for one ingestion run

use crate::error::{Result, TabscanError};
use crate::parser::TextEncoding;

/// Settings that fix how a file is streamed and split.
///
/// These are the already-resolved values; prompting or config lookup happens in
/// the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReaderSettings {
    pub delimiter: u8,
    pub encoding: TextEncoding,
    /// Number of workers populating the line table
    pub worker_count: usize,
    /// Read buffer for the streaming reader, in bytes
    pub read_buffer_size: usize,
    /// Lines per batch handed to a worker
    pub lines_batch_size: usize,
    /// Maximum number of batches waiting in the queue
    pub queue_capacity: usize,
}

impl ReaderSettings {
    pub const DEFAULT_BUFFER_SIZE_MB: usize = 16;
    pub const DEFAULT_LINES_BATCH_SIZE: usize = 100_000;
    /// Largest read buffer accepted by [`validate`](Self::validate)
    pub const MAX_READ_BUFFER_SIZE: usize = 1024 * 1024 * 1024;

    pub fn new(delimiter: u8) -> Self {
        let worker_count = Self::default_worker_count();
        Self {
            delimiter,
            encoding: TextEncoding::Utf8,
            worker_count,
            read_buffer_size: Self::DEFAULT_BUFFER_SIZE_MB * 1024 * 1024,
            lines_batch_size: Self::DEFAULT_LINES_BATCH_SIZE,
            queue_capacity: worker_count * 4,
        }
    }

    /// Half the logical CPUs minus two, never below one
    pub fn default_worker_count() -> usize {
        (num_cpus::get() / 2).saturating_sub(2).max(1)
    }

    pub fn with_encoding(mut self, encoding: TextEncoding) -> Self {
        self.encoding = encoding;
        self
    }

    pub fn with_worker_count(mut self, worker_count: usize) -> Self {
        self.worker_count = worker_count;
        self
    }

    pub fn with_buffer_size_mb(mut self, megabytes: usize) -> Self {
        self.read_buffer_size = megabytes.saturating_mul(1024 * 1024);
        self
    }

    pub fn with_read_buffer_size(mut self, bytes: usize) -> Self {
        self.read_buffer_size = bytes;
        self
    }

    pub fn with_lines_batch_size(mut self, lines: usize) -> Self {
        self.lines_batch_size = lines;
        self
    }

    pub fn with_queue_capacity(mut self, batches: usize) -> Self {
        self.queue_capacity = batches;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.worker_count == 0 {
            return Err(TabscanError::invalid_argument("worker count must be at least 1"));
        }
        if self.read_buffer_size == 0 {
            return Err(TabscanError::invalid_argument("read buffer size must be positive"));
        }
        if self.read_buffer_size > Self::MAX_READ_BUFFER_SIZE {
            return Err(TabscanError::invalid_argument(format!(
                "read buffer size must not exceed {} MB",
                Self::MAX_READ_BUFFER_SIZE / (1024 * 1024)
            )));
        }
        if self.lines_batch_size == 0 {
            return Err(TabscanError::invalid_argument("lines batch size must be positive"));
        }
        if self.queue_capacity == 0 {
            return Err(TabscanError::invalid_argument("queue capacity must be at least 1"));
        }
        if self.delimiter == b'\n' || self.delimiter == b'\r' {
            return Err(TabscanError::invalid_argument(
                "delimiter cannot be a line terminator",
            ));
        }
        Ok(())
    }
}
