//! File access helpers that never load the whole file.
//!
//! This module provides path validation and the streaming metrics (line count and
//! content identity hash) that the ingestion pipeline needs before it can size the
//! in-memory line table.

pub mod metrics;
pub mod validation;

pub use metrics::{FileMetrics, DEFAULT_COUNT_BUFFER_SIZE};
pub use validation::validate_file_path;
