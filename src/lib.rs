//! # tabscan - In-Memory Viewer and Search Engine for Large Delimited Files
//!
//! Loads a delimited text file entirely into memory, then pages, selects and searches
//! its rows and columns.
//!
//! ## Features
//!
//! - **Streaming Ingestion**: One pass over the file with a bounded read buffer and a
//!   fixed worker pool populating a pre-sized line table
//! - **Ordered Concurrency**: Batches carry their absolute table offset, so the table is
//!   in file order for any worker count
//! - **Zero-Copy Parsing**: Quote-aware field splitting over raw byte slices
//! - **Parallel Search**: Chunked substring scan with results merged in chunk order
//! - **Persisted Layouts**: Column selections stored per file, keyed by content hash
//!
//! ## Architecture
//!
//! - [`error`] - Centralized error types and handling
//! - [`parser`] - Byte cursor, plain and quote-aware field splitting, text decoding
//! - [`file_handler`] - Path validation, line counting and content hashing
//! - [`workflow`] - Stage/step orchestrator with progress reporting
//! - [`ingest`] - The ingestion workflow and the line table it produces
//! - [`search`] - Parallel search engine and cached, paginated sessions
//! - [`view`] - Paging and explicit line selection
//! - [`settings`] - JSON persistence of column layouts and file history
//! - [`config`] - TOML application configuration

// Core modules
pub mod error;
pub mod file_handler;
pub mod parser;

// Pipeline
pub mod ingest;
pub mod workflow;

// Consumers of the ingestion result
pub mod search;
pub mod settings;
pub mod view;

pub mod config;

// Re-export commonly used types for convenience
pub use error::{Result, TabscanError};

// Public API surface for external usage
pub use config::AppConfig;
pub use ingest::{ingest, ColumnDescriptor, ColumnSet, InMemoryFileReader, IngestionResult, ReaderSettings};
pub use parser::{ColumnParser, TextEncoding};
pub use search::{SearchQuery, SearchResult, SearchSession};
pub use settings::SettingsStore;

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
