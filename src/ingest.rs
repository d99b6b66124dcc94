//! Streaming ingestion of a delimited file into an in-memory line table.
//!
//! The pipeline is expressed as a [`Workflow`](crate::workflow::Workflow):
//!
//! 1. count the lines to pre-size the table
//! 2. allocate one empty slot per data line
//! 3. start a fixed pool of workers draining a batch queue (parallel step)
//! 4. stream the file once, parse the header and queue batches tagged with the
//!    absolute table offset of their first line
//! 5. hash the file content and path
//!
//! Because offsets are assigned by the single producer in file order, the table ends
//! up in original order no matter how batches are scheduled across workers.

pub mod pipeline;
pub mod reader;
pub mod settings;
pub mod table;

pub use pipeline::{ingest, InMemoryFileReader, IngestionResult, LineBatch};
pub use reader::LineReader;
pub use settings::ReaderSettings;
pub use table::{ColumnDescriptor, ColumnSet, LineSlot, LineTable, LineTableBuilder};
