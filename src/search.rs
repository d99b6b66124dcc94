//! Parallel substring search over an ingested line table
//!
//! [`engine`] performs one chunked scan and returns rows in file order.
//! [`session`] layers caching, ordering and pagination on top so that paging through
//! a result set does not rescan the table.

pub mod engine;
pub mod session;

pub use engine::{default_chunk_count, search, search_chunked, Row, SearchRequest};
pub use session::{SearchQuery, SearchResult, SearchScope, SearchSession, DEFAULT_PAGE_SIZE};
