//! Chunked parallel substring search over a line table
//!
//! The table is cut into contiguous chunks, each scanned on the blocking pool with its
//! own result list. Results are concatenated in chunk order once every chunk is done,
//! so the output follows file order regardless of which chunk finishes first.

use crate::error::{Result, TabscanError};
use crate::ingest::{IngestionResult, LineSlot, LineTable};
use crate::parser::{ColumnParser, TextEncoding, DEFAULT_QUOTE};
use memchr::memmem::Finder;
use std::ops::Range;
use std::sync::Arc;

/// One matching line, decoded output fields in column order
pub type Row = Vec<String>;

/// Parameters of one table scan
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    pub term: Vec<u8>,
    /// Sorted, deduplicated column indexes to emit
    pub output_columns: Vec<usize>,
    /// When set, a line only matches if one of these fields contains the term
    pub search_columns: Option<Vec<usize>>,
    pub total_columns: usize,
    pub delimiter: u8,
    /// Quote byte for fields containing the delimiter, `None` to split literally
    pub quote: Option<u8>,
    pub encoding: TextEncoding,
}

impl SearchRequest {
    pub fn new(
        term: impl Into<Vec<u8>>,
        output_columns: impl IntoIterator<Item = usize>,
        total_columns: usize,
        delimiter: u8,
    ) -> Self {
        let mut output_columns: Vec<usize> = output_columns.into_iter().collect();
        output_columns.sort_unstable();
        output_columns.dedup();

        Self {
            term: term.into(),
            output_columns,
            search_columns: None,
            total_columns,
            delimiter,
            quote: Some(DEFAULT_QUOTE),
            encoding: TextEncoding::default(),
        }
    }

    /// Request over an ingested file using its currently selected columns
    pub fn for_result(result: &IngestionResult, term: impl Into<Vec<u8>>) -> Self {
        Self::new(
            term,
            result.columns.selected_indexes(),
            result.column_count(),
            result.delimiter,
        )
        .with_encoding(result.encoding)
    }

    pub fn with_search_columns(mut self, columns: Vec<usize>) -> Self {
        self.search_columns = Some(columns);
        self
    }

    pub fn with_quote(mut self, quote: Option<u8>) -> Self {
        self.quote = quote;
        self
    }

    pub fn with_encoding(mut self, encoding: TextEncoding) -> Self {
        self.encoding = encoding;
        self
    }

    fn validate(&self) -> Result<()> {
        if self.output_columns.is_empty() {
            return Err(TabscanError::search("no output columns selected"));
        }
        if let Some(&column) = self
            .output_columns
            .iter()
            .find(|&&column| column >= self.total_columns)
        {
            return Err(TabscanError::search(format!(
                "output column {column} is outside the {} columns of the file",
                self.total_columns
            )));
        }
        Ok(())
    }
}

/// Chunks used by [`search`]: half the logical CPUs, at least one
pub fn default_chunk_count() -> usize {
    (num_cpus::get() / 2).max(1)
}

/// Scan `table` for the request's term using [`default_chunk_count`] chunks
pub async fn search(table: Arc<LineTable>, request: Arc<SearchRequest>) -> Result<Vec<Row>> {
    search_chunked(table, request, default_chunk_count()).await
}

/// Scan `table` split into `chunks` contiguous ranges.
///
/// Rows from chunk 0 come first, then chunk 1 and so on.
pub async fn search_chunked(
    table: Arc<LineTable>,
    request: Arc<SearchRequest>,
    chunks: usize,
) -> Result<Vec<Row>> {
    request.validate()?;

    let ranges = chunk_ranges(table.len(), chunks.max(1));
    log::debug!(
        "Searching {} lines in {} chunks for {} bytes",
        table.len(),
        ranges.len(),
        request.term.len()
    );

    let handles = ranges.into_iter().map(|range| {
        let table = Arc::clone(&table);
        let request = Arc::clone(&request);
        tokio::task::spawn_blocking(move || scan_chunk(&table.slots()[range], &request))
    });

    let mut rows = Vec::new();
    for joined in futures::future::join_all(handles).await {
        let chunk_rows =
            joined.map_err(|e| TabscanError::search(format!("search chunk did not complete: {e}")))?;
        rows.extend(chunk_rows);
    }

    Ok(rows)
}

/// Contiguous ranges of `len / chunks + 1` lines; trailing empty ranges are dropped
fn chunk_ranges(len: usize, chunks: usize) -> Vec<Range<usize>> {
    let size = len / chunks + 1;
    (0..chunks)
        .map(|chunk| {
            let start = (chunk * size).min(len);
            start..(start + size).min(len)
        })
        .filter(|range| !range.is_empty())
        .collect()
}

fn scan_chunk(lines: &[LineSlot], request: &SearchRequest) -> Vec<Row> {
    let finder = Finder::new(&request.term);
    let parser = ColumnParser::with_quote(request.delimiter, request.quote);
    let mut rows = Vec::new();

    for slot in lines {
        let Some(raw) = slot.raw() else { continue };
        if raw.is_empty() || finder.find(raw).is_none() {
            continue;
        }

        let fields = parser.parse(raw, request.total_columns);

        if let Some(search_columns) = &request.search_columns {
            let hit = search_columns.iter().any(|&column| {
                fields
                    .get(column)
                    .is_some_and(|field| finder.find(field).is_some())
            });
            if !hit {
                continue;
            }
        }

        rows.push(
            request
                .output_columns
                .iter()
                .map(|&column| request.encoding.decode(fields.get(column).copied().unwrap_or_default()))
                .collect(),
        );
    }

    rows
}
