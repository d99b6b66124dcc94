//! Cached, ordered and paginated search over one ingested file

use crate::error::{Result, TabscanError};
use crate::ingest::{ColumnDescriptor, IngestionResult};
use crate::search::engine::{search, Row, SearchRequest};
use std::sync::Arc;

pub const DEFAULT_PAGE_SIZE: usize = 50;

/// Which fields the term has to appear in
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SearchScope {
    /// A hit anywhere in the raw line is enough
    #[default]
    AllColumns,
    /// The raw line and at least one of these fields must contain the term
    SelectedColumns(Vec<usize>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    pub term: String,
    pub scope: SearchScope,
    /// 1-based
    pub page: usize,
    pub page_size: usize,
    /// Discard the cached result set and scan again
    pub reset: bool,
}

impl SearchQuery {
    pub fn new(term: impl Into<String>) -> Self {
        Self {
            term: term.into(),
            scope: SearchScope::AllColumns,
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
            reset: false,
        }
    }

    pub fn in_columns(mut self, columns: Vec<usize>) -> Self {
        self.scope = SearchScope::SelectedColumns(columns);
        self
    }

    pub fn page(mut self, page: usize) -> Self {
        self.page = page;
        self
    }

    pub fn page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn reset(mut self) -> Self {
        self.reset = true;
        self
    }
}

/// One page of search results
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchResult {
    pub search_term: String,
    /// Descriptors of the emitted columns, in row order
    pub columns: Vec<ColumnDescriptor>,
    pub rows: Vec<Row>,
    pub page: usize,
    pub page_size: usize,
    pub total_records: usize,
    pub total_pages: usize,
}

/// Parameters the cached rows were produced with
#[derive(Debug, Clone, PartialEq, Eq)]
struct CacheKey {
    term: String,
    scope: SearchScope,
    output_columns: Vec<usize>,
    order_by: Option<usize>,
}

#[derive(Debug)]
struct CachedSearch {
    key: CacheKey,
    columns: Vec<ColumnDescriptor>,
    rows: Vec<Row>,
}

/// Keeps the full result set of the last query so paging does not rescan
#[derive(Debug, Default)]
pub struct SearchSession {
    cache: Option<CachedSearch>,
    scans: usize,
}

impl SearchSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of table scans performed so far
    pub fn scan_count(&self) -> usize {
        self.scans
    }

    /// Every row of the cached result set, sorted, before pagination
    pub fn all_rows(&self) -> Option<&[Row]> {
        self.cache.as_ref().map(|cache| cache.rows.as_slice())
    }

    pub fn reset(&mut self) {
        self.cache = None;
    }

    /// Answer `query` against `result`, scanning only when the cached set is stale.
    ///
    /// The cache is reused while the term, scope, selected output columns and
    /// order-by column stay the same and `reset` is not set.
    pub async fn query(
        &mut self,
        result: &IngestionResult,
        query: &SearchQuery,
    ) -> Result<SearchResult> {
        if query.page_size == 0 {
            return Err(TabscanError::invalid_argument("page size must be positive"));
        }

        let key = CacheKey {
            term: query.term.clone(),
            scope: query.scope.clone(),
            output_columns: result.columns.selected_indexes(),
            order_by: result.columns.order_by_column().map(|column| column.index),
        };

        let stale = query.reset || self.cache.as_ref().map_or(true, |cache| cache.key != key);
        if stale {
            let cached = self.scan(result, key).await?;
            self.cache = Some(cached);
        }

        let cache = self
            .cache
            .as_ref()
            .ok_or_else(|| TabscanError::invariant("search cache missing after scan"))?;

        let page = query.page.max(1);
        let total_records = cache.rows.len();
        let rows = cache
            .rows
            .iter()
            .skip((page - 1).saturating_mul(query.page_size))
            .take(query.page_size)
            .cloned()
            .collect();

        Ok(SearchResult {
            search_term: query.term.clone(),
            columns: cache.columns.clone(),
            rows,
            page,
            page_size: query.page_size,
            total_records,
            total_pages: total_records.div_ceil(query.page_size),
        })
    }

    async fn scan(&mut self, result: &IngestionResult, key: CacheKey) -> Result<CachedSearch> {
        let mut request = SearchRequest::for_result(result, key.term.as_bytes());
        if let SearchScope::SelectedColumns(search_columns) = &key.scope {
            request = request.with_search_columns(search_columns.clone());
        }

        // Row values follow the request's output order, so labels must too
        let columns = request
            .output_columns
            .iter()
            .filter_map(|&index| result.columns.iter().find(|c| c.index == index))
            .cloned()
            .collect();
        let order_position = key.order_by.and_then(|index| {
            request
                .output_columns
                .iter()
                .position(|&column| column == index)
        });

        let mut rows = search(Arc::clone(&result.lines), Arc::new(request)).await?;
        self.scans += 1;

        // Only an emitted column can order the rows
        if let Some(position) = order_position {
            rows.sort_by(|a, b| a.get(position).cmp(&b.get(position)));
        }

        log::debug!(
            "Search for {:?} matched {} lines (scan #{})",
            key.term,
            rows.len(),
            self.scans
        );

        Ok(CachedSearch { key, columns, rows })
    }
}
