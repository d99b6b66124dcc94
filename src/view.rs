//! Paging and line selection over an ingested file
//!
//! Both views emit only the columns selected for output and skip slots that are
//! empty or were never written. Totals always refer to the whole line table.

use crate::error::{Result, TabscanError};
use crate::ingest::{ColumnDescriptor, IngestionResult};
use crate::parser::{ColumnParser, TextEncoding};
use crate::search::Row;

/// Upper bound on lines a single selection may render
pub const MAX_SELECTED_LINES: usize = 10_000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewPage {
    pub columns: Vec<ColumnDescriptor>,
    pub rows: Vec<Row>,
    pub page: usize,
    pub page_size: usize,
    pub total_records: usize,
    pub total_pages: usize,
}

/// Rows of the 1-based `page` of the line table
pub fn view_page(result: &IngestionResult, page: usize, page_size: usize) -> Result<ViewPage> {
    if page_size == 0 {
        return Err(TabscanError::invalid_argument("page size must be positive"));
    }

    let page = page.max(1);
    let extractor = RowExtractor::new(result);
    let rows = result
        .lines
        .iter()
        .skip((page - 1).saturating_mul(page_size))
        .take(page_size)
        .filter_map(|slot| slot.raw())
        .filter_map(|raw| extractor.row(raw))
        .collect();

    let total_records = result.line_count();
    Ok(ViewPage {
        columns: result.columns.selected(),
        rows,
        page,
        page_size,
        total_records,
        total_pages: total_records.div_ceil(page_size),
    })
}

/// Rows for explicitly selected 1-based line numbers, in selection order
pub fn view_lines(result: &IngestionResult, selection: &LineSelection) -> ViewPage {
    let extractor = RowExtractor::new(result);
    let rows: Vec<Row> = selection
        .lines()
        .iter()
        .filter_map(|&number| number.checked_sub(1))
        .filter_map(|index| result.lines.get(index))
        .filter_map(|slot| slot.raw())
        .filter_map(|raw| extractor.row(raw))
        .collect();

    ViewPage {
        columns: result.columns.selected(),
        page: 1,
        page_size: rows.len(),
        rows,
        total_records: result.line_count(),
        total_pages: 1,
    }
}

struct RowExtractor {
    parser: ColumnParser,
    column_count: usize,
    selected: Vec<usize>,
    encoding: TextEncoding,
}

impl RowExtractor {
    fn new(result: &IngestionResult) -> Self {
        Self {
            parser: ColumnParser::new(result.delimiter),
            column_count: result.column_count(),
            selected: result.columns.selected_indexes(),
            encoding: result.encoding,
        }
    }

    fn row(&self, raw: &[u8]) -> Option<Row> {
        if raw.is_empty() {
            return None;
        }
        let fields = self.parser.parse(raw, self.column_count);
        Some(
            self.selected
                .iter()
                .map(|&column| self.encoding.decode(fields.get(column).copied().unwrap_or_default()))
                .collect(),
        )
    }
}

/// 1-based line numbers parsed from input such as `1, 2, 5-8`
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LineSelection {
    lines: Vec<usize>,
}

impl LineSelection {
    /// Parse comma separated numbers and inclusive `first-last` ranges.
    ///
    /// Whitespace is ignored and parts that are not numbers are skipped. A range
    /// whose first number is not below its last, or a selection of more than
    /// [`MAX_SELECTED_LINES`] lines, is rejected.
    pub fn parse(input: &str) -> Result<Self> {
        let mut lines = Vec::new();

        for part in input.split(',') {
            let part: String = part.chars().filter(|c| !c.is_whitespace()).collect();
            if part.is_empty() {
                continue;
            }

            if let Some((first, last)) = part.split_once('-') {
                let (Ok(first), Ok(last)) = (first.parse::<usize>(), last.parse::<usize>()) else {
                    continue;
                };
                if first >= last {
                    return Err(TabscanError::invalid_argument(format!(
                        "invalid range {first}-{last}"
                    )));
                }
                if last - first >= MAX_SELECTED_LINES {
                    return Err(too_many_lines());
                }
                lines.extend(first..=last);
            } else if let Ok(number) = part.parse::<usize>() {
                lines.push(number);
            }

            if lines.len() > MAX_SELECTED_LINES {
                return Err(too_many_lines());
            }
        }

        Ok(Self { lines })
    }

    pub fn lines(&self) -> &[usize] {
        &self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

fn too_many_lines() -> TabscanError {
    TabscanError::invalid_argument(format!(
        "selection would render more than {MAX_SELECTED_LINES} lines"
    ))
}
