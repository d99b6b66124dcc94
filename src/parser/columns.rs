//! Zero-copy column splitting for delimited rows
//!
//! The parser never fails: short rows, unmatched quotes and surplus fields all
//! degrade to empty or truncated output instead of an error.

use crate::parser::sequence::ByteCursor;

/// Quote byte used when none is configured explicitly
pub const DEFAULT_QUOTE: u8 = b'"';

/// Splits raw lines into a fixed number of fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnParser {
    delimiter: u8,
    quote: Option<u8>,
}

impl ColumnParser {
    /// Parser honoring `"`-quoted fields
    pub fn new(delimiter: u8) -> Self {
        Self {
            delimiter,
            quote: Some(DEFAULT_QUOTE),
        }
    }

    /// Parser with a custom quote byte, or no quoting at all
    pub fn with_quote(delimiter: u8, quote: Option<u8>) -> Self {
        Self { delimiter, quote }
    }

    /// Split `line` into exactly `column_count` slices borrowed from `line`.
    ///
    /// Fields the line does not contain are returned empty; fields beyond
    /// `column_count` are ignored.
    pub fn parse<'a>(&self, line: &'a [u8], column_count: usize) -> Vec<&'a [u8]> {
        let mut fields = Vec::with_capacity(column_count);
        let mut cursor = ByteCursor::new(line);

        for _ in 0..column_count {
            if cursor.is_end() {
                break;
            }
            fields.push(cursor.read_field(self.delimiter, self.quote));
        }

        fields.resize(column_count, &[]);
        fields
    }

    /// Parse `line` and return the single field at `column`, if the row has one
    pub fn field<'a>(&self, line: &'a [u8], column: usize) -> Option<&'a [u8]> {
        let mut cursor = ByteCursor::new(line);
        for _ in 0..column {
            if cursor.is_end() {
                return None;
            }
            cursor.read_field(self.delimiter, self.quote);
        }
        if cursor.is_end() {
            return None;
        }
        Some(cursor.read_field(self.delimiter, self.quote))
    }
}
