//! Cursor and scanning helpers over raw byte sequences
//!
//! All scanning uses memchr so delimiter and quote lookups stay SIMD accelerated
//! even for very wide rows.

use memchr::{memchr, memchr_iter};

/// Forward-only reader over a byte slice.
///
/// Every read returns a sub-slice of the original data, so fields borrowed from a
/// line live as long as the line itself.
#[derive(Debug, Clone)]
pub struct ByteCursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteCursor<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// True once every byte has been consumed
    pub fn is_end(&self) -> bool {
        self.pos >= self.data.len()
    }

    /// Bytes not yet consumed
    pub fn remaining(&self) -> &'a [u8] {
        &self.data[self.pos.min(self.data.len())..]
    }

    /// Read up to the next `delimiter` and consume the delimiter itself.
    ///
    /// Returns `None` and leaves the cursor untouched when no delimiter remains.
    pub fn read_to(&mut self, delimiter: u8) -> Option<&'a [u8]> {
        let rest = self.remaining();
        let offset = memchr(delimiter, rest)?;
        self.pos += offset + 1;
        Some(&rest[..offset])
    }

    /// Consume and return everything that is left
    pub fn read_rest(&mut self) -> &'a [u8] {
        let rest = self.remaining();
        self.pos = self.data.len();
        rest
    }

    /// Read one field, honoring an optional quote byte.
    ///
    /// A field starting with `quote` runs to the matching closing quote; any bytes
    /// between the closing quote and the next delimiter are skipped together with
    /// the delimiter. An unterminated quote or a missing delimiter yields the
    /// remainder of the data unchanged.
    pub fn read_field(&mut self, delimiter: u8, quote: Option<u8>) -> &'a [u8] {
        if let Some(quote) = quote {
            if self.peek() == Some(quote) {
                return self.read_quoted(delimiter, quote);
            }
        }

        match self.read_to(delimiter) {
            Some(field) => field,
            None => self.read_rest(),
        }
    }

    fn peek(&self) -> Option<u8> {
        self.data.get(self.pos).copied()
    }

    fn read_quoted(&mut self, delimiter: u8, quote: u8) -> &'a [u8] {
        let content_start = self.pos + 1;
        let content = &self.data[content_start..];

        let Some(close) = memchr(quote, content) else {
            return self.read_rest();
        };

        let field = &content[..close];
        self.pos = content_start + close + 1;

        // Tolerate stray bytes between the closing quote and the delimiter
        match memchr(delimiter, self.remaining()) {
            Some(offset) => self.pos += offset + 1,
            None => self.pos = self.data.len(),
        }

        field
    }
}

/// Split on every `delimiter` without any quote handling.
///
/// Empty fields are kept; a trailing delimiter does not open an extra field and an
/// empty input yields no fields at all.
pub fn split_plain(line: &[u8], delimiter: u8) -> Vec<&[u8]> {
    let mut fields = Vec::new();
    let mut start = 0;

    for pos in memchr_iter(delimiter, line) {
        fields.push(&line[start..pos]);
        start = pos + 1;
    }

    if start < line.len() {
        fields.push(&line[start..]);
    }

    fields
}

/// Strip one trailing `\n` and then one trailing `\r`
pub fn trim_line_ending(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}
