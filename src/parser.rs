//! Byte-level helpers and the delimiter/quote aware column parser.
//!
//! Everything here works on borrowed byte slices so that fields can be
//! inspected without copying the raw line they come from.

pub mod columns;
pub mod sequence;
pub mod text;

pub use columns::{ColumnParser, DEFAULT_QUOTE};
pub use sequence::{split_plain, trim_line_ending, ByteCursor};
pub use text::{parse_delimiter, TextEncoding};
