//! Text decoding for header names and output fields

use crate::error::{Result, TabscanError};
use bstr::ByteSlice;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Encoding used to turn raw field bytes into display text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TextEncoding {
    /// UTF-8, invalid sequences replaced with U+FFFD
    #[default]
    Utf8,
    /// 7-bit ASCII, bytes above 0x7F replaced with `?`
    Ascii,
}

impl TextEncoding {
    pub fn decode(self, bytes: &[u8]) -> String {
        match self {
            TextEncoding::Utf8 => bytes.to_str_lossy().into_owned(),
            TextEncoding::Ascii => bytes
                .iter()
                .map(|&b| if b.is_ascii() { b as char } else { '?' })
                .collect(),
        }
    }
}

/// Resolve a one-character delimiter string to its byte
pub fn parse_delimiter(input: &str) -> Result<u8> {
    let mut chars = input.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if c.is_ascii() => Ok(c as u8),
        (Some(_), None) => Err(TabscanError::invalid_argument(format!(
            "Delimiter '{input}' must be an ASCII character"
        ))),
        _ => Err(TabscanError::invalid_argument(
            "Delimiter must be exactly one character",
        )),
    }
}

impl fmt::Display for TextEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TextEncoding::Utf8 => write!(f, "UTF8"),
            TextEncoding::Ascii => write!(f, "ASCII"),
        }
    }
}

impl FromStr for TextEncoding {
    type Err = TabscanError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "utf8" | "utf-8" => Ok(TextEncoding::Utf8),
            "ascii" => Ok(TextEncoding::Ascii),
            other => Err(TabscanError::invalid_argument(format!(
                "Unsupported encoding '{other}', expected utf8 or ascii"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_utf8_lossy() {
        assert_eq!(TextEncoding::Utf8.decode("żółw".as_bytes()), "żółw");
        assert_eq!(TextEncoding::Utf8.decode(b"ab\xffc"), "ab\u{FFFD}c");
    }

    #[test]
    fn test_decode_ascii_replaces_high_bytes() {
        assert_eq!(TextEncoding::Ascii.decode(b"abc"), "abc");
        assert_eq!(TextEncoding::Ascii.decode("é".as_bytes()), "??");
    }

    #[test]
    fn test_parse_and_display() {
        assert_eq!("UTF8".parse::<TextEncoding>().unwrap(), TextEncoding::Utf8);
        assert_eq!("ascii".parse::<TextEncoding>().unwrap(), TextEncoding::Ascii);
        assert!("latin1".parse::<TextEncoding>().is_err());
        assert_eq!(TextEncoding::Ascii.to_string(), "ASCII");
    }

    #[test]
    fn test_parse_delimiter() {
        assert_eq!(parse_delimiter(";").unwrap(), b';');
        assert_eq!(parse_delimiter("\t").unwrap(), b'\t');
        assert!(parse_delimiter("§").is_err());
        assert!(parse_delimiter(";;").is_err());
        assert!(parse_delimiter("").is_err());
    }
}
