//! Line splitting over a buffered async reader

use crate::parser::trim_line_ending;
use memchr::memchr;
use std::io;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

/// Yields raw lines from an [`AsyncBufRead`] without decoding them.
///
/// Lines are delimited by `\n`; one trailing `\r` is removed. A final line that is
/// not newline terminated is still returned. Lines spanning several buffer fills
/// are stitched together in an internal carry buffer.
pub struct LineReader<R> {
    inner: R,
    carry: Vec<u8>,
    lines_read: u64,
    finished: bool,
}

impl<R: AsyncBufRead + Unpin> LineReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            carry: Vec::new(),
            lines_read: 0,
            finished: false,
        }
    }

    /// Lines returned so far
    pub fn lines_read(&self) -> u64 {
        self.lines_read
    }

    /// Next raw line, or `None` once the reader is exhausted
    pub async fn next_line(&mut self) -> io::Result<Option<Vec<u8>>> {
        if self.finished {
            return Ok(None);
        }

        loop {
            let available = self.inner.fill_buf().await?;

            if available.is_empty() {
                self.finished = true;
                if self.carry.is_empty() {
                    return Ok(None);
                }
                return Ok(Some(self.take_line()));
            }

            match memchr(b'\n', available) {
                Some(pos) => {
                    self.carry.extend_from_slice(&available[..pos]);
                    self.inner.consume(pos + 1);
                    return Ok(Some(self.take_line()));
                }
                None => {
                    let len = available.len();
                    self.carry.extend_from_slice(available);
                    self.inner.consume(len);
                }
            }
        }
    }

    fn take_line(&mut self) -> Vec<u8> {
        let mut line = std::mem::take(&mut self.carry);
        let len = trim_line_ending(&line).len();
        line.truncate(len);
        self.lines_read += 1;
        line
    }
}
