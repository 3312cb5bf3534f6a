//! Bounded line reading for the command phase

use std::io;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt};

use crate::constants::buffer::COMMAND_MAX;

/// Outcome of reading one client line
#[derive(Debug, PartialEq, Eq)]
pub enum LineRead {
    /// A complete line is in the buffer, terminator included
    Line,
    /// Client closed the connection (a partial final line is dropped)
    Eof,
    /// No line terminator within the length limit
    TooLong,
}

/// Read one LF-terminated line into `buf`, reading no further
///
/// `buf` is cleared first. Anything after the line stays buffered in
/// `reader`.
pub async fn read_command_line<R>(reader: &mut R, buf: &mut Vec<u8>) -> io::Result<LineRead>
where
    R: AsyncBufRead + Unpin,
{
    buf.clear();
    let mut limited = (&mut *reader).take(COMMAND_MAX as u64);
    let n = limited.read_until(b'\n', buf).await?;

    if n == 0 {
        return Ok(LineRead::Eof);
    }
    if buf.last() == Some(&b'\n') {
        return Ok(LineRead::Line);
    }
    if buf.len() >= COMMAND_MAX {
        Ok(LineRead::TooLong)
    } else {
        Ok(LineRead::Eof)
    }
}

/// The line as text, without CRLF/LF
pub fn line_text(raw: &[u8]) -> String {
    let trimmed = raw
        .strip_suffix(b"\n")
        .map(|l| l.strip_suffix(b"\r").unwrap_or(l))
        .unwrap_or(raw);
    String::from_utf8_lossy(trimmed).into_owned()
}
