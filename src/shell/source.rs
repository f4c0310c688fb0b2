//! Reading script sources
//!
//! [`SourceReader`] wraps a buffered stream with one byte of pushback, which
//! is all the shebang check needs. [`read_line_bounded`] reads interactive
//! input the way a fixed-size line buffer would.

use std::io::{self, BufRead};

pub struct SourceReader<R> {
    inner: R,
    pushback: Option<u8>,
}

impl<R: BufRead> SourceReader<R> {
    pub fn new(inner: R) -> Self {
        SourceReader {
            inner,
            pushback: None,
        }
    }

    pub fn next_byte(&mut self) -> io::Result<Option<u8>> {
        if let Some(byte) = self.pushback.take() {
            return Ok(Some(byte));
        }
        let buf = self.inner.fill_buf()?;
        let Some(&byte) = buf.first() else {
            return Ok(None);
        };
        self.inner.consume(1);
        Ok(Some(byte))
    }

    /// Pushes one byte back; a second call replaces the first.
    pub fn unread(&mut self, byte: u8) {
        self.pushback = Some(byte);
    }

    /// Drops a first line starting with `#`. The line terminator stays in
    /// the stream so line numbers are unchanged.
    pub fn skip_shebang(&mut self) -> io::Result<()> {
        match self.next_byte()? {
            Some(b'#') => {
                while let Some(byte) = self.next_byte()? {
                    if byte == b'\n' || byte == b'\r' {
                        self.unread(byte);
                        break;
                    }
                }
            }
            Some(byte) => self.unread(byte),
            None => {}
        }
        Ok(())
    }

    /// Everything left in the stream. Invalid UTF-8 is replaced.
    pub fn read_to_string(&mut self) -> io::Result<String> {
        let mut bytes = Vec::new();
        if let Some(byte) = self.pushback.take() {
            bytes.push(byte);
        }
        self.inner.read_to_end(&mut bytes)?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

/// Reads through the next newline, but at most `buffer_size - 1` bytes.
/// Returns `None` at end of input. A piece may end inside a multi-byte
/// character, so callers decode only after joining pieces.
pub fn read_line_bounded<R: BufRead + ?Sized>(
    reader: &mut R,
    buffer_size: usize,
) -> io::Result<Option<Vec<u8>>> {
    let limit = buffer_size.saturating_sub(1).max(1);
    let mut line = Vec::new();

    while line.len() < limit {
        let buf = reader.fill_buf()?;
        if buf.is_empty() {
            break;
        }
        let room = limit - line.len();
        let available = &buf[..buf.len().min(room)];
        let (taken, done) = match available.iter().position(|&b| b == b'\n') {
            Some(newline) => (newline + 1, true),
            None => (available.len(), false),
        };
        line.extend_from_slice(&available[..taken]);
        reader.consume(taken);
        if done {
            break;
        }
    }

    if line.is_empty() {
        return Ok(None);
    }
    Ok(Some(line))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_shebang_keeps_line_terminator() {
        let mut reader = SourceReader::new(Cursor::new("#!/usr/bin/env minjs\nprint(1);\n"));
        reader.skip_shebang().unwrap();
        assert_eq!(reader.read_to_string().unwrap(), "\nprint(1);\n");
    }

    #[test]
    fn test_no_shebang_keeps_first_byte() {
        let mut reader = SourceReader::new(Cursor::new("2+2;"));
        reader.skip_shebang().unwrap();
        assert_eq!(reader.read_to_string().unwrap(), "2+2;");
    }

    #[test]
    fn test_shebang_only() {
        let mut reader = SourceReader::new(Cursor::new("#!minjs"));
        reader.skip_shebang().unwrap();
        assert_eq!(reader.read_to_string().unwrap(), "");
    }

    #[test]
    fn test_bounded_lines() {
        let mut input = Cursor::new("abcdef\ngh");
        assert_eq!(read_line_bounded(&mut input, 4).unwrap().as_deref(), Some(&b"abc"[..]));
        assert_eq!(read_line_bounded(&mut input, 4).unwrap().as_deref(), Some(&b"def"[..]));
        assert_eq!(read_line_bounded(&mut input, 4).unwrap().as_deref(), Some(&b"\n"[..]));
        assert_eq!(read_line_bounded(&mut input, 256).unwrap().as_deref(), Some(&b"gh"[..]));
        assert_eq!(read_line_bounded(&mut input, 256).unwrap(), None);
    }

    #[test]
    fn test_bounded_pieces_split_characters_losslessly() {
        let mut input = Cursor::new("abé\n".as_bytes());
        let first = read_line_bounded(&mut input, 4).unwrap().unwrap();
        let second = read_line_bounded(&mut input, 4).unwrap().unwrap();
        assert_eq!(first, b"ab\xc3");
        let mut joined = first;
        joined.extend_from_slice(&second);
        assert_eq!(String::from_utf8(joined).unwrap(), "abé\n");
    }
}
