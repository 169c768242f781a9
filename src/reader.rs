use thiserror::Error;
use tracing::{debug, warn};

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineError {
    #[error("Line longer than {0} bytes")]
    TooLong(usize),
}

/// Splits a byte stream into trimmed text lines.
///
/// Bytes are buffered until `\n`; a partial line survives between calls to
/// [`LineReader::push`]. The buffer never grows over `max_len`: on overflow a
/// single [`LineError::TooLong`] is returned and the rest of that line, up to
/// and including its terminator, is thrown away. A `\r` right before `\n` is
/// part of the terminator and does not count towards `max_len`.
#[derive(Debug)]
pub struct LineReader {
    buf: Vec<u8>,
    max_len: usize,
    /// Skipping the tail of an over-long line.
    discarding: bool,
    /// `\r` seen but not stored yet; it may start a CRLF terminator.
    held_cr: bool,
}

impl LineReader {
    pub fn new(max_len: usize) -> Self {
        Self {
            buf: Vec::with_capacity(max_len.min(1024)),
            max_len,
            discarding: false,
            held_cr: false,
        }
    }

    /// Consume a chunk of input and return every line it completed.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<Result<String, LineError>> {
        let mut lines = Vec::new();
        for &byte in chunk {
            if byte == b'\n' {
                self.held_cr = false;
                if self.discarding {
                    debug!("Dropped tail of an over-long line");
                    self.discarding = false;
                    continue;
                }
                lines.push(Ok(self.take_line()));
                continue;
            }

            if self.discarding {
                continue;
            }

            // Not followed by `\n`, so the held `\r` is content.
            if std::mem::take(&mut self.held_cr) && !self.store(b'\r', &mut lines) {
                continue;
            }

            if byte == b'\r' {
                self.held_cr = true;
                continue;
            }
            self.store(byte, &mut lines);
        }
        lines
    }

    /// Append one content byte. False if the line overflowed.
    fn store(&mut self, byte: u8, lines: &mut Vec<Result<String, LineError>>) -> bool {
        if self.buf.len() >= self.max_len {
            warn!(
                "Line exceeds {} bytes without terminator, discarding",
                self.max_len
            );
            self.buf.clear();
            self.discarding = true;
            lines.push(Err(LineError::TooLong(self.max_len)));
            return false;
        }
        self.buf.push(byte);
        true
    }

    /// Bytes waiting for a terminator.
    pub fn pending(&self) -> usize {
        self.buf.len() + self.held_cr as usize
    }

    fn take_line(&mut self) -> String {
        let line = String::from_utf8_lossy(&self.buf).trim().to_string();
        self.buf.clear();
        line
    }
}

impl Default for LineReader {
    fn default() -> Self {
        Self::new(crate::consts::MAX_LINE_LENGTH)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nothing_without_terminator() {
        let mut reader = LineReader::new(16);
        assert!(reader.push(b"").is_empty());
        assert!(reader.push(b"ABR").is_empty());
        assert_eq!(reader.pending(), 3);
    }

    #[test]
    fn joins_chunks_and_trims() {
        let mut reader = LineReader::new(16);
        assert!(reader.push(b"  AB").is_empty());
        let lines = reader.push(b"RIR\r\nFECHAR\n");
        assert_eq!(lines, vec![Ok("ABRIR".to_string()), Ok("FECHAR".to_string())]);
        assert_eq!(reader.pending(), 0);
    }

    #[test]
    fn blank_line_is_empty_string() {
        let mut reader = LineReader::new(16);
        assert_eq!(reader.push(b" \r\n"), vec![Ok(String::new())]);
    }

    #[test]
    fn too_long_line_is_reported_once_and_skipped() {
        let mut reader = LineReader::new(4);
        let lines = reader.push(b"ABCDEFGHIJ");
        assert_eq!(lines, vec![Err(LineError::TooLong(4))]);
        assert_eq!(reader.pending(), 0);

        // Remainder of the same line is dropped, the next one is parsed.
        let lines = reader.push(b"KLMN\nOK\n");
        assert_eq!(lines, vec![Ok("OK".to_string())]);
    }

    #[test]
    fn exact_length_fits() {
        let mut reader = LineReader::new(5);
        assert_eq!(reader.push(b"ABRIR\n"), vec![Ok("ABRIR".to_string())]);
    }

    #[test]
    fn exact_length_fits_with_crlf() {
        let mut reader = LineReader::new(5);
        assert_eq!(reader.push(b"ABRIR\r\n"), vec![Ok("ABRIR".to_string())]);

        // Terminator split across chunks.
        assert!(reader.push(b"ABRIR\r").is_empty());
        assert_eq!(reader.push(b"\n"), vec![Ok("ABRIR".to_string())]);
    }

    #[test]
    fn carriage_return_inside_line_counts() {
        let mut reader = LineReader::new(5);
        assert_eq!(
            reader.push(b"ABRIR\rX\nOK\n"),
            vec![Err(LineError::TooLong(5)), Ok("OK".to_string())]
        );

        let mut reader = LineReader::new(8);
        assert_eq!(reader.push(b"AB\r\rCD\n"), vec![Ok("AB\r\rCD".to_string())]);
    }
}
