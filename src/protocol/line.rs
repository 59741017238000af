//! Line framing for the modem's ASCII command protocol.
//!
//! Every command and every response travels as one line:
//! ```text
//! ┌──────────────────────┬──────────┐
//! │  ASCII text          │  \r\n    │
//! └──────────────────────┴──────────┘
//! ```
//! The raw `SKSENDTO` request is the exception: its binary payload follows
//! the command text directly and carries no terminator.

use bytes::{BufMut, Bytes, BytesMut};

/// Line terminator used in both directions.
pub const LINE_TERMINATOR: &[u8] = b"\r\n";

/// Most bytes buffered without a line terminator before they are dropped.
pub const MAX_LINE_LEN: usize = 4096;

/// Encodes a command line, appending the terminator.
#[must_use]
pub fn encode(line: &str) -> Bytes {
    let mut buf = BytesMut::with_capacity(line.len() + LINE_TERMINATOR.len());
    buf.put_slice(line.as_bytes());
    buf.put_slice(LINE_TERMINATOR);
    buf.freeze()
}

/// Line decoder that handles partial data.
#[derive(Debug, Default)]
pub struct LineDecoder {
    buffer: BytesMut,
}

impl LineDecoder {
    /// Creates a new line decoder.
    #[must_use]
    pub fn new() -> Self {
        Self {
            buffer: BytesMut::new(),
        }
    }

    /// Feeds data into the decoder.
    ///
    /// An unterminated run longer than [`MAX_LINE_LEN`] is discarded.
    pub fn feed(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);

        if self.buffer.len() > MAX_LINE_LEN && !self.buffer.contains(&b'\n') {
            tracing::warn!(
                "discarding {} bytes without a line terminator",
                self.buffer.len()
            );
            self.buffer.clear();
        }
    }

    /// Takes the next complete line, without its terminator.
    ///
    /// Returns `None` if no `\n` has been buffered yet. A bare `\n` is
    /// accepted as a terminator; a trailing `\r` is stripped either way.
    pub fn next_line(&mut self) -> Option<String> {
        let end = self.buffer.iter().position(|&b| b == b'\n')?;
        let raw = self.buffer.split_to(end + 1);

        let mut content = &raw[..end];
        if let Some(stripped) = content.strip_suffix(b"\r") {
            content = stripped;
        }

        Some(String::from_utf8_lossy(content).into_owned())
    }

    /// Returns the number of bytes currently buffered.
    #[must_use]
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Clears the internal buffer.
    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_appends_terminator() {
        let line = encode("SKSREG S2 21");
        assert_eq!(&line[..], b"SKSREG S2 21\r\n");
    }

    #[test]
    fn test_decode_complete_line() {
        let mut decoder = LineDecoder::new();
        decoder.feed(b"OK\r\n");

        assert_eq!(decoder.next_line().as_deref(), Some("OK"));
        assert_eq!(decoder.buffered(), 0);
    }

    #[test]
    fn test_decode_partial_line() {
        let mut decoder = LineDecoder::new();

        decoder.feed(b"EVENT 2");
        assert_eq!(decoder.next_line(), None);

        decoder.feed(b"5 FE80:0000\r\n");
        assert_eq!(decoder.next_line().as_deref(), Some("EVENT 25 FE80:0000"));
    }

    #[test]
    fn test_decode_multiple_lines() {
        let mut decoder = LineDecoder::new();
        decoder.feed(b"SKSETRBID 0000\r\nOK\r\nEVE");

        assert_eq!(decoder.next_line().as_deref(), Some("SKSETRBID 0000"));
        assert_eq!(decoder.next_line().as_deref(), Some("OK"));
        assert_eq!(decoder.next_line(), None);
        assert_eq!(decoder.buffered(), 3);
    }

    #[test]
    fn test_decode_keeps_indentation_and_empty_lines() {
        let mut decoder = LineDecoder::new();
        decoder.feed(b"  Channel:39\r\n\r\n");

        assert_eq!(decoder.next_line().as_deref(), Some("  Channel:39"));
        assert_eq!(decoder.next_line().as_deref(), Some(""));
    }

    #[test]
    fn test_decode_bare_newline() {
        let mut decoder = LineDecoder::new();
        decoder.feed(b"OK\n");
        assert_eq!(decoder.next_line().as_deref(), Some("OK"));
    }

    #[test]
    fn test_unterminated_overflow_is_dropped() {
        let mut decoder = LineDecoder::new();
        decoder.feed(&[b'A'; MAX_LINE_LEN]);
        assert_eq!(decoder.buffered(), MAX_LINE_LEN);

        decoder.feed(b"A");
        assert_eq!(decoder.buffered(), 0);

        decoder.feed(b"OK\r\n");
        assert_eq!(decoder.next_line().as_deref(), Some("OK"));
    }

    #[test]
    fn test_long_buffer_with_terminator_is_kept() {
        let mut decoder = LineDecoder::new();
        decoder.feed(b"OK\r\n");
        decoder.feed(&[b'A'; MAX_LINE_LEN]);

        assert_eq!(decoder.next_line().as_deref(), Some("OK"));
        assert_eq!(decoder.buffered(), MAX_LINE_LEN);
    }

    #[test]
    fn test_clear() {
        let mut decoder = LineDecoder::new();
        decoder.feed(b"stale");
        decoder.clear();
        assert_eq!(decoder.buffered(), 0);
    }
}
