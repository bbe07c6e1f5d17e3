//! Pattern buffer with efficient tail-search optimization.
//!
//! Only the last N bytes of the buffer are searched for prompt patterns,
//! rather than the entire output. For large outputs (e.g. `show running-config`
//! on a core switch) this keeps prompt detection cheap.

use bytes::BytesMut;
use regex::bytes::Regex;

/// Buffer for accumulating output and searching its tail for a prompt.
#[derive(Debug)]
pub struct PatternBuffer {
    /// The accumulated output buffer.
    buffer: BytesMut,

    /// How many bytes from the end to search for patterns.
    search_depth: usize,
}

impl PatternBuffer {
    /// Create a new pattern buffer with the specified search depth.
    pub fn new(search_depth: usize) -> Self {
        Self {
            buffer: BytesMut::with_capacity(4096),
            search_depth,
        }
    }

    /// Extend the buffer with new data, stripping ANSI escape codes.
    pub fn extend(&mut self, data: &[u8]) {
        let cleaned = strip_ansi_escapes::strip(data);
        self.buffer.extend_from_slice(&cleaned);
    }

    /// Absolute end offset of a prompt sitting at the end of the buffer.
    ///
    /// Only the last `search_depth` bytes are searched, and only a match
    /// followed by nothing but whitespace counts: a prompt-like line in the
    /// middle of the output is not the prompt.
    pub fn prompt_end(&self, pattern: &Regex) -> Option<usize> {
        let start = self.buffer.len().saturating_sub(self.search_depth);
        let tail = &self.buffer[start..];
        let m = pattern.find_iter(tail).last()?;
        tail[m.end()..]
            .iter()
            .all(u8::is_ascii_whitespace)
            .then_some(start + m.end())
    }

    /// Remove and return everything up to `end`, keeping the rest.
    pub fn take_through(&mut self, end: usize) -> Vec<u8> {
        let end = end.min(self.buffer.len());
        self.buffer.split_to(end).to_vec()
    }

    /// Take ownership of the buffer contents and reset.
    pub fn take(&mut self) -> Vec<u8> {
        self.buffer.split().to_vec()
    }

    /// Get a reference to the buffer contents.
    pub fn as_slice(&self) -> &[u8] {
        &self.buffer
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ansi_stripping() {
        let mut buffer = PatternBuffer::new(100);
        // Typical ANSI color code: \x1b[32m (green)
        buffer.extend(b"\x1b[32mGreen text\x1b[0m");
        assert_eq!(buffer.as_slice(), b"Green text");
    }

    #[test]
    fn test_prompt_found_in_tail() {
        let mut buffer = PatternBuffer::new(20);
        buffer.extend(&[b'x'; 100]);
        buffer.extend(b"\nrouter#");

        let pattern = Regex::new(r"(?m)^router#\s?$").unwrap();
        assert_eq!(buffer.prompt_end(&pattern), Some(108));
    }

    #[test]
    fn test_prompt_outside_tail_is_ignored() {
        let mut buffer = PatternBuffer::new(10);
        buffer.extend(b"router#\n");
        buffer.extend(&[b'x'; 100]);

        let pattern = Regex::new(r"(?m)^router#$").unwrap();
        assert!(buffer.prompt_end(&pattern).is_none());
    }

    #[test]
    fn test_prompt_must_end_the_buffer() {
        let mut buffer = PatternBuffer::new(200);
        buffer.extend(b"router#\nstill printing");

        let pattern = Regex::new(r"(?m)^router#\s?$").unwrap();
        assert!(buffer.prompt_end(&pattern).is_none());

        buffer.extend(b"\nrouter# ");
        assert!(buffer.prompt_end(&pattern).is_some());
    }

    #[test]
    fn test_take_through_keeps_remainder() {
        let mut buffer = PatternBuffer::new(100);
        buffer.extend(b"output\nrouter#leftover");
        assert_eq!(buffer.take_through(14), b"output\nrouter#");
        assert_eq!(buffer.as_slice(), b"leftover");
        assert_eq!(buffer.take(), b"leftover");
        assert!(buffer.is_empty());
    }
}
