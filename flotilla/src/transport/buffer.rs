//! Output buffer with tail-limited prompt search.
//!
//! Prompt patterns are only ever at the end of device output, so the
//! buffer searches just the last `search_depth` bytes. For large captures
//! (a full running-config, a routing table) this keeps prompt detection
//! O(search_depth) per read instead of O(output_size).

use bytes::BytesMut;
use regex::bytes::Regex;

/// Accumulates raw session output and searches its tail for a prompt.
#[derive(Debug)]
pub struct PromptBuffer {
    data: BytesMut,
    search_depth: usize,
}

impl PromptBuffer {
    /// Create a buffer searching the last `search_depth` bytes for prompts.
    pub fn new(search_depth: usize) -> Self {
        Self {
            data: BytesMut::with_capacity(4096),
            search_depth,
        }
    }

    /// Append raw output.
    pub fn extend(&mut self, chunk: &[u8]) {
        self.data.extend_from_slice(chunk);
    }

    /// Search the buffer tail for the prompt pattern.
    ///
    /// Returns the absolute byte offset where the match starts.
    pub fn find_prompt(&self, pattern: &Regex) -> Option<usize> {
        let start = self.data.len().saturating_sub(self.search_depth);
        pattern.find(&self.data[start..]).map(|m| start + m.start())
    }

    /// Take the accumulated output as text, normalizing line endings.
    pub fn take_string(&mut self) -> String {
        let text = String::from_utf8_lossy(&self.data).replace('\r', "");
        self.data.clear();
        text
    }

    /// Discard everything accumulated so far.
    pub fn clear(&mut self) {
        self.data.clear();
    }

    /// Bytes currently buffered.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_in_tail() {
        let mut buffer = PromptBuffer::new(64);
        buffer.extend(&[b'x'; 500]);
        buffer.extend(b"\nrouter#");

        let pattern = Regex::new(r"router#").unwrap();
        let at = buffer.find_prompt(&pattern).unwrap();
        assert_eq!(at, 501);
    }

    #[test]
    fn test_prompt_outside_search_depth() {
        let mut buffer = PromptBuffer::new(16);
        buffer.extend(b"router#");
        buffer.extend(&[b'x'; 500]);

        let pattern = Regex::new(r"router#").unwrap();
        assert!(buffer.find_prompt(&pattern).is_none());
    }

    #[test]
    fn test_take_string_normalizes_crlf() {
        let mut buffer = PromptBuffer::new(64);
        buffer.extend(b"line one\r\nline two\r\nrouter#");
        assert_eq!(buffer.take_string(), "line one\nline two\nrouter#");
        assert!(buffer.is_empty());
    }
}
