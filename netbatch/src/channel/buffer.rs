//! Output buffer with tail-only pattern search.
//!
//! Prompts only ever appear at the end of device output, so pattern checks
//! look at the last `search_depth` bytes instead of rescanning everything
//! received so far.

use std::ops::Range;

use regex::bytes::Regex;

/// Accumulates channel output with ANSI escapes stripped.
#[derive(Debug)]
pub struct PatternBuffer {
    buffer: Vec<u8>,
    search_depth: usize,
}

impl PatternBuffer {
    /// Create a buffer searching the last `search_depth` bytes.
    pub fn new(search_depth: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(4096),
            search_depth,
        }
    }

    /// Append raw channel data, dropping terminal escape sequences.
    pub fn extend(&mut self, data: &[u8]) {
        let cleaned = strip_ansi_escapes::strip(data);
        self.buffer.extend_from_slice(&cleaned);
    }

    /// Find `pattern` in the tail; the range is relative to the whole buffer.
    pub fn search_tail(&self, pattern: &Regex) -> Option<Range<usize>> {
        let start = self.buffer.len().saturating_sub(self.search_depth);
        pattern
            .find(&self.buffer[start..])
            .map(|m| (start + m.start())..(start + m.end()))
    }

    /// Take the contents as text and reset the buffer.
    pub fn take_string(&mut self) -> String {
        let data = std::mem::take(&mut self.buffer);
        String::from_utf8_lossy(&data).into_owned()
    }

    /// Current length in bytes.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Whether nothing has been received.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }
}

impl Default for PatternBuffer {
    fn default() -> Self {
        Self::new(1000)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ansi_stripping() {
        let mut buffer = PatternBuffer::new(100);
        buffer.extend(b"\x1b[32m<HUAWEI>\x1b[0m");
        assert_eq!(buffer.take_string(), "<HUAWEI>");
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_tail_search_offsets() {
        let mut buffer = PatternBuffer::new(20);
        buffer.extend(&[b'x'; 100]);
        buffer.extend(b"\n<SW1>");

        let pattern = Regex::new(r"<SW1>").unwrap();
        assert_eq!(buffer.search_tail(&pattern), Some(101..106));
    }

    #[test]
    fn test_prompt_outside_tail_ignored() {
        let mut buffer = PatternBuffer::new(10);
        buffer.extend(b"<SW1>");
        buffer.extend(&[b'x'; 100]);

        let pattern = Regex::new(r"<SW1>").unwrap();
        assert!(buffer.search_tail(&pattern).is_none());
        assert_eq!(buffer.len(), 105);
    }
}
