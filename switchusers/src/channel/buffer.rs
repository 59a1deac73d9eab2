//! Pattern buffer with tail-search optimization.
//!
//! Only the last N bytes of the accumulated output are searched for prompt
//! patterns. Long verification output (a full running-config) would otherwise
//! be rescanned on every chunk.

use std::fmt;

use bytes::BytesMut;
use regex::bytes::Regex;
use vte::{Parser, Perform};

/// Buffer for accumulating ANSI-stripped output and searching its tail.
pub struct PatternBuffer {
    /// The accumulated output buffer.
    buffer: BytesMut,

    /// How many bytes from the end to search for patterns.
    search_depth: usize,

    /// Escape sequence parser. Kept across chunks since a sequence can be split.
    parser: Parser,
}

impl PatternBuffer {
    /// Create a new pattern buffer with the specified search depth.
    pub fn new(search_depth: usize) -> Self {
        Self {
            buffer: BytesMut::with_capacity(4096),
            search_depth,
            parser: Parser::new(),
        }
    }

    /// Extend the buffer with new data, stripping terminal escape sequences.
    pub fn extend(&mut self, data: &[u8]) {
        let mut printable = Printable {
            out: &mut self.buffer,
        };
        self.parser.advance(&mut printable, data);
    }

    /// Search only the tail of the buffer for the pattern.
    ///
    /// Returns the absolute offset where the match starts.
    pub fn find_tail(&self, pattern: &Regex) -> Option<usize> {
        let start = self.buffer.len().saturating_sub(self.search_depth);
        pattern.find(&self.buffer[start..]).map(|m| start + m.start())
    }

    /// Check if the tail contains a pattern match.
    pub fn tail_contains(&self, pattern: &Regex) -> bool {
        self.find_tail(pattern).is_some()
    }

    /// Take ownership of the buffer contents and reset.
    pub fn take(&mut self) -> Vec<u8> {
        self.buffer.split().to_vec()
    }

    /// Get a reference to the buffer contents.
    pub fn as_slice(&self) -> &[u8] {
        &self.buffer
    }

    /// Get the current buffer length.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Check if the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Clear the buffer.
    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}

impl Default for PatternBuffer {
    fn default() -> Self {
        Self::new(1000)
    }
}

impl fmt::Debug for PatternBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PatternBuffer")
            .field("len", &self.buffer.len())
            .field("search_depth", &self.search_depth)
            .finish()
    }
}

/// Collects printable characters and line control bytes, dropping escapes.
struct Printable<'a> {
    out: &'a mut BytesMut,
}

impl Perform for Printable<'_> {
    fn print(&mut self, c: char) {
        let mut utf8 = [0u8; 4];
        self.out.extend_from_slice(c.encode_utf8(&mut utf8).as_bytes());
    }

    fn execute(&mut self, byte: u8) {
        match byte {
            b'\n' | b'\r' | b'\t' => self.out.extend_from_slice(&[byte]),
            // Backspace, used by paging prompts to erase "--More--"
            0x08 => {
                // Erase a whole character, not just its last byte
                let mut len = self.out.len();
                while len > 0 {
                    len -= 1;
                    if self.out[len] & 0xC0 != 0x80 {
                        break;
                    }
                }
                self.out.truncate(len);
            }
            _ => {}
        }
    }
}
