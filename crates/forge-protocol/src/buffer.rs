//! Fragment accumulation
//!
//! [`TokenBuffer`] holds the text that has arrived but has not been scanned
//! yet. The scanner marks bytes consumed with [`TokenBuffer::advance`]; the
//! session drops them with [`TokenBuffer::reclaim`] after each feed, so the
//! retained text never grows past the line currently being matched.

/// Growing text buffer with a consumed prefix
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenBuffer {
    data: String,
    /// Bytes of `data` already consumed by the scanner
    cursor: usize,
    /// Absolute stream offset of `data[0]`
    base: usize,
}

impl TokenBuffer {
    /// Create an empty buffer
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an arriving fragment
    pub fn append(&mut self, fragment: &str) {
        self.data.push_str(fragment);
    }

    /// Text not yet consumed by the scanner
    #[inline]
    #[must_use]
    pub fn peek_unconsumed(&self) -> &str {
        &self.data[self.cursor..]
    }

    /// Mark `n` more bytes as consumed
    ///
    /// Clamped to the unconsumed length. `n` must land on a char boundary.
    pub fn advance(&mut self, n: usize) {
        let n = n.min(self.unconsumed_len());
        debug_assert!(self.data.is_char_boundary(self.cursor + n));
        self.cursor += n;
    }

    /// Drop the consumed prefix, returning how many bytes were freed
    pub fn reclaim(&mut self) -> usize {
        let freed = self.cursor;
        if freed > 0 {
            self.data.drain(..freed);
            self.base += freed;
            self.cursor = 0;
        }
        freed
    }

    /// Discard everything, consumed or not; returns the unconsumed byte count
    pub fn truncate(&mut self) -> usize {
        let dropped = self.unconsumed_len();
        self.base += self.data.len();
        self.data.clear();
        self.cursor = 0;
        dropped
    }

    /// Absolute stream offset of the first unconsumed byte
    #[inline]
    #[must_use]
    pub fn offset(&self) -> usize {
        self.base + self.cursor
    }

    /// Total bytes ever appended
    #[inline]
    #[must_use]
    pub fn total_len(&self) -> usize {
        self.base + self.data.len()
    }

    /// Bytes still held in memory, consumed or not
    #[inline]
    #[must_use]
    pub fn retained_len(&self) -> usize {
        self.data.len()
    }

    /// Bytes not yet consumed
    #[inline]
    #[must_use]
    pub fn unconsumed_len(&self) -> usize {
        self.data.len() - self.cursor
    }

    /// Whether nothing is left to scan
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.unconsumed_len() == 0
    }
}

/// Cut `text` into fragments of at most `max_bytes` bytes, never inside a
/// character
///
/// A fragment holding a multi-byte character at its edge grows past the limit
/// to keep it whole. A zero limit is treated as one.
#[must_use]
pub fn split_fragments(text: &str, max_bytes: usize) -> Vec<&str> {
    let size = max_bytes.max(1);
    let mut out = Vec::with_capacity(text.len() / size + 1);
    let mut start = 0;
    while start < text.len() {
        let mut end = (start + size).min(text.len());
        while !text.is_char_boundary(end) {
            end += 1;
        }
        out.push(&text[start..end]);
        start = end;
    }
    out
}
