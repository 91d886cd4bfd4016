//! Parse cursor over a growing trace buffer
//!
//! Chunks are appended as they arrive; the cursor keeps the unconsumed tail
//! plus a short window of already-consumed text so faults can show what led
//! up to them. Offsets handed out by [`ParseCursor::absolute`] count from the
//! start of the whole trace, independent of how it was chunked.

/// Consumed bytes kept behind the cursor for fault context
pub const CONTEXT: usize = 32;

#[derive(Debug, Default)]
pub struct ParseCursor {
    buffer: Vec<u8>,
    pos: usize,
    /// Absolute offset of `buffer[0]`
    base: u64,
    /// Chip select line, as last reported by `[` / `]`
    pub chip_selected: bool,
    /// Microseconds accumulated since the last logged command
    pub pending_us: u64,
}

impl ParseCursor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk, dropping consumed text beyond the context window
    pub fn append(&mut self, chunk: &[u8]) {
        if self.pos > CONTEXT {
            let drop = self.pos - CONTEXT;
            self.buffer.drain(..drop);
            self.pos -= drop;
            self.base += drop as u64;
        }
        self.buffer.extend_from_slice(chunk);
    }

    /// The whole retained buffer; positions index into this
    pub fn buffer(&self) -> &[u8] {
        &self.buffer
    }

    pub fn pos(&self) -> usize {
        self.pos
    }

    /// Unconsumed input
    pub fn remaining(&self) -> &[u8] {
        &self.buffer[self.pos..]
    }

    /// Number of unconsumed bytes
    pub fn lookahead(&self) -> usize {
        self.buffer.len() - self.pos
    }

    /// Move to a position previously returned by the tokenizer
    pub fn seek(&mut self, pos: usize) {
        debug_assert!(pos <= self.buffer.len());
        self.pos = pos.min(self.buffer.len());
    }

    pub fn advance(&mut self, count: usize) {
        self.seek(self.pos + count);
    }

    /// Absolute trace offset of a buffer position
    pub fn absolute(&self, pos: usize) -> u64 {
        self.base + pos as u64
    }

    /// Take the time accumulated since the last logged command
    pub fn take_elapsed(&mut self) -> u64 {
        std::mem::take(&mut self.pending_us)
    }

    /// Up to `width` bytes either side of the cursor, as text
    pub fn neighbourhood(&self, width: usize) -> (String, String) {
        let from = self.pos.saturating_sub(width);
        let to = (self.pos + width).min(self.buffer.len());
        (
            printable(&self.buffer[from..self.pos]),
            printable(&self.buffer[self.pos..to]),
        )
    }
}

/// Trace text for display, with line breaks flattened
pub fn printable(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes)
        .chars()
        .map(|c| if c == '\r' || c == '\n' { ' ' } else { c })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_keeps_context_window() {
        let mut cursor = ParseCursor::new();
        cursor.append(&[b'a'; 100]);
        cursor.seek(90);
        cursor.append(b"xyz");

        assert_eq!(cursor.pos(), CONTEXT);
        assert_eq!(cursor.absolute(cursor.pos()), 90);
        assert_eq!(cursor.remaining(), b"aaaaaaaaaaxyz");
        assert_eq!(cursor.lookahead(), 13);
    }

    #[test]
    fn test_neighbourhood() {
        let mut cursor = ParseCursor::new();
        cursor.append(b"[300F]\n[402F0100]");
        cursor.seek(10);
        let (before, after) = cursor.neighbourhood(4);
        assert_eq!(before, "[402");
        assert_eq!(after, "F010");
    }

    #[test]
    fn test_take_elapsed_resets() {
        let mut cursor = ParseCursor::new();
        cursor.pending_us += 250;
        assert_eq!(cursor.take_elapsed(), 250);
        assert_eq!(cursor.take_elapsed(), 0);
    }
}
