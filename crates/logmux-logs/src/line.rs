use memchr::memchr;

/// Reassembles complete lines from arbitrarily chunked bytes of one source.
///
/// Bytes are only decoded once a full line is available. A `\n` byte can
/// never occur inside a multi-byte UTF-8 sequence, so a character split
/// across two chunks is always held back intact with the trailing fragment.
/// Invalid UTF-8 is replaced with U+FFFD rather than rejected.
#[derive(Debug, Default)]
pub struct LineReassembler {
    /// Undelivered bytes; everything before `start` has been consumed
    pending: Vec<u8>,

    /// Offset of the first unconsumed byte in `pending`
    start: usize,
}

impl LineReassembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk and iterate the lines it completes.
    ///
    /// Lines not pulled from the iterator stay buffered and are returned by
    /// the next call.
    pub fn push(&mut self, chunk: &[u8]) -> Lines<'_> {
        self.pending.extend_from_slice(chunk);
        Lines { inner: self }
    }

    /// Emit the unterminated trailing fragment, if any, at end of stream
    pub fn finish(&mut self) -> Option<String> {
        self.compact();
        if self.pending.is_empty() {
            return None;
        }
        let mut rest = std::mem::take(&mut self.pending);
        if rest.last() == Some(&b'\r') {
            rest.pop();
        }
        Some(decode(&rest))
    }

    /// Bytes currently held back
    pub fn buffered(&self) -> usize {
        self.pending.len() - self.start
    }

    fn next_line(&mut self) -> Option<String> {
        let tail = &self.pending[self.start..];
        let newline = memchr(b'\n', tail)?;
        let mut line = &tail[..newline];
        if line.last() == Some(&b'\r') {
            line = &line[..line.len() - 1];
        }
        let decoded = decode(line);
        self.start += newline + 1;
        Some(decoded)
    }

    fn compact(&mut self) {
        if self.start > 0 {
            self.pending.drain(..self.start);
            self.start = 0;
        }
    }
}

/// Lazy iterator over the lines completed by the last pushed chunk
pub struct Lines<'a> {
    inner: &'a mut LineReassembler,
}

impl Iterator for Lines<'_> {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        self.inner.next_line()
    }
}

impl Drop for Lines<'_> {
    fn drop(&mut self) {
        self.inner.compact();
    }
}

fn decode(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}
