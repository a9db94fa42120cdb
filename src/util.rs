use std::io;

/// A fixed-capacity byte buffer holding a window of pending bytes `[start, end)` that can be slid
/// back to the front to reclaim consumed space.
#[derive(Debug)]
pub(crate) struct SlidingBuffer {
    buf: Box<[u8]>,
    start: usize,
    end: usize,
}

impl AsRef<[u8]> for SlidingBuffer {
    fn as_ref(&self) -> &[u8] {
        &self.buf[self.start..self.end]
    }
}

impl SlidingBuffer {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: vec![0; capacity].into_boxed_slice(),
            start: 0,
            end: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn clear(&mut self) {
        self.start = 0;
        self.end = 0;
    }

    /// Returns the free space after the pending window.
    pub fn unfilled(&mut self) -> &mut [u8] {
        &mut self.buf[self.end..]
    }

    /// Marks the first `n` bytes of the unfilled space as pending.
    pub fn advance(&mut self, n: usize) {
        debug_assert!(self.end + n <= self.capacity());
        self.end = self.capacity().min(self.end + n);
    }

    /// Removes `count` bytes from the front of the pending window.
    pub fn consume(&mut self, count: usize) {
        debug_assert!(count <= self.len());
        if count < self.len() {
            self.start += count;
        } else {
            self.clear();
        }
    }

    /// Keeps only the first `len` pending bytes.
    pub fn truncate(&mut self, len: usize) {
        self.end = self.start + len.min(self.len());
    }

    /// Slides the pending window to offset zero.
    pub fn compact(&mut self) {
        if self.start > 0 {
            self.buf.copy_within(self.start..self.end, 0);
            self.end -= self.start;
            self.start = 0;
        }
    }

    /// Pulls bytes from a reader into the free space with a single `read` call, returning the
    /// number of bytes pulled.
    ///
    /// # Panics
    ///
    /// Panics if the reader claims to have read more bytes than requested.
    pub fn fill_from_reader(&mut self, reader: &mut impl io::Read) -> io::Result<usize> {
        let unfilled = self.unfilled();
        let requested = unfilled.len();
        let n = reader.read(unfilled)?;
        assert!(
            n <= requested,
            "source reader returned {} bytes for a {}-byte request",
            n,
            requested
        );
        self.advance(n);
        Ok(n)
    }

    /// Copies as many bytes as possible from a slice into the free space, returning the number of
    /// bytes copied.
    pub fn fill_from_slice(&mut self, src: &[u8]) -> usize {
        self.compact();
        let n = self.unfilled().len().min(src.len());
        self.unfilled()[..n].copy_from_slice(&src[..n]);
        self.advance(n);
        n
    }
}
