use std::{io, mem, ptr};

use super::Error;

/// A fixed-capacity output buffer in front of a writer that exposes its free space as a slice, so
/// that an engine can convert directly into it.
///
/// Like [`BufWriter`](io::BufWriter), the buffered data is written into the underlying writer
/// when dropped.
#[derive(Debug)]
pub(crate) struct SinkBuffer<W: io::Write> {
    buf: Box<[u8]>,
    filled: usize,
    panicked: bool,
    inner: W,
}

impl<W: io::Write> SinkBuffer<W> {
    pub fn with_capacity(capacity: usize, inner: W) -> Self {
        Self {
            buf: vec![0; capacity].into_boxed_slice(),
            filled: 0,
            panicked: false,
            inner,
        }
    }

    /// Returns a reference to the unwritten buffered data.
    pub fn buffer(&self) -> &[u8] {
        &self.buf[..self.filled]
    }

    pub fn is_empty(&self) -> bool {
        self.filled == 0
    }

    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    /// Returns the free space after the buffered data.
    pub fn unfilled(&mut self) -> &mut [u8] {
        &mut self.buf[self.filled..]
    }

    /// Marks the first `n` bytes of the free space as buffered data.
    pub fn advance(&mut self, n: usize) {
        assert!(self.filled + n <= self.buf.len());
        self.filled += n;
    }

    /// Discards the buffered data without writing it.
    pub fn clear(&mut self) {
        self.filled = 0;
    }

    pub fn replace_inner(&mut self, inner: W) -> W {
        mem::replace(&mut self.inner, inner)
    }

    /// Disassembles the structure into the underlying writer and the unwritten buffered data
    /// without flushing.
    ///
    /// If the underlying writer panicked in a call to write, the returned data may include bytes
    /// that it had already accepted.
    pub fn into_parts(self) -> (W, Vec<u8>) {
        if self.panicked {
            log::warn!("returning buffered data after the underlying writer panicked");
        }
        let buffer = self.buffer().to_vec();
        let mut m = mem::ManuallyDrop::new(self);
        // SAFETY: `m` is never touched again and its destructor never runs, so `buf` is dropped
        // exactly once and `inner` is moved out exactly once
        unsafe {
            ptr::drop_in_place(&mut m.buf);
            (ptr::read(&m.inner), buffer)
        }
    }

    /// Writes the buffered data into the underlying writer.
    ///
    /// A write that accepts no bytes fails with [`Error::ShortWrite`], leaving the unwritten
    /// remainder at the front of the buffer.
    pub fn flush_buffer(&mut self) -> Result<(), Error> {
        // A guard struct to make sure to slide unwritten bytes to the front when dropped.
        struct PanicGuard<'a> {
            written: usize,
            buf: &'a mut [u8],
            filled: &'a mut usize,
        }

        impl Drop for PanicGuard<'_> {
            fn drop(&mut self) {
                if self.written < *self.filled {
                    self.buf.copy_within(self.written..*self.filled, 0);
                    *self.filled -= self.written;
                } else {
                    *self.filled = 0;
                }
            }
        }

        let mut g = PanicGuard {
            written: 0,
            buf: &mut self.buf,
            filled: &mut self.filled,
        };

        while g.written < *g.filled {
            self.panicked = true;
            let ret = self.inner.write(&g.buf[g.written..*g.filled]);
            self.panicked = false;

            match ret {
                Ok(0) => return Err(Error::ShortWrite),
                Ok(n) => g.written += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e.into()),
            }
        }

        log::trace!("flushed {} bytes to writer", g.written);
        Ok(())
    }

    /// Writes the buffered data and flushes the underlying writer.
    pub fn flush(&mut self) -> Result<(), Error> {
        self.flush_buffer()?;
        self.inner.flush()?;
        Ok(())
    }
}

impl<W: io::Write> Drop for SinkBuffer<W> {
    fn drop(&mut self) {
        // don't double-flush the buffer when the inner writer panicked in a call to write
        if !self.panicked {
            let _ = self.flush_buffer();
        }
    }
}
