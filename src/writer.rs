use std::io;

use super::{
    buffer::SinkBuffer, util::SlidingBuffer, Condition, Conversion, Converter, Engine, Error,
    DEFAULT_BUF_SIZE, MIN_BUF_SIZE,
};

/// A writer wrapper that converts the bytes written into it from one encoding to another and
/// writes the converted bytes into an underlying writer.
///
/// Like [`BufWriter`], this type stores the converted bytes in its internal buffer and writes them
/// into the underlying writer when the buffer becomes full, when flushed, or when dropped. A
/// trailing fragment of a multi-byte sequence that the engine refuses to consume is kept in a
/// carry buffer and prepended to the next write.
///
/// A single [`write_once`](Self::write_once) call can report both an accepted byte count and a
/// condition. To meet the contract of [`std::io::Write`], [`write`] returns `Ok(n)` in such a case
/// and _defers_ the error to the immediately subsequent writer method call. Call
/// [`close`](Self::close) at the end of the input to finish the conversion, write any shift
/// terminator, and collect such a trailing error.
///
/// [`BufWriter`]: io::BufWriter
/// [`write`]: io::Write::write
///
/// # Examples
///
/// ```rust
/// use std::io::Write as _;
///
/// use transcode_rw::EncodingWriter;
///
/// let mut writer = EncodingWriter::new(Vec::new(), "utf-8", "windows-1252")?;
///
/// write!(writer, "€Š™")?;
/// writer.write_all("•‹†‡".as_bytes())?;
/// writer.close()?;
/// assert_eq!(writer.writer_ref(), b"\x80\x8a\x99\x95\x8b\x86\x87");
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug)]
pub struct EncodingWriter<W: io::Write, E = Converter> {
    writer: SinkBuffer<W>,
    engine: E,
    carry: SlidingBuffer,
    /// Storage to carry an error from one write call to the next, used to tentatively return `Ok`
    /// (as per the contract) after accepting some bytes up to an error and report the error at the
    /// beginning of the subsequent call.
    deferred_error: Option<io::Error>,
}

impl<W: io::Write> EncodingWriter<W, Converter> {
    /// Creates a new encoding writer that converts from `from` to `to` with the default buffer
    /// size.
    pub fn new(writer: W, from: &str, to: &str) -> Result<Self, Error> {
        Self::with_capacity(DEFAULT_BUF_SIZE, writer, from, to)
    }

    /// Creates a new encoding writer with an output buffer of at least `capacity` bytes.
    pub fn with_capacity(capacity: usize, writer: W, from: &str, to: &str) -> Result<Self, Error> {
        let engine = Converter::open(from, to)?;
        Ok(Self::from_engine_with_capacity(capacity, writer, engine))
    }
}

impl<W: io::Write, E: Engine> EncodingWriter<W, E> {
    /// Creates a new encoding writer driving an arbitrary engine with the default buffer size.
    pub fn from_engine(writer: W, engine: E) -> Self {
        Self::from_engine_with_capacity(DEFAULT_BUF_SIZE, writer, engine)
    }

    /// Creates a new encoding writer driving an arbitrary engine with output and carry buffers of
    /// at least `capacity` bytes.
    pub fn from_engine_with_capacity(capacity: usize, writer: W, engine: E) -> Self {
        let capacity = capacity.max(MIN_BUF_SIZE);
        Self {
            writer: SinkBuffer::with_capacity(capacity, writer),
            engine,
            carry: SlidingBuffer::with_capacity(capacity),
            deferred_error: None,
        }
    }

    /// Returns a reference to the underlying writer.
    pub fn writer_ref(&self) -> &W {
        self.writer.get_ref()
    }

    /// Returns a reference to the engine.
    pub fn engine_ref(&self) -> &E {
        &self.engine
    }

    /// Returns the converted bytes not yet written to the underlying writer.
    pub fn buffered(&self) -> &[u8] {
        self.writer.buffer()
    }

    /// Returns the accepted input bytes held back until the next write completes their sequence.
    pub fn carried(&self) -> &[u8] {
        self.carry.as_ref()
    }

    /// Converts as much of `buf` as possible, returning the number of bytes accepted together with
    /// the condition or error that stopped the conversion, if any.
    ///
    /// Accepted bytes are either converted into the output buffer or held in the carry buffer.
    /// An invalid sequence stops the call at the offending byte, so the caller may skip or replace
    /// it and write the rest.
    ///
    /// ```rust
    /// use transcode_rw::{Condition, EncodingWriter};
    ///
    /// let mut writer = EncodingWriter::new(Vec::new(), "utf-8", "latin1")?;
    ///
    /// let (n, ret) = writer.write_once(b"Hello\xffWorld!");
    /// assert_eq!(n, 5);
    /// assert_eq!(
    ///     Condition::wrapped_in(&ret.unwrap_err()),
    ///     Some(Condition::InvalidSequence)
    /// );
    ///
    /// assert_eq!(writer.write_once(b"World!").0, 6);
    /// writer.close()?;
    /// assert_eq!(writer.writer_ref(), b"HelloWorld!");
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn write_once(&mut self, buf: &[u8]) -> (usize, io::Result<()>) {
        if buf.is_empty() {
            return (0, Ok(()));
        }
        let mut accepted = 0;
        let ret = self.write_inner(buf, &mut accepted);
        (accepted, ret.map_err(Error::wrap))
    }

    /// Finishes the conversion and flushes everything to the underlying writer.
    ///
    /// Carried bytes, which can never be completed now, are dropped, and so is a sequence left
    /// incomplete in the engine. Any shift terminator required by the target encoding is written.
    /// An error deferred by the last write is returned after the flush, or kept for the next call
    /// if closing fails. Calling this method again writes nothing more.
    pub fn close(&mut self) -> io::Result<()> {
        let deferred_error = self.deferred_error.take();
        if let Err(e) = self.finish_conversion().and_then(|()| self.writer.flush()) {
            self.deferred_error = deferred_error;
            return Err(e.wrap());
        }
        deferred_error.map_or(Ok(()), Err)
    }

    /// Resets the engine and starts over writing into `writer`, returning the previous writer.
    ///
    /// Buffered output, carried input, and any deferred error are discarded.
    pub fn reset(&mut self, writer: W) -> Result<W, Error> {
        self.engine.reset()?;
        if !self.writer.is_empty() || !self.carry.is_empty() {
            log::debug!(
                "discarding {} buffered and {} carried bytes on reset",
                self.writer.buffer().len(),
                self.carry.len()
            );
        }
        self.writer.clear();
        self.carry.clear();
        self.deferred_error = None;
        Ok(self.writer.replace_inner(writer))
    }

    /// Disassembles the writer into the underlying writer, the engine, and the converted bytes not
    /// yet written, without flushing.
    pub fn into_parts(self) -> (W, E, Vec<u8>) {
        let Self { writer, engine, .. } = self;
        let (writer, buffer) = writer.into_parts();
        (writer, engine, buffer)
    }

    fn write_inner(&mut self, src: &[u8], accepted: &mut usize) -> Result<(), Error> {
        self.reserve()?;

        let mut c = if self.carry.is_empty() {
            self.convert(src)?
        } else {
            // convert the carried fragment followed by as much of `src` as fits behind it
            let old_len = self.carry.len();
            self.carry.fill_from_slice(src);
            let c = self
                .engine
                .convert(self.carry.as_ref(), self.writer.unfilled())?;
            self.writer.advance(c.produced);

            if c.consumed > old_len {
                self.carry.clear();
                Conversion {
                    consumed: c.consumed - old_len,
                    ..c
                }
            } else {
                self.carry.truncate(old_len);
                self.carry.consume(c.consumed);
                match c.condition {
                    Some(condition) => return Err(condition.into()),
                    None => self.convert(src)?,
                }
            }
        };
        *accepted = c.consumed;

        while let Some(condition) = c.condition {
            if c.consumed == 0 {
                break;
            }
            match condition {
                Condition::InsufficientOutput => self.writer.flush_buffer()?,
                Condition::InvalidSequence => {
                    if *accepted == src.len() {
                        return Ok(());
                    }
                }
                Condition::IncompleteSequence => {
                    let rest = &src[*accepted..];
                    if rest.len() > self.carry.capacity() {
                        break;
                    }
                    log::trace!("carrying {} bytes to next write", rest.len());
                    self.carry.fill_from_slice(rest);
                    *accepted = src.len();
                    return Ok(());
                }
            }
            c = self.convert(&src[*accepted..])?;
            *accepted += c.consumed;
        }

        c.condition.map_or(Ok(()), |condition| Err(condition.into()))
    }

    fn finish_conversion(&mut self) -> Result<(), Error> {
        if !self.carry.is_empty() {
            log::debug!("dropping {} carried bytes at close", self.carry.len());
            self.carry.clear();
        }

        let mut truncated = false;
        loop {
            self.reserve()?;
            let c = self.convert(&[])?;
            match c.condition {
                None if c.produced == 0 => return Ok(()),
                None => {}
                Some(Condition::IncompleteSequence) if !truncated => {
                    log::debug!("input ended in an incomplete sequence");
                    truncated = true;
                }
                Some(Condition::InsufficientOutput) if !self.writer.is_empty() => {
                    self.writer.flush_buffer()?
                }
                Some(_) if c.produced > 0 => {}
                Some(condition) => return Err(condition.into()),
            }
        }
    }

    /// Makes room for at least one converted character in the output buffer.
    fn reserve(&mut self) -> Result<(), Error> {
        if self.writer.unfilled().len() < MIN_BUF_SIZE {
            self.writer.flush_buffer()?;
        }
        Ok(())
    }

    fn convert(&mut self, input: &[u8]) -> Result<Conversion, Error> {
        let c = self.engine.convert(input, self.writer.unfilled())?;
        self.writer.advance(c.produced);
        log::trace!(
            "converted {} bytes into {} bytes ({:?})",
            c.consumed,
            c.produced,
            c.condition
        );
        Ok(c)
    }
}

impl<W: io::Write, E: Engine> io::Write for EncodingWriter<W, E> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if let Some(e) = self.deferred_error.take() {
            return Err(e);
        }
        match self.write_once(buf) {
            (0, Err(e)) => Err(e),
            (n, Err(e)) => {
                // defer error until subsequent call because some bytes were accepted
                self.deferred_error = Some(e);
                Ok(n)
            }
            (n, Ok(())) => Ok(n),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        if let Some(e) = self.deferred_error.take() {
            return Err(e);
        }
        self.writer.flush().map_err(Error::wrap)
    }
}
