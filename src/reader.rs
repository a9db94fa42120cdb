use std::{io, mem};

use super::{
    util::SlidingBuffer, Condition, Converter, Engine, Error, DEFAULT_BUF_SIZE, MIN_BUF_SIZE,
};

/// The outcome of a single [`DecodingReader::read_once`] step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    /// The step wrote this many converted bytes, possibly zero, into the caller's buffer.
    Read(usize),
    /// The underlying reader is exhausted and the engine has nothing left to emit.
    EndOfStream,
}

/// A reader wrapper that converts the byte stream of an underlying reader from one encoding to
/// another.
///
/// Each read pulls at most once from the underlying reader into an internal raw buffer and calls
/// the engine at most once, writing whatever the engine produces directly into the caller's
/// buffer. Unconsumed raw bytes are kept for the next read.
///
/// A condition reported by the engine is suppressed when the same call produced some output, and
/// it is returned as an error wrapping [`Error::Condition`] when the call produced nothing. A
/// sequence split across pulls is completed by the next pull, so
/// [`IncompleteSequence`](crate::Condition::IncompleteSequence) is only returned once the
/// underlying reader is exhausted. Notably,
/// [`InsufficientOutput`](crate::Condition::InsufficientOutput) is returned when the caller's
/// buffer is too small for the next character, and the read can be retried with a larger buffer.
///
/// # Examples
///
/// ```rust
/// use std::io::Read as _;
///
/// use transcode_rw::DecodingReader;
///
/// let src: &[u8] = b"\x80\x8a\x99\x95\x8b\x86\x87";
/// let mut reader = DecodingReader::new(src, "windows-1252", "utf-8")?;
///
/// let mut dst = String::new();
/// reader.read_to_string(&mut dst)?;
/// assert_eq!(dst, "€Š™•‹†‡");
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug)]
pub struct DecodingReader<R, E = Converter> {
    reader: R,
    engine: E,
    raw: SlidingBuffer,
    eof: bool,
}

impl<R: io::Read> DecodingReader<R, Converter> {
    /// Creates a new decoding reader that converts from `from` to `to` with the default buffer
    /// size.
    pub fn new(reader: R, from: &str, to: &str) -> Result<Self, Error> {
        Self::with_capacity(DEFAULT_BUF_SIZE, reader, from, to)
    }

    /// Creates a new decoding reader with a raw buffer of at least `capacity` bytes.
    pub fn with_capacity(capacity: usize, reader: R, from: &str, to: &str) -> Result<Self, Error> {
        let engine = Converter::open(from, to)?;
        Ok(Self::from_engine_with_capacity(capacity, reader, engine))
    }
}

impl<R: io::Read, E: Engine> DecodingReader<R, E> {
    /// Creates a new decoding reader driving an arbitrary engine with the default buffer size.
    pub fn from_engine(reader: R, engine: E) -> Self {
        Self::from_engine_with_capacity(DEFAULT_BUF_SIZE, reader, engine)
    }

    /// Creates a new decoding reader driving an arbitrary engine with a raw buffer of at least
    /// `capacity` bytes.
    pub fn from_engine_with_capacity(capacity: usize, reader: R, engine: E) -> Self {
        Self {
            reader,
            engine,
            raw: SlidingBuffer::with_capacity(capacity.max(MIN_BUF_SIZE)),
            eof: false,
        }
    }

    /// Returns a reference to the underlying reader.
    pub fn reader_ref(&self) -> &R {
        &self.reader
    }

    /// Returns a reference to the engine.
    pub fn engine_ref(&self) -> &E {
        &self.engine
    }

    /// Returns the raw bytes pulled from the underlying reader but not yet consumed by the engine.
    pub fn buffered(&self) -> &[u8] {
        self.raw.as_ref()
    }

    /// Returns `true` once the underlying reader has reported the end of its stream.
    pub fn is_end_of_input(&self) -> bool {
        self.eof
    }

    /// Performs one pull-and-convert step.
    ///
    /// Unlike [`read`](io::Read::read), this method distinguishes a step that made no visible
    /// progress, `Progress::Read(0)`, from the end of the stream.
    pub fn read_once(&mut self, buf: &mut [u8]) -> io::Result<Progress> {
        if buf.is_empty() {
            return Ok(Progress::Read(0));
        }

        if !self.eof {
            self.raw.compact();
            if !self.raw.unfilled().is_empty() {
                let n = self.raw.fill_from_reader(&mut self.reader)?;
                log::trace!("pulled {} bytes from reader", n);
                self.eof = n == 0;
            }
        }
        if self.raw.is_empty() && !self.eof {
            return Ok(Progress::Read(0));
        }

        // pending bytes are converted; at end of input an empty slice finishes the conversion
        let finishing = self.raw.is_empty();
        let c = self
            .engine
            .convert(self.raw.as_ref(), buf)
            .map_err(Error::wrap)?;
        self.raw.consume(c.consumed);
        log::trace!(
            "converted {} bytes into {} bytes ({:?})",
            c.consumed,
            c.produced,
            c.condition
        );

        match c.condition {
            // a fragment is completed by the next pull unless the source is exhausted
            Some(Condition::IncompleteSequence)
                if c.produced == 0 && !self.eof && self.raw.len() < self.raw.capacity() =>
            {
                Ok(Progress::Read(0))
            }
            Some(condition) if c.produced == 0 => Err(Error::from(condition).wrap()),
            None if c.is_stalled() && !self.raw.is_empty() => Err(io::Error::new(
                io::ErrorKind::Other,
                "engine made no progress on pending input",
            )),
            _ if c.produced == 0 && finishing => Ok(Progress::EndOfStream),
            _ => Ok(Progress::Read(c.produced)),
        }
    }

    /// Resets the engine and starts over reading from `reader`, discarding any pending raw bytes
    /// and returning the previous reader.
    pub fn reset(&mut self, reader: R) -> Result<R, Error> {
        self.engine.reset()?;
        if !self.raw.is_empty() {
            log::debug!("discarding {} pending bytes on reset", self.raw.len());
        }
        self.raw.clear();
        self.eof = false;
        Ok(mem::replace(&mut self.reader, reader))
    }

    /// Disassembles the reader into the underlying reader, the engine, and the raw bytes pulled
    /// but not yet consumed.
    pub fn into_parts(self) -> (R, E, Vec<u8>) {
        let pending = self.raw.as_ref().to_vec();
        (self.reader, self.engine, pending)
    }
}

impl<R: io::Read, E: Engine> io::Read for DecodingReader<R, E> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        // `Ok(0)` means EOF to callers, so steps without visible progress are repeated
        loop {
            match self.read_once(buf)? {
                Progress::Read(0) if !buf.is_empty() => {}
                Progress::Read(n) => return Ok(n),
                Progress::EndOfStream => return Ok(0),
            }
        }
    }
}
