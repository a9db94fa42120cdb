use std::io;

use thiserror::Error;

/// A non-fatal status reported by a single engine call alongside its progress counts.
///
/// Streams report a condition as an [`Error::Condition`] only when the call that observed it made
/// no visible progress; otherwise the condition is suppressed (readers) or deferred (writers) so
/// that the partial result is delivered first.
///
/// # Examples
///
/// ```rust
/// use std::io::Read as _;
///
/// use transcode_rw::{Condition, DecodingReader};
///
/// let src: &[u8] = b"\xff";
/// let mut reader = DecodingReader::new(src, "utf-8", "latin1")?;
///
/// let err = reader.read(&mut [0; 16]).unwrap_err();
/// assert_eq!(Condition::wrapped_in(&err), Some(Condition::InvalidSequence));
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum Condition {
    /// The output buffer filled up before all consumable input was processed.
    #[error("insufficient room in output buffer")]
    InsufficientOutput,
    /// The input contains a malformed sequence or a character unmappable in the target encoding.
    #[error("encountered an invalid or unmappable byte sequence")]
    InvalidSequence,
    /// The input ends in the middle of a multi-byte sequence.
    #[error("encountered an incomplete byte sequence")]
    IncompleteSequence,
}

impl Condition {
    /// Returns the `Condition` wrapped by a [`std::io::Error`] if it contains an inner
    /// [`Error::Condition`], or returns `None` otherwise.
    #[inline]
    pub fn wrapped_in(io_error: &io::Error) -> Option<Self> {
        match Error::wrapped_in(io_error) {
            Some(Error::Condition(c)) => Some(*c),
            _ => None,
        }
    }
}

/// The error type of this crate.
///
/// The [`Read`] and [`Write`] implementations of [`DecodingReader`] and [`EncodingWriter`] report
/// this error in the form of [`std::io::Error`] wrapping an instance of this type, which can be
/// recovered by [`Error::wrapped_in`]. Errors raised by the underlying reader or writer are passed
/// through unchanged.
///
/// [`Read`]: std::io::Read
/// [`Write`]: std::io::Write
/// [`DecodingReader`]: crate::DecodingReader
/// [`EncodingWriter`]: crate::EncodingWriter
#[derive(Debug, Error)]
pub enum Error {
    /// The engine cannot convert between the named encodings.
    #[error("unsupported encoding pair: {from:?} to {to:?}")]
    UnsupportedEncodingPair { from: String, to: String },
    /// A condition reported by the engine without any progress to hide it behind.
    #[error(transparent)]
    Condition(#[from] Condition),
    /// The engine has been closed.
    #[error("converter has already been closed")]
    ClosedHandle,
    /// The underlying writer stopped accepting buffered bytes.
    #[error("failed to write buffered data to writer")]
    ShortWrite,
    /// An I/O error from the underlying reader or writer.
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl Error {
    /// Wraps `self` in a [`std::io::Error`], unwrapping [`Error::Io`] instead of nesting it.
    pub(crate) fn wrap(self) -> io::Error {
        let kind = match self {
            Self::Io(e) => return e,
            Self::UnsupportedEncodingPair { .. } => io::ErrorKind::InvalidInput,
            Self::Condition(Condition::InsufficientOutput) => io::ErrorKind::Other,
            Self::Condition(_) => io::ErrorKind::InvalidData,
            Self::ClosedHandle => io::ErrorKind::Other,
            Self::ShortWrite => io::ErrorKind::WriteZero,
        };
        io::Error::new(kind, self)
    }

    /// Returns a reference to the `Error` value wrapped by a [`std::io::Error`] if it contains an
    /// inner error whose type is `Error`, or returns `None` otherwise.
    #[inline]
    pub fn wrapped_in(io_error: &io::Error) -> Option<&Self> {
        match io_error.get_ref() {
            Some(e) => e.downcast_ref::<Self>(),
            None => None,
        }
    }
}

impl From<Error> for io::Error {
    fn from(value: Error) -> Self {
        value.wrap()
    }
}
