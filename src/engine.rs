use std::{cell::RefCell, rc::Rc};

use super::{Condition, Error};

/// The outcome of a single [`Engine::convert`] call.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Conversion {
    /// The number of input bytes consumed.
    pub consumed: usize,
    /// The number of bytes written into the output buffer.
    pub produced: usize,
    /// The condition that stopped the call, if any.
    pub condition: Option<Condition>,
}

impl Conversion {
    /// Creates a conversion result that reports no condition.
    pub fn complete(consumed: usize, produced: usize) -> Self {
        Self {
            consumed,
            produced,
            condition: None,
        }
    }

    /// Creates a conversion result that reports `condition`.
    pub fn stopped(consumed: usize, produced: usize, condition: Condition) -> Self {
        Self {
            consumed,
            produced,
            condition: Some(condition),
        }
    }

    /// Returns `true` if the call neither consumed nor produced anything.
    pub fn is_stalled(&self) -> bool {
        self.consumed == 0 && self.produced == 0
    }
}

/// A stateful converter between two byte encodings, driven by [`DecodingReader`] and
/// [`EncodingWriter`].
///
/// Implementations must honor the following contract for [`convert`](Engine::convert):
///
/// -  `consumed <= input.len()` and `produced <= output.len()`, and the first `produced` bytes of
///    `output` hold the converted bytes.
/// -  An empty `output` leaves the state untouched and reports nothing.
/// -  An empty `input` is a finishing call: any pending output and shift terminator is written, or
///    a dangling partial sequence is dropped and reported as
///    [`IncompleteSequence`](Condition::IncompleteSequence).
/// -  No condition means the whole input was consumed.
///
/// [`DecodingReader`]: crate::DecodingReader
/// [`EncodingWriter`]: crate::EncodingWriter
pub trait Engine {
    /// Converts bytes from `input` into `output` in a single bounded step.
    fn convert(&mut self, input: &[u8], output: &mut [u8]) -> Result<Conversion, Error>;

    /// Discards any conversion and shift state so that the next call starts a fresh stream.
    fn reset(&mut self) -> Result<(), Error>;

    /// Releases the engine. Calling this method on a closed engine is a no-op.
    fn close(&mut self) -> Result<(), Error>;
}

impl<E: Engine + ?Sized> Engine for &mut E {
    fn convert(&mut self, input: &[u8], output: &mut [u8]) -> Result<Conversion, Error> {
        (**self).convert(input, output)
    }

    fn reset(&mut self) -> Result<(), Error> {
        (**self).reset()
    }

    fn close(&mut self) -> Result<(), Error> {
        (**self).close()
    }
}

impl<E: Engine + ?Sized> Engine for Box<E> {
    fn convert(&mut self, input: &[u8], output: &mut [u8]) -> Result<Conversion, Error> {
        (**self).convert(input, output)
    }

    fn reset(&mut self) -> Result<(), Error> {
        (**self).reset()
    }

    fn close(&mut self) -> Result<(), Error> {
        (**self).close()
    }
}

/// Shares one engine between a reader and a writer used in turn.
///
/// Each call borrows the engine mutably for its duration only; overlapping use panics.
impl<E: Engine + ?Sized> Engine for Rc<RefCell<E>> {
    fn convert(&mut self, input: &[u8], output: &mut [u8]) -> Result<Conversion, Error> {
        self.borrow_mut().convert(input, output)
    }

    fn reset(&mut self) -> Result<(), Error> {
        self.borrow_mut().reset()
    }

    fn close(&mut self) -> Result<(), Error> {
        self.borrow_mut().close()
    }
}
