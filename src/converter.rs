use std::{fmt, mem, slice};

use encoding_rs::{Decoder, DecoderResult, Encoder, EncoderResult, Encoding};

use super::{Condition, Conversion, Engine, Error};

/// Scratch space reserved for a single decoding or encoding step.
const SCRATCH_LEN: usize = 32;

/// Behavior switches parsed from the `//`-separated suffixes of a target encoding name.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Modifiers {
    /// `//IGNORE`: skip malformed input and unmappable characters, still reporting
    /// [`InvalidSequence`](Condition::InvalidSequence) once the call ends.
    pub ignore: bool,
    /// `//TRANSLIT`: substitute `?` for characters unmappable in the target encoding.
    pub transliterate: bool,
}

/// An [`Engine`] that converts between any two encodings known to [`encoding_rs`].
///
/// Encoding names are resolved as [WHATWG labels] (so `latin1` and `ascii` denote windows-1252),
/// optionally followed by `//IGNORE` and/or `//TRANSLIT` on the target name. UTF-16BE and UTF-16LE
/// are supported as targets even though `encoding_rs` only decodes them.
///
/// The converter decodes its input one byte at a time so that consumed counts always end on a
/// boundary the caller can resume from. It never writes a partial character into the output: a
/// character that does not fit is consumed, held back, and written first by the next call. Input
/// that ends inside a character is refused with
/// [`IncompleteSequence`](Condition::IncompleteSequence) so that the caller can feed those bytes
/// again along with the rest of the character.
///
/// [WHATWG labels]: https://encoding.spec.whatwg.org/#names-and-labels
///
/// # Examples
///
/// ```rust
/// use transcode_rw::{Condition, Converter, Engine as _};
///
/// let mut converter = Converter::open("utf-8", "latin1")?;
/// let mut output = [0; 8];
///
/// let c = converter.convert("caf\u{e9} au lait".as_bytes(), &mut output)?;
/// assert_eq!((c.consumed, c.produced), (9, 8));
/// assert_eq!(c.condition, Some(Condition::InsufficientOutput));
/// assert_eq!(&output, b"caf\xe9 au ");
///
/// converter.close()?;
/// assert!(!converter.is_open());
/// # Ok::<(), transcode_rw::Error>(())
/// ```
pub struct Converter {
    source: &'static Encoding,
    target: &'static Encoding,
    modifiers: Modifiers,
    decoder: Decoder,
    encoder: TargetEncoder,
    /// Characters decoded by the current step.
    utf8: String,
    /// Converted bytes owed to the caller; always whole characters.
    held: Vec<u8>,
    /// Set when `//IGNORE` skipped something that has not been reported yet.
    skipped: bool,
    open: bool,
}

impl Converter {
    /// Opens a converter from `from` to `to`.
    ///
    /// Returns [`Error::UnsupportedEncodingPair`] if either name is unknown, carries an unknown
    /// modifier, or names an encoding that cannot be produced.
    pub fn open(from: &str, to: &str) -> Result<Self, Error> {
        let unsupported = || Error::UnsupportedEncodingPair {
            from: from.to_owned(),
            to: to.to_owned(),
        };
        let (source, _) = parse_name(from).ok_or_else(unsupported)?;
        let (target, modifiers) = parse_name(to)
            .filter(|(e, _)| TargetEncoder::supports(*e))
            .ok_or_else(unsupported)?;

        log::debug!(
            "opened converter from {} to {} ({:?})",
            source.name(),
            target.name(),
            modifiers
        );
        Ok(Self {
            source,
            target,
            modifiers,
            decoder: source.new_decoder_without_bom_handling(),
            encoder: TargetEncoder::new(target),
            utf8: String::with_capacity(SCRATCH_LEN),
            held: Vec::with_capacity(SCRATCH_LEN),
            skipped: false,
            open: true,
        })
    }

    /// Returns the source encoding.
    pub fn source(&self) -> &'static Encoding {
        self.source
    }

    /// Returns the target encoding.
    pub fn target(&self) -> &'static Encoding {
        self.target
    }

    /// Returns the modifiers parsed from the target encoding name.
    pub fn modifiers(&self) -> Modifiers {
        self.modifiers
    }

    /// Returns `true` until the converter is closed.
    pub fn is_open(&self) -> bool {
        self.open
    }

    /// Converts the whole `input`, finishes the conversion, and returns the converted bytes.
    ///
    /// The output grows as needed. Skipped sequences under `//IGNORE` are not errors here; any
    /// other condition is.
    ///
    /// ```rust
    /// use transcode_rw::Converter;
    ///
    /// let mut converter = Converter::open("utf-8", "iso-2022-jp")?;
    /// assert_eq!(
    ///     converter.convert_to_vec("A\u{3042}".as_bytes())?,
    ///     b"A\x1b$B\x24\x22\x1b(B"
    /// );
    /// # Ok::<(), transcode_rw::Error>(())
    /// ```
    pub fn convert_to_vec(&mut self, input: &[u8]) -> Result<Vec<u8>, Error> {
        let mut output = vec![0; input.len().max(SCRATCH_LEN)];
        let (mut read, mut written) = (0, 0);
        loop {
            if written == output.len() {
                output.resize(output.len() + input.len().max(SCRATCH_LEN), 0);
            }
            let finishing = read == input.len();
            let c = self.convert(&input[read..], &mut output[written..])?;
            read += c.consumed;
            written += c.produced;
            match c.condition {
                None if finishing && c.produced == 0 => break,
                None => {}
                Some(Condition::InsufficientOutput) => {
                    output.resize(output.len() + input.len().max(SCRATCH_LEN), 0);
                }
                Some(Condition::InvalidSequence) if !c.is_stalled() => {}
                Some(condition) => return Err(condition.into()),
            }
        }
        output.truncate(written);
        Ok(output)
    }

    /// Feeds one source byte through the decoder and stages any completed characters, converted,
    /// into `held`.
    fn feed(&mut self, byte: u8) -> Result<(), Condition> {
        let mut src = slice::from_ref(&byte);
        loop {
            self.utf8.clear();
            let (result, read) =
                self.decoder
                    .decode_to_string_without_replacement(src, &mut self.utf8, false);
            src = &src[read..];
            if self
                .encoder
                .encode(&self.utf8, &mut self.held, self.modifiers)?
            {
                self.skipped = true;
            }

            match result {
                DecoderResult::InputEmpty => return Ok(()),
                DecoderResult::OutputFull => {}
                DecoderResult::Malformed(..) if self.modifiers.ignore => {
                    self.skipped = true;
                    if src.is_empty() {
                        return Ok(());
                    }
                }
                DecoderResult::Malformed(..) => return Err(Condition::InvalidSequence),
            }
        }
    }

    /// Returns `true` if `tail`, which decoded to no characters, stops inside a character.
    ///
    /// The bytes are replayed through a fresh decoder so that the live decoder is left untouched.
    fn ends_mid_sequence(&self, mut tail: &[u8]) -> bool {
        let mut decoder = self.source.new_decoder_without_bom_handling();
        let mut scratch = String::with_capacity(SCRATCH_LEN);
        loop {
            scratch.clear();
            let (result, read) =
                decoder.decode_to_string_without_replacement(tail, &mut scratch, false);
            tail = &tail[read..];
            if result == DecoderResult::InputEmpty {
                break;
            }
        }
        scratch.clear();
        let (result, _) = decoder.decode_to_string_without_replacement(&[], &mut scratch, true);
        matches!(result, DecoderResult::Malformed(..))
    }

    /// Moves all of `held` into `dst`, or nothing at all if it does not fit.
    fn drain_held(&mut self, dst: &mut [u8]) -> Option<usize> {
        let n = self.held.len();
        if n > dst.len() {
            return None;
        }
        dst[..n].copy_from_slice(&self.held);
        self.held.clear();
        Some(n)
    }

    /// Ends the call, reporting a pending `//IGNORE` skip if there is one.
    fn report(&mut self, consumed: usize, produced: usize) -> Conversion {
        if mem::take(&mut self.skipped) {
            Conversion::stopped(consumed, produced, Condition::InvalidSequence)
        } else {
            Conversion::complete(consumed, produced)
        }
    }

    fn finish(&mut self, output: &mut [u8]) -> Conversion {
        self.utf8.clear();
        let (result, _) =
            self.decoder
                .decode_to_string_without_replacement(&[], &mut self.utf8, true);
        self.decoder = self.source.new_decoder_without_bom_handling();
        if let DecoderResult::Malformed(..) = result {
            log::debug!(
                "dropped incomplete {} sequence at end of input",
                self.source.name()
            );
            return Conversion::stopped(0, 0, Condition::IncompleteSequence);
        }

        if let Err(condition) = self
            .encoder
            .encode(&self.utf8, &mut self.held, self.modifiers)
        {
            self.held.clear();
            return Conversion::stopped(0, 0, condition);
        }
        self.encoder.finish(&mut self.held);
        self.encoder = TargetEncoder::new(self.target);

        match self.drain_held(output) {
            Some(n) => self.report(0, n),
            None => Conversion::stopped(0, 0, Condition::InsufficientOutput),
        }
    }
}

impl Engine for Converter {
    fn convert(&mut self, input: &[u8], output: &mut [u8]) -> Result<Conversion, Error> {
        if !self.open {
            return Err(Error::ClosedHandle);
        }
        if output.is_empty() {
            return Ok(Conversion::default());
        }

        // characters held back by a previous call go first and end a finishing call
        let mut produced = match self.drain_held(output) {
            Some(n) => n,
            None => return Ok(Conversion::stopped(0, 0, Condition::InsufficientOutput)),
        };
        if input.is_empty() {
            return Ok(if produced > 0 {
                Conversion::complete(0, produced)
            } else {
                self.finish(output)
            });
        }

        let mut consumed = 0;
        // start of the character being decoded; a rejected character is reported from here
        let mut boundary = 0;
        while consumed < input.len() {
            if produced == output.len() {
                return Ok(Conversion::stopped(
                    consumed,
                    produced,
                    Condition::InsufficientOutput,
                ));
            }
            if let Err(condition) = self.feed(input[consumed]) {
                self.held.clear();
                return Ok(Conversion::stopped(boundary, produced, condition));
            }
            consumed += 1;
            if !self.utf8.is_empty() {
                boundary = consumed;
            }
            match self.drain_held(&mut output[produced..]) {
                Some(n) => produced += n,
                None => {
                    return Ok(Conversion::stopped(
                        consumed,
                        produced,
                        Condition::InsufficientOutput,
                    ))
                }
            }
        }

        if boundary < consumed && self.ends_mid_sequence(&input[boundary..]) {
            // refuse the trailing fragment so that it is fed again together with what follows
            self.decoder = self.source.new_decoder_without_bom_handling();
            return Ok(Conversion::stopped(
                boundary,
                produced,
                Condition::IncompleteSequence,
            ));
        }
        Ok(self.report(consumed, produced))
    }

    fn reset(&mut self) -> Result<(), Error> {
        if !self.open {
            return Err(Error::ClosedHandle);
        }
        self.decoder = self.source.new_decoder_without_bom_handling();
        self.encoder = TargetEncoder::new(self.target);
        self.held.clear();
        self.skipped = false;
        log::debug!(
            "reset converter from {} to {}",
            self.source.name(),
            self.target.name()
        );
        Ok(())
    }

    fn close(&mut self) -> Result<(), Error> {
        if self.open {
            self.open = false;
            self.held = Vec::new();
            self.utf8 = String::new();
            log::debug!(
                "closed converter from {} to {}",
                self.source.name(),
                self.target.name()
            );
        }
        Ok(())
    }
}

impl Drop for Converter {
    fn drop(&mut self) {
        if self.open {
            log::trace!("closing converter on drop");
            let _ = self.close();
        }
    }
}

impl fmt::Debug for Converter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Converter")
            .field("source", &self.source.name())
            .field("target", &self.target.name())
            .field("modifiers", &self.modifiers)
            .field("held", &self.held)
            .field("open", &self.open)
            .finish_non_exhaustive()
    }
}

/// Splits an encoding name into its label and modifiers.
fn parse_name(name: &str) -> Option<(&'static Encoding, Modifiers)> {
    let mut parts = name.split("//");
    let encoding = Encoding::for_label(parts.next()?.as_bytes())
        .filter(|e| *e != encoding_rs::REPLACEMENT)?;

    let mut modifiers = Modifiers::default();
    for part in parts {
        if part.eq_ignore_ascii_case("IGNORE") {
            modifiers.ignore = true;
        } else if part.eq_ignore_ascii_case("TRANSLIT") {
            modifiers.transliterate = true;
        } else if !part.is_empty() {
            return None;
        }
    }
    Some((encoding, modifiers))
}

/// The UTF-8 to target half of a converter.
enum TargetEncoder {
    Native(Encoder),
    Utf16 { big_endian: bool },
}

impl TargetEncoder {
    fn supports(encoding: &'static Encoding) -> bool {
        encoding.output_encoding() == encoding
            || encoding == encoding_rs::UTF_16BE
            || encoding == encoding_rs::UTF_16LE
    }

    fn new(encoding: &'static Encoding) -> Self {
        if encoding == encoding_rs::UTF_16BE {
            Self::Utf16 { big_endian: true }
        } else if encoding == encoding_rs::UTF_16LE {
            Self::Utf16 { big_endian: false }
        } else {
            Self::Native(encoding.new_encoder())
        }
    }

    /// Appends the encoded form of `text` to `dst`, returning `true` if `//IGNORE` skipped an
    /// unmappable character.
    fn encode(
        &mut self,
        mut text: &str,
        dst: &mut Vec<u8>,
        modifiers: Modifiers,
    ) -> Result<bool, Condition> {
        let encoder = match self {
            Self::Native(encoder) => encoder,
            Self::Utf16 { big_endian } => {
                for unit in text.encode_utf16() {
                    dst.extend_from_slice(&if *big_endian {
                        unit.to_be_bytes()
                    } else {
                        unit.to_le_bytes()
                    });
                }
                return Ok(false);
            }
        };

        let mut skipped = false;
        loop {
            dst.reserve(SCRATCH_LEN);
            let (result, read) =
                encoder.encode_from_utf8_to_vec_without_replacement(text, dst, false);
            text = &text[read..];
            match result {
                EncoderResult::InputEmpty => return Ok(skipped),
                EncoderResult::OutputFull => {}
                EncoderResult::Unmappable(_) if modifiers.transliterate => {
                    dst.reserve(SCRATCH_LEN);
                    if let (EncoderResult::Unmappable(_), _) =
                        encoder.encode_from_utf8_to_vec_without_replacement("?", dst, false)
                    {
                        skipped = true;
                    }
                }
                EncoderResult::Unmappable(_) if modifiers.ignore => skipped = true,
                EncoderResult::Unmappable(_) => return Err(Condition::InvalidSequence),
            }
        }
    }

    /// Appends the shift terminator, if any. The encoder must be replaced afterwards.
    fn finish(&mut self, dst: &mut Vec<u8>) {
        if let Self::Native(encoder) = self {
            dst.reserve(
                encoder
                    .max_buffer_length_from_utf8_without_replacement(0)
                    .unwrap_or(SCRATCH_LEN),
            );
            let (result, _) = encoder.encode_from_utf8_to_vec_without_replacement("", dst, true);
            debug_assert_eq!(result, EncoderResult::InputEmpty, "terminator truncated");
        }
    }
}
