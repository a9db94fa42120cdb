//! std::io::{Read, Write} adapters that transcode byte streams between character encodings
//!
//! This crate provides [`DecodingReader`] and [`EncodingWriter`], which wrap an underlying
//! [`std::io::Read`] or [`std::io::Write`] and convert the bytes flowing through them from one
//! encoding to another with a stateful conversion [`Engine`]. The default engine, [`Converter`],
//! opens conversions by encoding name, in the manner of `iconv`, and supports every encoding known
//! to [`encoding_rs`].
//!
//! ```no_run
//! use std::{fs, io, io::prelude::*};
//!
//! use transcode_rw::{DecodingReader, EncodingWriter};
//!
//! let file_r = fs::File::open("foo.txt")?;
//! let mut reader = DecodingReader::new(file_r, "euc-jp", "utf-8")?;
//!
//! let file_w = fs::File::create("bar.txt")?;
//! let mut writer = EncodingWriter::new(file_w, "utf-8", "shift_jis")?;
//!
//! io::copy(&mut reader, &mut writer)?;
//! writer.close()?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! The target encoding name accepts `//IGNORE` to skip invalid input and unmappable characters
//! and `//TRANSLIT` to substitute `?` for unmappable characters.
//!
//! ```rust
//! let dst = transcode_rw::convert_to_vec("¿Qué? 你好".as_bytes(), "utf-8", "latin1//TRANSLIT")?;
//! assert_eq!(dst, b"\xbfQu\xe9? ??");
//! # Ok::<(), transcode_rw::Error>(())
//! ```
//!
//! Conditions reported by the engine, such as an invalid byte sequence, surface as
//! [`std::io::Error`] values wrapping [`Error::Condition`]. See [`Condition`] for details.

#![cfg_attr(docsrs, feature(doc_cfg))]

mod converter;
mod engine;
mod error;
mod reader;
mod writer;

mod buffer;
mod util;

pub use converter::{Converter, Modifiers};
pub use engine::{Conversion, Engine};
pub use error::{Condition, Error};
pub use reader::{DecodingReader, Progress};
pub use writer::EncodingWriter;

/// The default size of the raw buffer of readers and the output buffer of writers.
const DEFAULT_BUF_SIZE: usize = 8 * 1024;

/// The smallest buffer size accepted by the `with_capacity` constructors; smaller requests are
/// rounded up.
const MIN_BUF_SIZE: usize = 16;

/// Converts `input` from `from` to `to` into `output` with a single engine call.
///
/// This function opens a [`Converter`], calls [`Engine::convert`] once, and closes the converter,
/// returning the counts and condition of that call as they are. A sequence left incomplete at the
/// end of `input` is reported as [`IncompleteSequence`](Condition::IncompleteSequence). The
/// conversion is not finished, so a shift terminator is never written. Use [`convert_to_vec`] to
/// convert a complete document.
///
/// # Examples
///
/// ```rust
/// use transcode_rw::Condition;
///
/// let mut output = [0; 16];
/// let c = transcode_rw::convert(b"Hello\xffWorld!", &mut output, "utf-8", "utf-8")?;
/// assert_eq!((c.consumed, c.produced), (5, 5));
/// assert_eq!(c.condition, Some(Condition::InvalidSequence));
/// assert_eq!(&output[..5], b"Hello");
/// # Ok::<(), transcode_rw::Error>(())
/// ```
pub fn convert(input: &[u8], output: &mut [u8], from: &str, to: &str) -> Result<Conversion, Error> {
    let mut converter = Converter::open(from, to)?;
    let c = converter.convert(input, output)?;
    converter.close()?;
    Ok(c)
}

/// Converts the whole `input` from `from` to `to` and returns the converted bytes.
///
/// Unlike [`convert`], the output grows as needed and the conversion is finished. Any condition
/// other than a sequence skipped under `//IGNORE` is returned as an error.
pub fn convert_to_vec(input: &[u8], from: &str, to: &str) -> Result<Vec<u8>, Error> {
    let mut converter = Converter::open(from, to)?;
    let output = converter.convert_to_vec(input)?;
    converter.close()?;
    Ok(output)
}

#[cfg(test)]
mod tests;
