mod cases;

use std::io::{self, prelude::*};

use crate::Condition;

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Reads until EOF or the first error, returning the bytes read and the condition that stopped
/// the reader, if any.
fn read_until_error(reader: &mut impl Read, buf_size: usize) -> (Vec<u8>, Option<Condition>) {
    let mut dst = Vec::new();
    let mut buf = vec![0u8; buf_size];
    loop {
        match reader.read(&mut buf) {
            Ok(0) => return (dst, None),
            Ok(n) => dst.extend(&buf[..n]),
            Err(e) => match Condition::wrapped_in(&e) {
                Some(c) => return (dst, Some(c)),
                None => panic!("unexpected error: {:?}", e),
            },
        }
    }
}

/// A reader that yields at most one byte per call.
struct Trickle<'a>(&'a [u8]);

impl io::Read for Trickle<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match (self.0.split_first(), buf.first_mut()) {
            (Some((b, rest)), Some(dst)) => {
                *dst = *b;
                self.0 = rest;
                Ok(1)
            }
            _ => Ok(0),
        }
    }
}

#[test]
fn ex_readme_examples() -> Result<(), Box<dyn std::error::Error>> {
    use crate::{DecodingReader, EncodingWriter};

    let sjis: &[u8] = &[72, 101, 108, 108, 111, 32, 144, 162, 138, 69];
    let big5: &[u8] = &[72, 101, 108, 108, 111, 32, 165, 64, 172, 201];

    let mut reader = DecodingReader::new(sjis, "shift_jis", "utf-8")?;
    let mut utf8 = String::new();
    reader.read_to_string(&mut utf8)?;
    assert_eq!(utf8, "Hello 世界");

    let mut reader = DecodingReader::new(sjis, "shift_jis", "big5")?;
    let mut writer = EncodingWriter::new(Vec::new(), "big5", "utf-8")?;
    io::copy(&mut reader, &mut writer)?;
    writer.close()?;
    assert_eq!(writer.writer_ref(), "Hello 世界".as_bytes());

    let mut writer = EncodingWriter::new(Vec::new(), "utf-8", "big5")?;
    write!(writer, "{}", utf8)?;
    writer.close()?;
    assert_eq!(writer.writer_ref(), big5);

    Ok(())
}
