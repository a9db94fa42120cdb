//! Conversion outcomes of common inputs through each way of driving an engine.

use std::io::prelude::*;

use rstest::rstest;

use super::{init_logger, read_until_error};
use crate::{Condition, Conversion, DecodingReader, EncodingWriter, Error};

const CJK: &str = "你好世界 Hello World";

#[rstest]
#[case::simple(&b"Hello World!"[..], "utf-8", "latin1", 12, 12, None)]
#[case::passthrough(&b"Hello world!"[..], "utf-8", "utf-8", 12, 12, None)]
#[case::partial(&b"Hello\xffWorld!"[..], "utf-8", "utf-8", 5, 5, Some(Condition::InvalidSequence))]
#[case::ignored(&b"Hello \xffWorld!"[..], "utf-8", "utf-8//IGNORE", 13, 12, Some(Condition::InvalidSequence))]
#[case::invalid(&b"\xff"[..], "utf-8", "latin1", 0, 0, Some(Condition::InvalidSequence))]
#[case::incomplete(&b"\xc2"[..], "utf-8", "latin1", 0, 0, Some(Condition::IncompleteSequence))]
#[case::partial_invalid(&b"Hello\xff"[..], "utf-8", "latin1", 5, 5, Some(Condition::InvalidSequence))]
#[case::partial_incomplete(&b"Hello\xc2"[..], "utf-8", "latin1", 5, 5, Some(Condition::IncompleteSequence))]
#[case::ignored_latin1(&b"Hello\xff World!"[..], "utf-8", "latin1//IGNORE", 13, 12, Some(Condition::InvalidSequence))]
#[case::unmappable_ignored(CJK.as_bytes(), "utf-8", "latin1//IGNORE", 24, 12, Some(Condition::InvalidSequence))]
#[case::unmappable_transliterated(CJK.as_bytes(), "utf-8", "latin1//TRANSLIT", 24, 16, None)]
fn one_shot(
    #[case] input: &[u8],
    #[case] from: &str,
    #[case] to: &str,
    #[case] consumed: usize,
    #[case] produced: usize,
    #[case] condition: Option<Condition>,
) {
    init_logger();
    let mut output = [0u8; 64];
    let c = crate::convert(input, &mut output, from, to).unwrap();
    assert_eq!(
        c,
        Conversion {
            consumed,
            produced,
            condition
        }
    );
}

#[rstest]
#[case::simple(&b"Hello World!"[..], "utf-8", "latin1", Ok(&b"Hello World!"[..]))]
#[case::partial(&b"Hello\xffWorld!"[..], "utf-8", "utf-8", Err(Condition::InvalidSequence))]
#[case::ignored(&b"Hello \xffWorld!"[..], "utf-8", "utf-8//IGNORE", Ok(&b"Hello World!"[..]))]
#[case::invalid(&b"\xff"[..], "utf-8", "latin1", Err(Condition::InvalidSequence))]
#[case::incomplete(&b"\xc2"[..], "utf-8", "latin1", Err(Condition::IncompleteSequence))]
#[case::partial_incomplete(&b"Hello\xc2"[..], "utf-8", "latin1", Err(Condition::IncompleteSequence))]
#[case::unmappable(CJK.as_bytes(), "utf-8", "latin1", Err(Condition::InvalidSequence))]
#[case::unmappable_ignored(CJK.as_bytes(), "utf-8", "latin1//IGNORE", Ok(&b" Hello World"[..]))]
#[case::unmappable_transliterated(CJK.as_bytes(), "utf-8", "latin1//TRANSLIT", Ok(&b"???? Hello World"[..]))]
fn whole_document(
    #[case] input: &[u8],
    #[case] from: &str,
    #[case] to: &str,
    #[case] expected: Result<&[u8], Condition>,
) {
    init_logger();
    match (crate::convert_to_vec(input, from, to), expected) {
        (Ok(actual), Ok(expected)) => assert_eq!(actual, expected),
        (Err(Error::Condition(actual)), Err(expected)) => assert_eq!(actual, expected),
        (actual, expected) => panic!("expected {:?}, got {:?}", expected, actual),
    }
}

#[rstest]
#[case::simple(&b"Hello World!"[..], "utf-8", "latin1", &b"Hello World!"[..], None)]
#[case::partial(&b"Hello\xffWorld!"[..], "utf-8", "utf-8", &b"Hello"[..], Some(Condition::InvalidSequence))]
#[case::ignored(&b"Hello \xffWorld!"[..], "utf-8", "utf-8//IGNORE", &b"Hello World!"[..], None)]
#[case::invalid(&b"\xff"[..], "utf-8", "latin1", &b""[..], Some(Condition::InvalidSequence))]
#[case::incomplete(&b"\xc2"[..], "utf-8", "latin1", &b""[..], Some(Condition::IncompleteSequence))]
#[case::partial_invalid(&b"Hello\xff"[..], "utf-8", "latin1", &b"Hello"[..], Some(Condition::InvalidSequence))]
#[case::partial_incomplete(&b"Hello\xc2"[..], "utf-8", "latin1", &b"Hello"[..], Some(Condition::IncompleteSequence))]
#[case::ignored_latin1(&b"Hello\xff World!"[..], "utf-8", "latin1//IGNORE", &b"Hello World!"[..], None)]
#[case::unmappable_ignored(CJK.as_bytes(), "utf-8", "latin1//IGNORE", &b" Hello World"[..], None)]
#[case::unmappable_transliterated(CJK.as_bytes(), "utf-8", "latin1//TRANSLIT", &b"???? Hello World"[..], None)]
fn reader(
    #[case] input: &[u8],
    #[case] from: &str,
    #[case] to: &str,
    #[case] output: &[u8],
    #[case] condition: Option<Condition>,
) {
    init_logger();
    let mut reader = DecodingReader::new(input, from, to).unwrap();
    assert_eq!(read_until_error(&mut reader, 64), (output.to_vec(), condition));
}

#[rstest]
#[case::simple(&b"Hello World!"[..], "utf-8", "latin1", &b"Hello World!"[..], None)]
#[case::partial(&b"Hello\xffWorld!"[..], "utf-8", "utf-8", &b"Hello"[..], Some(Condition::InvalidSequence))]
#[case::ignored(&b"Hello \xffWorld!"[..], "utf-8", "utf-8//IGNORE", &b"Hello World!"[..], None)]
#[case::invalid(&b"\xff"[..], "utf-8", "latin1", &b""[..], Some(Condition::InvalidSequence))]
#[case::incomplete(&b"\xc2"[..], "utf-8", "latin1", &b""[..], Some(Condition::IncompleteSequence))]
#[case::partial_invalid(&b"Hello\xff"[..], "utf-8", "latin1", &b"Hello"[..], Some(Condition::InvalidSequence))]
#[case::partial_incomplete(&b"Hello\xc2"[..], "utf-8", "latin1", &b"Hello"[..], None)]
#[case::ignored_latin1(&b"Hello\xff World!"[..], "utf-8", "latin1//IGNORE", &b"Hello World!"[..], None)]
#[case::unmappable_ignored(CJK.as_bytes(), "utf-8", "latin1//IGNORE", &b" Hello World"[..], None)]
#[case::unmappable_transliterated(CJK.as_bytes(), "utf-8", "latin1//TRANSLIT", &b"???? Hello World"[..], None)]
fn writer(
    #[case] input: &[u8],
    #[case] from: &str,
    #[case] to: &str,
    #[case] output: &[u8],
    #[case] condition: Option<Condition>,
) {
    init_logger();
    let mut writer = EncodingWriter::new(Vec::new(), from, to).unwrap();
    let written = writer.write_all(input);
    let closed = writer.close();
    let error = written.and(closed).err();
    assert_eq!(writer.writer_ref(), output);
    assert_eq!(error.as_ref().and_then(Condition::wrapped_in), condition);
    assert_eq!(error.is_some(), condition.is_some());
}

#[rstest]
#[case::source("doesnotexist", "utf-8")]
#[case::target("utf-8", "doesnotexist")]
#[case::modifier("utf-8", "latin1//NOSUCHTHING")]
#[case::decode_only("utf-8", "replacement")]
fn unsupported_pair(#[case] from: &str, #[case] to: &str) {
    assert!(matches!(
        crate::convert(b"", &mut [0; 8], from, to),
        Err(Error::UnsupportedEncodingPair { .. })
    ));
    assert!(matches!(
        crate::convert_to_vec(b"", from, to),
        Err(Error::UnsupportedEncodingPair { .. })
    ));
    assert!(matches!(
        DecodingReader::new(&b""[..], from, to),
        Err(Error::UnsupportedEncodingPair { .. })
    ));
    assert!(matches!(
        EncodingWriter::new(Vec::new(), from, to),
        Err(Error::UnsupportedEncodingPair { .. })
    ));
}
