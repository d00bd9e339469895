//! Removal of terminal title sequences from shell output.
//!
//! Some servers set the terminal title from `PROMPT_COMMAND` on every prompt,
//! emitting `ESC ] 0 ; user@host: ~ BEL`. The sequence lands in the middle of
//! command output and would break marker matching, so it is cut out before
//! any stop condition runs. This is not a general escape-sequence parser.

use std::borrow::Cow;
use std::sync::LazyLock;

use regex::bytes::Regex;

const BEL: u8 = 0x07;

static TITLE_SEQUENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?-u)\x1b\]0;[^\x07]*\x07").expect("title sequence regex is valid")
});

/// Strip every complete OSC "set title" sequence from `data`.
///
/// Text before and after each sequence is preserved. A sequence whose
/// terminating BEL has not arrived yet is left untouched, so a caller that
/// filters its accumulated buffer after each chunk removes it once complete.
pub fn strip_title_sequences(data: &[u8]) -> Cow<'_, [u8]> {
    if memchr::memchr(BEL, data).is_none() {
        return Cow::Borrowed(data);
    }
    TITLE_SEQUENCE.replace_all(data, &b""[..])
}

/// Whether `data` contains a BEL, i.e. whether filtering could change it.
pub(crate) fn contains_bel(data: &[u8]) -> bool {
    memchr::memchr(BEL, data).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_bel_is_borrowed() {
        let out = strip_title_sequences(b"plain output\n");
        assert!(matches!(out, Cow::Borrowed(_)));
        assert_eq!(&*out, b"plain output\n");
    }

    #[test]
    fn test_strips_title_keeping_surroundings() {
        let out = strip_title_sequences(b"before\x1b]0;admin@box: ~\x07after");
        assert_eq!(&*out, b"beforeafter");
    }

    #[test]
    fn test_strips_every_sequence() {
        let out = strip_title_sequences(b"\x1b]0;a@b\x07one\n\x1b]0;a@b\x07two");
        assert_eq!(&*out, b"one\ntwo");
    }

    #[test]
    fn test_incomplete_sequence_is_kept() {
        let out = strip_title_sequences(b"x\x07y\x1b]0;user@ho");
        assert_eq!(&*out, b"x\x07y\x1b]0;user@ho");
    }

    #[test]
    fn test_idempotent() {
        let once = strip_title_sequences(b"a\x1b]0;u@h\x07b\x07c").into_owned();
        let twice = strip_title_sequences(&once).into_owned();
        assert_eq!(once, twice);
        assert_eq!(once, b"ab\x07c");
    }

    #[test]
    fn test_non_utf8_title() {
        let out = strip_title_sequences(b"ok\x1b]0;\xff\xfe\x07done");
        assert_eq!(&*out, b"okdone");
    }
}
