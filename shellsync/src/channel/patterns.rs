//! Stop conditions for the marker and pattern read strategies.

use memchr::memmem;
use regex::bytes::Regex;

/// Decides when an accumulating read is complete.
///
/// Conditions are evaluated against the cleaned buffer (line endings
/// normalized, title noise removed) after every chunk.
pub trait StopCondition: Send + Sync {
    /// Returns true once `data` satisfies the condition.
    fn is_satisfied(&self, data: &[u8]) -> bool;
}

/// Regex condition: satisfied by a match anywhere in the buffer.
impl StopCondition for Regex {
    fn is_satisfied(&self, data: &[u8]) -> bool {
        self.is_match(data)
    }
}

/// Satisfied when the marker occurs anywhere, even with output after it.
#[derive(Debug, Clone)]
pub struct Substring {
    finder: memmem::Finder<'static>,
}

impl Substring {
    /// Create a substring condition.
    pub fn new(marker: impl AsRef<[u8]>) -> Self {
        Self {
            finder: memmem::Finder::new(marker.as_ref()).into_owned(),
        }
    }
}

impl StopCondition for Substring {
    fn is_satisfied(&self, data: &[u8]) -> bool {
        self.finder.find(data).is_some()
    }
}

/// Satisfied only when the buffer ends with the marker.
///
/// Only the last `marker.len()` bytes are compared, so the check costs the
/// same however long the session output grows.
#[derive(Debug, Clone)]
pub struct TailMarker {
    marker: Vec<u8>,
}

impl TailMarker {
    /// Create a tail-marker condition.
    pub fn new(marker: impl AsRef<[u8]>) -> Self {
        Self {
            marker: marker.as_ref().to_vec(),
        }
    }
}

impl StopCondition for TailMarker {
    fn is_satisfied(&self, data: &[u8]) -> bool {
        data.ends_with(&self.marker)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_substring_anywhere() {
        let cond = Substring::new("READY");
        assert!(cond.is_satisfied(b"xx READY yy"));
        assert!(cond.is_satisfied(b"READY"));
        assert!(!cond.is_satisfied(b"READ"));
    }

    #[test]
    fn test_tail_marker_requires_suffix() {
        let cond = TailMarker::new("$> ");
        assert!(cond.is_satisfied(b"output\n$> "));
        assert!(!cond.is_satisfied(b"$> more output"));
        assert!(!cond.is_satisfied(b"> "));
    }

    #[test]
    fn test_regex_condition() {
        let re = Regex::new(r"login: ?$").unwrap();
        assert!(re.is_satisfied(b"Welcome\nlogin: "));
        assert!(!re.is_satisfied(b"login failed\n"));
    }
}
