//! Smart prompt marker.

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::{Result, SessionError};

/// Text placed before the timestamp in generated markers.
pub const MARKER_PREFIX: &str = "[shellsync:";

/// Text placed after the timestamp in generated markers.
pub const MARKER_SUFFIX: &str = "]> ";

/// Prompt string installed on the remote shell as a completion sentinel.
///
/// Generated markers avoid `$`, `%`, `\` and `!`, which shells expand inside
/// prompt strings; the prompt must print back exactly as sent.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SmartMarker(String);

impl SmartMarker {
    /// Build a marker from the current Unix time.
    pub fn generate() -> Self {
        let secs = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();
        Self(format!("{MARKER_PREFIX}{secs}{MARKER_SUFFIX}"))
    }

    /// Use a caller-chosen marker.
    pub fn custom(marker: impl Into<String>) -> Result<Self> {
        let marker = marker.into();
        if marker.is_empty() {
            return Err(SessionError::EmptyMarker.into());
        }
        Ok(Self(marker))
    }

    /// The marker text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for SmartMarker {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SmartMarker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_shape() {
        let marker = SmartMarker::generate();
        let digits = marker
            .as_str()
            .strip_prefix(MARKER_PREFIX)
            .and_then(|rest| rest.strip_suffix(MARKER_SUFFIX))
            .unwrap();
        assert!(!digits.is_empty());
        assert!(digits.bytes().all(|b| b.is_ascii_digit()));
        assert!(!marker.as_str().contains(['$', '%', '\\', '!']));
    }

    #[test]
    fn test_custom_rejects_empty() {
        assert!(SmartMarker::custom("").is_err());
        assert_eq!(SmartMarker::custom("END> ").unwrap().as_str(), "END> ");
    }
}
