//! Shell dialect classification.
//!
//! Only one syntax difference matters here: how to set the prompt. The
//! remote shell is asked for `$0` and the echoed name is mapped onto a
//! closed set of families.

use std::fmt;
use std::sync::LazyLock;

use regex::bytes::Regex;
use serde::{Deserialize, Serialize};

/// Command that makes the shell print its own name.
pub(crate) const DETECT_COMMAND: &str = "echo $0";

/// Echoed detection command, then a line holding the (maybe `-`-prefixed) shell name.
pub(crate) static DETECT_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    let pattern = format!(
        r"{}\r*\n(-?[^ \t\r\n]+)\r*\n",
        regex::escape(DETECT_COMMAND)
    );
    Regex::new(&pattern).expect("detection regex is valid")
});

/// Shell syntax family.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShellDialect {
    /// sh, bash, ksh, zsh and friends: `export PS1="..."`.
    #[default]
    BourneCompatible,

    /// csh and tcsh: `set prompt="..."`.
    CShellCompatible,

    /// Anything else. Treated as Bourne-compatible when setting the prompt.
    Unknown,
}

impl ShellDialect {
    /// Classify the token printed by `echo $0`.
    ///
    /// A leading `-` (login shell) and any directory part are dropped before
    /// an exact lookup. Unrecognized names map to [`ShellDialect::Unknown`].
    pub fn from_token(token: &str) -> Self {
        let name = token.strip_prefix('-').unwrap_or(token);
        let name = name.rsplit('/').next().unwrap_or(name);

        match name {
            "sh" | "bash" | "dash" | "ash" | "ksh" | "mksh" | "pdksh" | "zsh" => {
                Self::BourneCompatible
            }
            "csh" | "tcsh" => Self::CShellCompatible,
            _ => Self::Unknown,
        }
    }

    /// Command that sets the interactive prompt to `marker`.
    pub fn prompt_command(self, marker: &str) -> String {
        match self {
            Self::CShellCompatible => format!("set prompt=\"{marker}\""),
            Self::BourneCompatible | Self::Unknown => format!("export PS1=\"{marker}\""),
        }
    }

    /// Short lowercase name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::BourneCompatible => "bourne",
            Self::CShellCompatible => "cshell",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ShellDialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Extract the shell-name token from detection output.
pub(crate) fn parse_detection_output(output: &[u8]) -> Option<String> {
    let captures = DETECT_PATTERN.captures(output)?;
    let token = String::from_utf8_lossy(captures.get(1)?.as_bytes());
    Some(token.strip_prefix('-').unwrap_or(&token).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bourne_family() {
        for token in ["sh", "bash", "-bash", "/bin/zsh", "-/usr/bin/ksh", "dash"] {
            assert_eq!(ShellDialect::from_token(token), ShellDialect::BourneCompatible, "{token}");
        }
    }

    #[test]
    fn test_cshell_family() {
        assert_eq!(ShellDialect::from_token("csh"), ShellDialect::CShellCompatible);
        assert_eq!(ShellDialect::from_token("-tcsh"), ShellDialect::CShellCompatible);
    }

    #[test]
    fn test_unknown_shell() {
        assert_eq!(ShellDialect::from_token("fish"), ShellDialect::Unknown);
        assert_eq!(ShellDialect::from_token("BASH"), ShellDialect::Unknown);
        assert_eq!(ShellDialect::from_token(""), ShellDialect::Unknown);
    }

    #[test]
    fn test_prompt_commands() {
        assert_eq!(
            ShellDialect::BourneCompatible.prompt_command("M> "),
            r#"export PS1="M> ""#
        );
        assert_eq!(
            ShellDialect::CShellCompatible.prompt_command("M> "),
            r#"set prompt="M> ""#
        );
        assert_eq!(
            ShellDialect::Unknown.prompt_command("M> "),
            ShellDialect::BourneCompatible.prompt_command("M> ")
        );
    }

    #[test]
    fn test_parse_detection_output() {
        assert_eq!(
            parse_detection_output(b"$ echo $0\n-bash\n$ ").as_deref(),
            Some("bash")
        );
        assert_eq!(
            parse_detection_output(b"echo $0\r\n/bin/tcsh\r\n> ").as_deref(),
            Some("/bin/tcsh")
        );
        assert_eq!(parse_detection_output(b"echo $0\n"), None);
    }

    #[test]
    fn test_detection_pattern_follows_command() {
        let echoed = format!("{DETECT_COMMAND}\r\n-zsh\r\n% ");
        assert!(DETECT_PATTERN.is_match(echoed.as_bytes()));
        assert_eq!(
            parse_detection_output(echoed.as_bytes()).as_deref(),
            Some("zsh")
        );
        assert!(!DETECT_PATTERN.is_match(b"echo 0\n-zsh\n"));
    }

    #[test]
    fn test_default_is_bourne() {
        assert_eq!(ShellDialect::default(), ShellDialect::BourneCompatible);
        assert_eq!(ShellDialect::CShellCompatible.to_string(), "cshell");
    }
}
