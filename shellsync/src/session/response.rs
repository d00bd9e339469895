//! Response type for smart command results.

use std::time::Duration;

/// Response from a smart command.
#[derive(Debug, Clone)]
pub struct Response {
    /// The command that was executed.
    pub command: String,

    /// The command output (echo and trailing marker removed when trimming).
    pub result: String,

    /// The raw output as captured, including echo and marker.
    pub raw_result: String,

    /// The marker that ended the output.
    pub marker: String,

    /// Time taken to execute the command.
    pub elapsed: Duration,

    /// Whether the marker was observed before the timeout.
    pub completed: bool,
}

impl Response {
    /// Create a new response.
    pub fn new(
        command: impl Into<String>,
        result: impl Into<String>,
        raw_result: impl Into<String>,
        marker: impl Into<String>,
        elapsed: Duration,
        completed: bool,
    ) -> Self {
        Self {
            command: command.into(),
            result: result.into(),
            raw_result: raw_result.into(),
            marker: marker.into(),
            elapsed,
            completed,
        }
    }

    /// Check whether the command ran to its prompt.
    pub fn is_complete(&self) -> bool {
        self.completed
    }

    /// Get the result lines as an iterator.
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.result.lines()
    }

    /// Check if the result contains a substring.
    pub fn contains(&self, pattern: &str) -> bool {
        self.result.contains(pattern)
    }
}

impl std::fmt::Display for Response {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.result)
    }
}
