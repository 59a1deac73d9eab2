//! Response type for submitted lines.

use std::time::Duration;

/// Output of one submitted line or query.
#[derive(Debug, Clone)]
pub struct Response {
    /// The line that was submitted, masked if it was secret.
    pub command: String,

    /// The output with command echo and trailing prompt removed.
    pub result: String,

    /// The prompt or input request that ended the read.
    pub prompt: String,

    /// Whether the read ended on a device question rather than a prompt.
    pub awaiting_input: bool,

    /// Time taken to execute the command.
    pub elapsed: Duration,
}

impl Response {
    /// Create a response that ended on a prompt.
    pub fn new(
        command: impl Into<String>,
        result: impl Into<String>,
        prompt: impl Into<String>,
        elapsed: Duration,
    ) -> Self {
        Self {
            command: command.into(),
            result: result.into(),
            prompt: prompt.into(),
            awaiting_input: false,
            elapsed,
        }
    }

    /// Mark the response as ending on an input request.
    pub fn with_awaiting_input(mut self, awaiting_input: bool) -> Self {
        self.awaiting_input = awaiting_input;
        self
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
