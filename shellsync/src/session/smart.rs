//! Smart console: prompt-marker command boundaries.
//!
//! The remote shell's prompt is replaced with a unique marker. After a
//! command is sent, output is read until the marker is the very last thing
//! received, which is the shell announcing it is ready for the next line.
//!
//! This only works when the shell echoes input and honors the prompt
//! variable set by [`ShellDialect::prompt_command`]. Shells outside the two
//! recognized families get the Bourne syntax and may never show the marker.

use std::time::{Duration, Instant};

use log::{debug, warn};
use tokio::io::{AsyncRead, AsyncWrite};

use super::dialect::{DETECT_COMMAND, DETECT_PATTERN, ShellDialect, parse_detection_output};
use super::marker::SmartMarker;
use super::response::Response;
use super::shell::Session;
use crate::channel::ReadResult;
use crate::error::Result;

/// Comment line used to check that the shell is responsive.
const READY_COMMAND: &str = "#";

impl<S> Session<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    /// Send a no-op line and drain output until the shell goes quiet.
    ///
    /// Clears banners and stale prompts out of the stream. The returned
    /// result has `pattern_matched == false` if the shell sent nothing.
    pub async fn ready(&mut self, timeout: Option<Duration>) -> Result<ReadResult> {
        self.send_line(READY_COMMAND).await?;
        let settle = self.options.settle;
        self.channel
            .read_until_content_then_quiet(settle, timeout, true)
            .await
    }

    /// Classify the remote shell, querying it only on the first call.
    ///
    /// An unrecognized shell name yields [`ShellDialect::Unknown`] and is
    /// cached like any other. If the name is not echoed within `timeout`,
    /// `Unknown` is returned without caching so a later call can retry.
    pub async fn detect_dialect(&mut self, timeout: Option<Duration>) -> Result<ShellDialect> {
        if let Some(dialect) = self.dialect {
            return Ok(dialect);
        }

        self.ready(timeout).await?;
        self.send_line(DETECT_COMMAND).await?;
        let read = self
            .channel
            .read_until_pattern(&DETECT_PATTERN, timeout, true)
            .await?;

        let Some(token) = parse_detection_output(&read.data) else {
            warn!(
                "shell name not echoed within {:?}; assuming unknown dialect",
                timeout
            );
            return Ok(ShellDialect::Unknown);
        };

        let dialect = ShellDialect::from_token(&token);
        debug!("detected shell '{}' as {}", token, dialect);
        self.dialect = Some(dialect);
        Ok(dialect)
    }

    /// Install `marker` (or a generated one) as the remote prompt.
    ///
    /// When `dialect` is `None` it is detected first. After sending the
    /// prompt command this waits for a response and a quiet period; it does
    /// not verify that the marker was printed.
    pub async fn configure_smart_console(
        &mut self,
        marker: Option<SmartMarker>,
        dialect: Option<ShellDialect>,
        timeout: Option<Duration>,
    ) -> Result<SmartMarker> {
        let marker = marker.unwrap_or_else(SmartMarker::generate);
        let dialect = match dialect {
            Some(dialect) => dialect,
            None => self.detect_dialect(timeout).await?,
        };

        self.send_line(&dialect.prompt_command(marker.as_str()))
            .await?;

        let settle = self.options.settle;
        let settled = self
            .channel
            .read_until_content_then_quiet(settle, timeout, true)
            .await?;
        if !settled.pattern_matched {
            warn!("no response after setting the prompt within {:?}", timeout);
        }

        debug!("smart console configured: marker={:?} dialect={}", marker.as_str(), dialect);
        self.marker = Some(marker.clone());
        Ok(marker)
    }

    /// Run `command` and wait for the marker to end the output.
    ///
    /// Configures the smart console with defaults first if needed. With
    /// `trim_echo`, the echoed command and the trailing marker are removed
    /// and the rest is trimmed.
    ///
    /// With `timeout = None` this waits forever if the marker never comes
    /// back; otherwise the response has `completed == false` and holds the
    /// output read so far.
    pub async fn run_smart_command(
        &mut self,
        command: &str,
        trim_echo: bool,
        timeout: Option<Duration>,
        normalize_line_endings: bool,
    ) -> Result<Response> {
        let marker = match self.marker.clone() {
            Some(marker) => marker,
            None => self.configure_smart_console(None, None, timeout).await?,
        };

        let start = Instant::now();
        self.send_line(command).await?;
        let read = self
            .channel
            .read_until_tail_marker(marker.as_str(), timeout, normalize_line_endings)
            .await?;

        let completed = read.pattern_matched;
        if !completed {
            warn!("marker not seen after {:?} within {:?}", command, timeout);
        }

        let raw_result = read.into_string();
        let result = if trim_echo {
            trim_echo_and_marker(&raw_result, command, marker.as_str())
        } else {
            raw_result.clone()
        };

        Ok(Response::new(
            command,
            result,
            raw_result,
            marker.as_str(),
            start.elapsed(),
            completed,
        ))
    }

    /// Run `command` with the session's default timeout, trimming the echo.
    pub async fn send_command(&mut self, command: &str) -> Result<Response> {
        let timeout = self.options.timeout;
        let normalize = self.options.normalize_line_endings;
        self.run_smart_command(command, true, timeout, normalize)
            .await
    }

    /// Run several commands in order, stopping at the first error.
    pub async fn send_commands(&mut self, commands: &[&str]) -> Result<Vec<Response>> {
        let mut responses = Vec::with_capacity(commands.len());
        for command in commands {
            responses.push(self.send_command(command).await?);
        }
        Ok(responses)
    }
}

/// Drop the echoed command line and the trailing marker.
fn trim_echo_and_marker(raw: &str, command: &str, marker: &str) -> String {
    let body = match raw.strip_prefix(command) {
        Some(rest) => rest
            .strip_prefix("\r\n")
            .or_else(|| rest.strip_prefix('\n'))
            .unwrap_or(rest),
        // Echo mangled (e.g. by line editing): skip its length blindly.
        None => raw.get(command.len() + 1..).unwrap_or(raw),
    };
    let body = body.strip_suffix(marker).unwrap_or(body);
    body.trim().to_string()
}
