//! Interactive shell session over a duplex byte stream.

use std::time::Duration;

use log::{trace, warn};
use regex::bytes::Regex;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncRead, AsyncWrite};

use super::dialect::ShellDialect;
use super::marker::SmartMarker;
use crate::channel::{PtyChannel, ReadResult};
use crate::error::{Result, SessionError};
use crate::transport::SshTransport;

/// Tunables for a [`Session`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionOptions {
    /// Default silence window for smart commands; `None` waits forever.
    pub timeout: Option<Duration>,

    /// Quiet period that ends settle reads (shell readiness, prompt setup).
    pub settle: Duration,

    /// Remove terminal title sequences from output.
    pub strip_title_noise: bool,

    /// Collapse CRLF to LF in smart command output.
    pub normalize_line_endings: bool,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            timeout: Some(Duration::from_secs(30)),
            settle: Duration::from_millis(500),
            strip_title_noise: true,
            normalize_line_endings: true,
        }
    }
}

/// Command/response session on a remote interactive shell.
///
/// Owns its stream exclusively. Every operation takes `&mut self`, so a
/// session is driven by one caller at a time; sharing one across tasks
/// needs an outer lock.
///
/// # Example
///
/// ```rust,no_run
/// use shellsync::Session;
///
/// # async fn example(stream: tokio::io::DuplexStream) -> Result<(), shellsync::Error> {
/// let mut session = Session::new(stream);
/// let response = session.send_command("uname -s").await?;
/// println!("{}", response.result);
/// # Ok(())
/// # }
/// ```
pub struct Session<S> {
    /// Read engine over the shell stream.
    pub(super) channel: PtyChannel<S>,

    /// Session tunables.
    pub(super) options: SessionOptions,

    /// Cached dialect, set by the first successful detection.
    pub(super) dialect: Option<ShellDialect>,

    /// Marker currently installed as the prompt.
    pub(super) marker: Option<SmartMarker>,

    /// Connection kept alive for sessions opened over SSH.
    transport: Option<SshTransport>,
}

impl<S> Session<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    /// Create a session over an already-open shell stream.
    pub fn new(stream: S) -> Self {
        Self::with_options(stream, SessionOptions::default())
    }

    /// Create a session with explicit options.
    pub fn with_options(stream: S, options: SessionOptions) -> Self {
        let mut channel = PtyChannel::new(stream);
        channel.set_strip_title_noise(options.strip_title_noise);
        Self {
            channel,
            options,
            dialect: None,
            marker: None,
            transport: None,
        }
    }

    /// Keep `transport` open for the life of the session.
    pub(crate) fn with_transport(mut self, transport: SshTransport) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Get the session options.
    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    /// Set the default timeout for smart commands.
    pub fn set_timeout(&mut self, timeout: Option<Duration>) {
        self.options.timeout = timeout;
    }

    /// Whether terminal title sequences are stripped from output.
    pub fn strip_title_noise(&self) -> bool {
        self.channel.strip_title_noise()
    }

    /// Enable or disable terminal title stripping.
    pub fn set_strip_title_noise(&mut self, enabled: bool) {
        self.options.strip_title_noise = enabled;
        self.channel.set_strip_title_noise(enabled);
    }

    /// The cached shell dialect, if detection has succeeded.
    pub fn dialect(&self) -> Option<ShellDialect> {
        self.dialect
    }

    /// Forget the cached dialect so the next detection queries the shell.
    pub fn reset_dialect(&mut self) {
        self.dialect = None;
    }

    /// The marker currently installed as the prompt.
    pub fn marker(&self) -> Option<&SmartMarker> {
        self.marker.as_ref()
    }

    /// The SSH connection behind this session, if it was opened over SSH.
    pub fn transport(&self) -> Option<&SshTransport> {
        self.transport.as_ref()
    }

    /// Get a mutable reference to the read engine.
    pub fn channel_mut(&mut self) -> &mut PtyChannel<S> {
        &mut self.channel
    }

    /// Write `text` as-is.
    pub async fn send(&mut self, text: &str) -> Result<()> {
        trace!("send: {:?}", text);
        self.channel.write(text.as_bytes()).await
    }

    /// Write `line` followed by a newline.
    pub async fn send_line(&mut self, line: &str) -> Result<()> {
        let mut data = String::with_capacity(line.len() + 1);
        data.push_str(line);
        data.push('\n');
        self.send(&data).await
    }

    /// Send a control character, e.g. `'c'` for Ctrl-C.
    pub async fn send_control(&mut self, key: char) -> Result<()> {
        let byte = control_byte(key).ok_or(SessionError::InvalidControlKey(key))?;
        trace!("send: control {:?}", key);
        self.channel.write(&[byte]).await
    }

    /// Read `count` bytes; see [`PtyChannel::read_exact_bytes`].
    pub async fn read_exact_bytes(
        &mut self,
        count: usize,
        timeout: Option<Duration>,
    ) -> Result<ReadResult> {
        self.channel.read_exact_bytes(count, timeout).await
    }

    /// Read until `marker` appears anywhere in the output.
    pub async fn read_until_substring(
        &mut self,
        marker: &str,
        timeout: Option<Duration>,
        normalize_line_endings: bool,
    ) -> Result<ReadResult> {
        self.channel
            .read_until_substring(marker, timeout, normalize_line_endings)
            .await
    }

    /// Read until the output ends with `marker`.
    pub async fn read_until_tail_marker(
        &mut self,
        marker: &str,
        timeout: Option<Duration>,
        normalize_line_endings: bool,
    ) -> Result<ReadResult> {
        self.channel
            .read_until_tail_marker(marker, timeout, normalize_line_endings)
            .await
    }

    /// Read until `pattern` matches.
    pub async fn read_until_pattern(
        &mut self,
        pattern: &Regex,
        timeout: Option<Duration>,
        normalize_line_endings: bool,
    ) -> Result<ReadResult> {
        self.channel
            .read_until_pattern(pattern, timeout, normalize_line_endings)
            .await
    }

    /// Read until `quiet` passes with no output. Unbounded in total time.
    pub async fn read_until_quiet(
        &mut self,
        quiet: Duration,
        normalize_line_endings: bool,
    ) -> Result<ReadResult> {
        self.channel
            .read_until_quiet(quiet, normalize_line_endings)
            .await
    }

    /// Wait for the first byte, then read until quiet.
    pub async fn read_until_content_then_quiet(
        &mut self,
        quiet: Duration,
        timeout: Option<Duration>,
        normalize_line_endings: bool,
    ) -> Result<ReadResult> {
        self.channel
            .read_until_content_then_quiet(quiet, timeout, normalize_line_endings)
            .await
    }

    /// Close the stream and, for SSH sessions, the connection.
    pub async fn close(mut self) -> Result<()> {
        if let Err(e) = self.channel.shutdown().await {
            warn!("shutdown of shell stream failed: {}", e);
        }
        if let Some(transport) = self.transport.take() {
            transport.close().await?;
        }
        Ok(())
    }
}

impl<S> std::fmt::Debug for Session<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("options", &self.options)
            .field("dialect", &self.dialect)
            .field("marker", &self.marker)
            .field("transport", &self.transport)
            .finish_non_exhaustive()
    }
}

/// Map `a`-`z` and `@[\]^_` to their control codes.
fn control_byte(key: char) -> Option<u8> {
    let upper = key.to_ascii_uppercase();
    match upper {
        '@'..='_' => Some(upper as u8 & 0x1f),
        _ => None,
    }
}
