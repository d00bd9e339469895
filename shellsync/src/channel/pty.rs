//! PTY channel read engine.
//!
//! Every strategy awaits one read at a time, raced against a timer that is
//! re-armed whenever a non-empty chunk arrives. A remote shell streaming
//! output in slow bursts therefore never gets cut off as long as each gap
//! stays inside the window.

use std::borrow::Cow;
use std::time::{Duration, Instant};

use log::{debug, trace};
use regex::bytes::Regex;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use super::buffer::ReadBuffer;
use super::patterns::{StopCondition, Substring, TailMarker};
use crate::error::{ChannelError, Result};

/// Size of a single read from the stream.
const CHUNK_SIZE: usize = 4096;

/// Convert a timeout in seconds to a read window, where `0` waits forever.
///
/// Values too large for a `Duration` (including infinity) also wait forever.
pub fn wait_from_secs(secs: f64) -> Option<Duration> {
    if secs > 0.0 {
        Duration::try_from_secs_f64(secs).ok()
    } else {
        None
    }
}

/// Read engine over an already-open duplex byte stream.
///
/// Owns the stream exclusively. All reads take `&mut self`, so only one
/// operation can be in flight on a channel at a time.
pub struct PtyChannel<S> {
    /// The duplex stream (an SSH shell channel in production).
    stream: S,

    /// Remove terminal title sequences before checking stop conditions.
    strip_title_noise: bool,

    /// Scratch space for a single read.
    chunk: Vec<u8>,
}

impl<S> PtyChannel<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    /// Create a channel over `stream` with title stripping enabled.
    pub fn new(stream: S) -> Self {
        Self {
            stream,
            strip_title_noise: true,
            chunk: vec![0; CHUNK_SIZE],
        }
    }

    /// Whether terminal title sequences are stripped from output.
    pub fn strip_title_noise(&self) -> bool {
        self.strip_title_noise
    }

    /// Enable or disable terminal title stripping.
    pub fn set_strip_title_noise(&mut self, enabled: bool) {
        self.strip_title_noise = enabled;
    }

    /// Get a mutable reference to the underlying stream.
    pub fn get_mut(&mut self) -> &mut S {
        &mut self.stream
    }

    /// Consume the channel, returning the stream.
    pub fn into_inner(self) -> S {
        self.stream
    }

    /// Write all of `data` and flush.
    pub async fn write(&mut self, data: &[u8]) -> Result<()> {
        self.stream
            .write_all(data)
            .await
            .map_err(ChannelError::Io)?;
        self.stream.flush().await.map_err(ChannelError::Io)?;
        trace!("wrote {} bytes", data.len());
        Ok(())
    }

    /// Shut down the write side of the stream.
    pub async fn shutdown(&mut self) -> Result<()> {
        self.stream.shutdown().await.map_err(ChannelError::Io)?;
        Ok(())
    }

    /// Await one chunk of at most `max` bytes.
    ///
    /// Returns `Ok(None)` when `window` elapses first. EOF is reported as
    /// [`ChannelError::Closed`] so a dead connection is never mistaken for a
    /// quiet one.
    async fn read_chunk(&mut self, max: usize, window: Option<Duration>) -> Result<Option<usize>> {
        let max = max.min(self.chunk.len());
        let read = self.stream.read(&mut self.chunk[..max]);

        let n = match window {
            Some(window) => match tokio::time::timeout(window, read).await {
                Ok(result) => result,
                Err(_) => return Ok(None),
            },
            None => read.await,
        }
        .map_err(ChannelError::Io)?;

        if n == 0 {
            debug!("stream closed by remote");
            return Err(ChannelError::Closed.into());
        }

        trace!("read chunk: {} bytes", n);
        Ok(Some(n))
    }

    /// Read until `count` bytes have arrived or `timeout` passes without data.
    ///
    /// Never requests more than the remaining count, so the result is at
    /// most `count` bytes. Bytes are returned exactly as received.
    pub async fn read_exact_bytes(
        &mut self,
        count: usize,
        timeout: Option<Duration>,
    ) -> Result<ReadResult> {
        let start = Instant::now();
        let mut buffer = ReadBuffer::raw();

        while buffer.len() < count {
            match self.read_chunk(count - buffer.len(), timeout).await? {
                Some(n) => buffer.extend(&self.chunk[..n]),
                None => {
                    debug!("read_exact_bytes: timed out with {}/{} bytes", buffer.len(), count);
                    break;
                }
            }
        }

        let pattern_matched = buffer.len() == count;
        Ok(ReadResult::new(buffer, pattern_matched, start))
    }

    /// Read until `condition` holds for the cleaned buffer, or `timeout`
    /// passes without new data.
    pub async fn read_until<C>(
        &mut self,
        condition: &C,
        timeout: Option<Duration>,
        normalize_line_endings: bool,
    ) -> Result<ReadResult>
    where
        C: StopCondition + ?Sized,
    {
        let start = Instant::now();
        let mut buffer = ReadBuffer::new(normalize_line_endings, self.strip_title_noise);
        let mut pattern_matched = false;

        while let Some(n) = self.read_chunk(CHUNK_SIZE, timeout).await? {
            buffer.extend(&self.chunk[..n]);
            if condition.is_satisfied(buffer.as_slice()) {
                pattern_matched = true;
                break;
            }
        }

        if pattern_matched {
            debug!("read_until: matched after {} bytes", buffer.len());
        } else {
            debug!(
                "read_until: no match within {:?} of silence, returning {} bytes",
                timeout,
                buffer.len()
            );
        }

        Ok(ReadResult::new(buffer, pattern_matched, start))
    }

    /// Read until `marker` appears anywhere in the output.
    pub async fn read_until_substring(
        &mut self,
        marker: &str,
        timeout: Option<Duration>,
        normalize_line_endings: bool,
    ) -> Result<ReadResult> {
        self.read_until(&Substring::new(marker), timeout, normalize_line_endings)
            .await
    }

    /// Read until the output ends with `marker`.
    ///
    /// A marker followed by more output does not stop the read. With
    /// `timeout = None` this waits forever if the marker never ends a chunk.
    pub async fn read_until_tail_marker(
        &mut self,
        marker: &str,
        timeout: Option<Duration>,
        normalize_line_endings: bool,
    ) -> Result<ReadResult> {
        self.read_until(&TailMarker::new(marker), timeout, normalize_line_endings)
            .await
    }

    /// Read until `pattern` matches anywhere in the output.
    pub async fn read_until_pattern(
        &mut self,
        pattern: &Regex,
        timeout: Option<Duration>,
        normalize_line_endings: bool,
    ) -> Result<ReadResult> {
        self.read_until(pattern, timeout, normalize_line_endings)
            .await
    }

    /// Compile `pattern` and read until it matches.
    pub async fn read_until_regex(
        &mut self,
        pattern: &str,
        timeout: Option<Duration>,
        normalize_line_endings: bool,
    ) -> Result<ReadResult> {
        let pattern = Regex::new(pattern).map_err(ChannelError::InvalidPattern)?;
        self.read_until_pattern(&pattern, timeout, normalize_line_endings)
            .await
    }

    /// Read until `quiet` passes with no new data.
    ///
    /// There is no overall deadline: a stream that never pauses for `quiet`
    /// keeps this call running.
    pub async fn read_until_quiet(
        &mut self,
        quiet: Duration,
        normalize_line_endings: bool,
    ) -> Result<ReadResult> {
        let start = Instant::now();
        let mut buffer = ReadBuffer::new(normalize_line_endings, self.strip_title_noise);
        self.fill_until_quiet(&mut buffer, quiet).await?;
        Ok(ReadResult::new(buffer, true, start))
    }

    /// Wait up to `timeout` for the first byte, then read until quiet.
    ///
    /// `pattern_matched` is false when nothing arrived at all.
    pub async fn read_until_content_then_quiet(
        &mut self,
        quiet: Duration,
        timeout: Option<Duration>,
        normalize_line_endings: bool,
    ) -> Result<ReadResult> {
        let start = Instant::now();
        let mut buffer = ReadBuffer::new(normalize_line_endings, self.strip_title_noise);

        let Some(n) = self.read_chunk(CHUNK_SIZE, timeout).await? else {
            debug!("read_until_content_then_quiet: nothing within {:?}", timeout);
            return Ok(ReadResult::new(buffer, false, start));
        };
        buffer.extend(&self.chunk[..n]);

        self.fill_until_quiet(&mut buffer, quiet).await?;
        Ok(ReadResult::new(buffer, true, start))
    }

    async fn fill_until_quiet(&mut self, buffer: &mut ReadBuffer, quiet: Duration) -> Result<()> {
        while let Some(n) = self.read_chunk(CHUNK_SIZE, Some(quiet)).await? {
            buffer.extend(&self.chunk[..n]);
        }
        trace!("quiet for {:?} after {} bytes", quiet, buffer.len());
        Ok(())
    }
}

impl<S> std::fmt::Debug for PtyChannel<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PtyChannel")
            .field("strip_title_noise", &self.strip_title_noise)
            .finish_non_exhaustive()
    }
}

/// Result of a read operation.
///
/// Running out of time is not an error: `pattern_matched` tells whether the
/// stop condition was met, and `data` holds whatever arrived.
#[derive(Debug, Clone)]
pub struct ReadResult {
    /// The data that was read, after cleaning.
    pub data: Vec<u8>,

    /// Whether the stop condition was met.
    pub pattern_matched: bool,

    /// Time spent in the read.
    pub elapsed: Duration,
}

impl ReadResult {
    fn new(buffer: ReadBuffer, pattern_matched: bool, start: Instant) -> Self {
        Self {
            data: buffer.as_slice().to_vec(),
            pattern_matched,
            elapsed: start.elapsed(),
        }
    }

    /// Get the data as a string (lossy UTF-8).
    pub fn as_str(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.data)
    }

    /// Consume the result, returning the data as a string (lossy UTF-8).
    pub fn into_string(self) -> String {
        match String::from_utf8(self.data) {
            Ok(text) => text,
            Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
        }
    }

    /// Number of bytes read.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether nothing was read.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use tokio::io::{AsyncWriteExt, DuplexStream};
    use tokio::time::sleep;

    use super::*;
    use crate::error::Error;

    const TIMEOUT: Option<Duration> = Some(Duration::from_secs(5));

    /// Write `chunks` to `stream`, pausing `gap` after each, then stay open.
    fn trickle(mut stream: DuplexStream, chunks: Vec<&'static [u8]>, gap: Duration) {
        tokio::spawn(async move {
            for chunk in chunks {
                stream.write_all(chunk).await.unwrap();
                sleep(gap).await;
            }
            sleep(Duration::from_secs(3600)).await;
        });
    }

    #[test]
    fn test_wait_from_secs() {
        assert_eq!(wait_from_secs(0.0), None);
        assert_eq!(wait_from_secs(1.5), Some(Duration::from_millis(1500)));
    }

    #[test]
    fn test_wait_from_secs_unbounded() {
        assert_eq!(wait_from_secs(f64::INFINITY), None);
        assert_eq!(wait_from_secs(f64::MAX), None);
        assert_eq!(wait_from_secs(f64::NAN), None);
        assert_eq!(wait_from_secs(-1.0), None);
    }

    #[tokio::test]
    async fn test_exact_bytes_across_reads() {
        let mock = tokio_test::io::Builder::new()
            .read(b"hel")
            .read(b"lo")
            .build();
        let mut channel = PtyChannel::new(mock);

        let read = channel.read_exact_bytes(5, TIMEOUT).await.unwrap();
        assert!(read.pattern_matched);
        assert_eq!(read.as_str(), "hello");
    }

    #[tokio::test]
    async fn test_exact_bytes_never_overshoots() {
        let (client, mut server) = tokio::io::duplex(1024);
        server.write_all(b"abcdefgh").await.unwrap();
        let mut channel = PtyChannel::new(client);

        let first = channel.read_exact_bytes(5, TIMEOUT).await.unwrap();
        assert_eq!(first.data, b"abcde");
        let rest = channel.read_exact_bytes(3, TIMEOUT).await.unwrap();
        assert_eq!(rest.data, b"fgh");
    }

    #[tokio::test(start_paused = true)]
    async fn test_exact_bytes_short_on_timeout() {
        let (client, mut server) = tokio::io::duplex(1024);
        server.write_all(b"ab").await.unwrap();
        let mut channel = PtyChannel::new(client);

        let read = channel
            .read_exact_bytes(5, Some(Duration::from_secs(1)))
            .await
            .unwrap();
        assert!(!read.pattern_matched);
        assert_eq!(read.data, b"ab");
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_rearms_on_data() {
        let (client, server) = tokio::io::duplex(1024);
        trickle(server, vec![&b"a"[..], b"b", b"c"], Duration::from_millis(800));
        let mut channel = PtyChannel::new(client);

        let start = tokio::time::Instant::now();
        let read = channel
            .read_exact_bytes(3, Some(Duration::from_secs(1)))
            .await
            .unwrap();
        assert_eq!(read.data, b"abc");
        assert!(start.elapsed() >= Duration::from_millis(1600));
    }

    #[tokio::test]
    async fn test_substring_stops_with_trailing_content() {
        let (client, mut server) = tokio::io::duplex(1024);
        server.write_all(b"foo MARK bar").await.unwrap();
        let mut channel = PtyChannel::new(client);

        let read = channel
            .read_until_substring("MARK", TIMEOUT, false)
            .await
            .unwrap();
        assert!(read.pattern_matched);
        assert_eq!(read.as_str(), "foo MARK bar");
    }

    #[tokio::test(start_paused = true)]
    async fn test_tail_marker_ignores_mid_buffer_marker() {
        let (client, server) = tokio::io::duplex(1024);
        trickle(
            server,
            vec![&b"foo MARK bar"[..], b"\nMARK"],
            Duration::from_millis(300),
        );
        let mut channel = PtyChannel::new(client);

        let read = channel
            .read_until_tail_marker("MARK", TIMEOUT, false)
            .await
            .unwrap();
        assert!(read.pattern_matched);
        assert_eq!(read.as_str(), "foo MARK bar\nMARK");
    }

    #[tokio::test(start_paused = true)]
    async fn test_tail_marker_times_out() {
        let (client, mut server) = tokio::io::duplex(1024);
        server.write_all(b"MARK and more").await.unwrap();
        let mut channel = PtyChannel::new(client);

        let read = channel
            .read_until_tail_marker("MARK", Some(Duration::from_secs(1)), false)
            .await
            .unwrap();
        assert!(!read.pattern_matched);
        assert_eq!(read.as_str(), "MARK and more");
    }

    #[tokio::test]
    async fn test_tail_marker_after_cleaning() {
        let (client, mut server) = tokio::io::duplex(1024);
        server
            .write_all(b"out\r\nM> \x1b]0;root@box: /tmp\x07")
            .await
            .unwrap();
        let mut channel = PtyChannel::new(client);

        let read = channel
            .read_until_tail_marker("M> ", TIMEOUT, true)
            .await
            .unwrap();
        assert!(read.pattern_matched);
        assert_eq!(read.as_str(), "out\nM> ");
    }

    #[tokio::test]
    async fn test_pattern_match() {
        let (client, mut server) = tokio::io::duplex(1024);
        server.write_all(b"Last login\r\nPassword: ").await.unwrap();
        let mut channel = PtyChannel::new(client);

        let read = channel
            .read_until_regex(r"[Pp]assword: ?$", TIMEOUT, true)
            .await
            .unwrap();
        assert!(read.pattern_matched);
        assert_eq!(read.as_str(), "Last login\nPassword: ");
    }

    #[tokio::test]
    async fn test_invalid_pattern() {
        let (client, _server) = tokio::io::duplex(1024);
        let mut channel = PtyChannel::new(client);

        let err = channel.read_until_regex("(", TIMEOUT, false).await.unwrap_err();
        assert!(matches!(err, Error::Channel(ChannelError::InvalidPattern(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_quiet_never_returns_during_trickle() {
        let (client, mut server) = tokio::io::duplex(1024);
        tokio::spawn(async move {
            while server.write_all(b".").await.is_ok() {
                sleep(Duration::from_millis(500)).await;
            }
        });
        let mut channel = PtyChannel::new(client);

        let outcome = tokio::time::timeout(
            Duration::from_secs(2),
            channel.read_until_quiet(Duration::from_secs(1), false),
        )
        .await;
        assert!(outcome.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_quiet_returns_after_trickle_stops() {
        let (client, server) = tokio::io::duplex(1024);
        trickle(server, vec![&b"."[..]; 6], Duration::from_millis(500));
        let mut channel = PtyChannel::new(client);

        let start = tokio::time::Instant::now();
        let read = channel
            .read_until_quiet(Duration::from_secs(1), false)
            .await
            .unwrap();
        assert_eq!(read.data, b"......");
        assert!(start.elapsed() >= Duration::from_millis(3500));
    }

    #[tokio::test(start_paused = true)]
    async fn test_content_then_quiet_without_content() {
        let (client, _server) = tokio::io::duplex(1024);
        let mut channel = PtyChannel::new(client);

        let read = channel
            .read_until_content_then_quiet(
                Duration::from_millis(200),
                Some(Duration::from_secs(1)),
                false,
            )
            .await
            .unwrap();
        assert!(!read.pattern_matched);
        assert!(read.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_content_then_quiet_concatenates() {
        let (client, server) = tokio::io::duplex(1024);
        trickle(server, vec![&b"first "[..], b"second"], Duration::from_millis(300));
        let mut channel = PtyChannel::new(client);

        let read = channel
            .read_until_content_then_quiet(Duration::from_millis(500), TIMEOUT, false)
            .await
            .unwrap();
        assert!(read.pattern_matched);
        assert_eq!(read.as_str(), "first second");
    }

    #[tokio::test]
    async fn test_closed_stream_is_an_error() {
        let (client, mut server) = tokio::io::duplex(1024);
        server.write_all(b"partial").await.unwrap();
        drop(server);
        let mut channel = PtyChannel::new(client);

        let err = channel
            .read_until_substring("never", None, false)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Channel(ChannelError::Closed)));
    }
}
