//! Per-read accumulation buffer.
//!
//! Each read strategy owns one `ReadBuffer` for the duration of the call.
//! Chunks are cleaned as they are appended so that stop conditions always
//! see normalized text. Cleaning is incremental: only the bytes that could
//! have changed are revisited, so long outputs are not rescanned per chunk.

use std::borrow::Cow;

use bytes::BytesMut;

use super::filter::{contains_bel, strip_title_sequences};

/// Growing buffer for one read operation.
#[derive(Debug)]
pub struct ReadBuffer {
    /// Cleaned bytes accumulated so far.
    buffer: BytesMut,

    /// Collapse `\r+\n` into `\n` as chunks arrive.
    normalize_line_endings: bool,

    /// Cut terminal title sequences out of the buffer.
    strip_title_noise: bool,
}

impl ReadBuffer {
    /// Create an empty buffer with the given cleaning options.
    pub fn new(normalize_line_endings: bool, strip_title_noise: bool) -> Self {
        Self {
            buffer: BytesMut::with_capacity(4096),
            normalize_line_endings,
            strip_title_noise,
        }
    }

    /// Create a buffer that stores bytes exactly as received.
    pub fn raw() -> Self {
        Self::new(false, false)
    }

    /// Append a chunk, then clean the affected region.
    pub fn extend(&mut self, chunk: &[u8]) {
        let start = self.buffer.len();
        self.buffer.extend_from_slice(chunk);

        if self.normalize_line_endings {
            // A run of `\r` left at the old end may pair with a `\n` in this chunk.
            self.normalize_from(self.cr_run_start(start));
        }

        // A title sequence only becomes complete when its BEL arrives.
        if self.strip_title_noise && contains_bel(chunk) {
            if let Cow::Owned(cleaned) = strip_title_sequences(&self.buffer) {
                let first_cut = self
                    .buffer
                    .iter()
                    .zip(&cleaned)
                    .take_while(|(a, b)| a == b)
                    .count();
                self.buffer = BytesMut::from(&cleaned[..]);

                // Removing a sequence can bring a `\r` and a `\n` together.
                if self.normalize_line_endings {
                    self.normalize_from(self.cr_run_start(first_cut));
                }
            }
        }
    }

    /// Start of the run of `\r` bytes that ends at `pos`.
    fn cr_run_start(&self, pos: usize) -> usize {
        let run = self.buffer[..pos]
            .iter()
            .rev()
            .take_while(|&&b| b == b'\r')
            .count();
        pos - run
    }

    fn normalize_from(&mut self, from: usize) {
        if memchr::memchr(b'\r', &self.buffer[from..]).is_none() {
            return;
        }

        let tail = self.buffer.split_off(from);
        let mut rest = &tail[..];
        while let Some(pos) = memchr::memchr(b'\r', rest) {
            self.buffer.extend_from_slice(&rest[..pos]);
            let run = rest[pos..].iter().take_while(|&&b| b == b'\r').count();
            if rest.get(pos + run) != Some(&b'\n') {
                self.buffer.extend_from_slice(&rest[pos..pos + run]);
            }
            rest = &rest[pos + run..];
        }
        self.buffer.extend_from_slice(rest);
    }

    /// Get a reference to the buffer contents.
    pub fn as_slice(&self) -> &[u8] {
        &self.buffer
    }

    /// Get the current buffer length.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Check if the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Consume the buffer, converting to text (lossy UTF-8).
    pub fn into_string(self) -> String {
        String::from_utf8_lossy(&self.buffer).into_owned()
    }
}
