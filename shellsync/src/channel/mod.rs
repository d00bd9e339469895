//! Channel layer: the read-synchronization engine.
//!
//! This module turns an untimed byte stream into bounded reads: fixed byte
//! counts, substring and tail markers, regex matches, and quiescence.
//! Output is cleaned (line endings, terminal title noise) before every stop
//! check.

mod buffer;
mod filter;
mod patterns;
mod pty;

pub use buffer::ReadBuffer;
pub use filter::strip_title_sequences;
pub use patterns::{StopCondition, Substring, TailMarker};
pub use pty::{PtyChannel, ReadResult, wait_from_secs};
