//! Session layer: the smart-console protocol.
//!
//! A [`Session`] wraps the read engine with shell awareness: it detects the
//! shell dialect, installs a unique prompt marker, and uses the marker to
//! find where each command's output ends.

mod builder;
mod dialect;
mod marker;
mod response;
mod shell;
mod smart;

pub use builder::SessionBuilder;
pub use dialect::ShellDialect;
pub use marker::{MARKER_PREFIX, MARKER_SUFFIX, SmartMarker};
pub use response::Response;
pub use shell::{Session, SessionOptions};
