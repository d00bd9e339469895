//! SSH transport layer wrapping russh.
//!
//! Connection bootstrapping only: connect, authenticate, and open a shell
//! with a PTY. The resulting byte stream is handed to a [`Session`].
//!
//! [`Session`]: crate::session::Session

pub mod config;
mod ssh;

pub use config::{AuthMethod, HostKeyVerification, SshConfig, TerminalConfig};
pub use ssh::{ShellStream, SshTransport};
