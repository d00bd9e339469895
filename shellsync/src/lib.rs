//! # Shellsync
//!
//! Expect-style command/response sessions over an interactive SSH shell.
//!
//! A PTY shell is just an untimed byte stream: nothing says where one
//! command's output ends. Shellsync recovers those boundaries with
//! timeout-bounded read strategies and a "smart console" that installs a
//! unique marker as the shell prompt.
//!
//! ## Features
//!
//! - Async SSH connections via russh
//! - Reads bounded by byte count, substring, tail marker, regex, or silence
//! - Timeout windows re-armed on every chunk, so slow output is not cut off
//! - Bourne and C-shell dialect detection for prompt setup
//! - Removal of terminal title sequences that leak into output
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use shellsync::SessionBuilder;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), shellsync::Error> {
//!     let mut session = SessionBuilder::new("192.168.1.1")
//!         .username("admin")
//!         .password("secret")
//!         .connect()
//!         .await?;
//!
//!     let response = session.send_command("uname -a").await?;
//!     println!("{}", response.result);
//!
//!     session.close().await?;
//!     Ok(())
//! }
//! ```

pub mod channel;
pub mod error;
pub mod session;
pub mod transport;

#[cfg(test)]
mod testing;

// Re-export main types for convenience
pub use channel::{PtyChannel, ReadResult};
pub use error::Error;
pub use session::{Response, Session, SessionBuilder, SessionOptions, ShellDialect, SmartMarker};
pub use transport::{AuthMethod, SshConfig, TerminalConfig};
