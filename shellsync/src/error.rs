//! Error types for shellsync.

use std::io;
use thiserror::Error;

/// Main error type for shellsync operations.
#[derive(Error, Debug)]
pub enum Error {
    /// SSH transport-level errors
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Stream and read-synchronization errors
    #[error("Channel error: {0}")]
    Channel(#[from] ChannelError),

    /// Session-level errors
    #[error("Session error: {0}")]
    Session(#[from] SessionError),
}

/// Transport layer errors (SSH connection, authentication, PTY setup).
#[derive(Error, Debug)]
pub enum TransportError {
    /// Failed to connect to host
    #[error("Connection failed to {host}:{port}: {source}")]
    ConnectionFailed {
        host: String,
        port: u16,
        #[source]
        source: io::Error,
    },

    /// SSH handshake or protocol error
    #[error("SSH error: {0}")]
    Ssh(#[from] russh::Error),

    /// Authentication failed
    #[error("Authentication failed for user '{user}'")]
    AuthenticationFailed { user: String },

    /// A shell was requested on a connection that is no longer open
    #[error("Transport not connected")]
    NotConnected,

    /// A shell was requested before authentication succeeded
    #[error("Transport not authenticated - call authenticate() first")]
    NotAuthenticated,

    /// SSH key error
    #[error("SSH key error: {0}")]
    Key(String),

    /// Host key did not match the one recorded in known_hosts
    #[error("Host key for {host}:{port} changed (known_hosts line {line})")]
    HostKeyChanged { host: String, port: u16, line: usize },

    /// Host is not in known_hosts and strict checking is enabled
    #[error("Host key for {host}:{port} is not known")]
    HostKeyUnknown { host: String, port: u16 },

    /// known_hosts could not be read or written
    #[error("known_hosts error: {0}")]
    KnownHosts(String),

    /// Failed to open the session channel
    #[error("Failed to open PTY channel: {0}")]
    PtyOpenFailed(String),

    /// Operation timed out
    #[error("Operation timed out after {0:?}")]
    Timeout(std::time::Duration),
}

/// Errors raised while reading from or writing to the duplex stream.
///
/// A timeout is never an error here: read strategies return whatever was
/// accumulated. These variants mean the stream itself failed.
#[derive(Error, Debug)]
pub enum ChannelError {
    /// The remote side closed the stream (EOF)
    #[error("Channel closed")]
    Closed,

    /// Read or write on the stream failed
    #[error("Stream I/O error: {0}")]
    Io(#[from] io::Error),

    /// Invalid regex pattern
    #[error("Invalid regex pattern: {0}")]
    InvalidPattern(#[from] regex::Error),
}

/// Session layer errors.
#[derive(Error, Debug)]
pub enum SessionError {
    /// Invalid configuration in the session builder
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    /// A smart marker must be non-empty
    #[error("Smart marker must not be empty")]
    EmptyMarker,

    /// Character has no control-key equivalent
    #[error("No control code for key {0:?}")]
    InvalidControlKey(char),
}

/// Result type alias using shellsync's Error.
pub type Result<T> = std::result::Result<T, Error>;
