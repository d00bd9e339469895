//! Builder for SSH-backed sessions.

use std::path::PathBuf;
use std::time::Duration;

use log::debug;
use secrecy::SecretString;

use super::shell::{Session, SessionOptions};
use crate::error::{Result, SessionError};
use crate::transport::{
    AuthMethod, HostKeyVerification, ShellStream, SshConfig, SshTransport, TerminalConfig,
};

/// Builder that connects over SSH and opens a shell session.
///
/// # Example
///
/// ```rust,no_run
/// use shellsync::SessionBuilder;
///
/// # async fn example() -> Result<(), shellsync::Error> {
/// let mut session = SessionBuilder::new("192.168.1.1")
///     .username("admin")
///     .password("secret")
///     .connect()
///     .await?;
///
/// let response = session.send_command("hostname").await?;
/// println!("{}", response.result);
/// session.close().await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct SessionBuilder {
    host: String,
    port: u16,
    username: Option<String>,
    auth: AuthMethod,
    timeout: Duration,
    host_key_verification: HostKeyVerification,
    known_hosts_path: Option<PathBuf>,
    terminal: TerminalConfig,
    options: SessionOptions,
}

impl SessionBuilder {
    /// Create a new session builder for the specified host.
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: 22,
            username: None,
            auth: AuthMethod::None,
            timeout: Duration::from_secs(30),
            host_key_verification: HostKeyVerification::default(),
            known_hosts_path: None,
            terminal: TerminalConfig::default(),
            options: SessionOptions::default(),
        }
    }

    /// Set the SSH port (default: 22).
    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the username for authentication.
    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    /// Set password authentication.
    pub fn password(mut self, password: impl Into<String>) -> Self {
        let password: String = password.into();
        self.auth = AuthMethod::Password(SecretString::from(password));
        self
    }

    /// Set private key authentication.
    pub fn private_key(mut self, key_path: impl Into<PathBuf>) -> Self {
        self.auth = AuthMethod::PrivateKey {
            path: key_path.into(),
            passphrase: None,
        };
        self
    }

    /// Set private key authentication with passphrase.
    pub fn private_key_with_passphrase(
        mut self,
        key_path: impl Into<PathBuf>,
        passphrase: impl Into<String>,
    ) -> Self {
        let passphrase: String = passphrase.into();
        self.auth = AuthMethod::PrivateKey {
            path: key_path.into(),
            passphrase: Some(SecretString::from(passphrase)),
        };
        self
    }

    /// Set the connection timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the host key verification mode.
    pub fn host_key_verification(mut self, mode: HostKeyVerification) -> Self {
        self.host_key_verification = mode;
        self
    }

    /// Use a known_hosts file other than `~/.ssh/known_hosts`.
    pub fn known_hosts_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.known_hosts_path = Some(path.into());
        self
    }

    /// Replace all terminal parameters.
    pub fn terminal(mut self, terminal: TerminalConfig) -> Self {
        self.terminal = terminal;
        self
    }

    /// Set the terminal type sent as `TERM`.
    pub fn term(mut self, term: impl Into<String>) -> Self {
        self.terminal.term = term.into();
        self
    }

    /// Set terminal dimensions.
    pub fn terminal_size(mut self, columns: u32, rows: u32) -> Self {
        self.terminal.columns = columns;
        self.terminal.rows = rows;
        self
    }

    /// Request an environment variable for the shell.
    pub fn env(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.terminal.env.insert(name.into(), value.into());
        self
    }

    /// Replace all session options.
    pub fn options(mut self, options: SessionOptions) -> Self {
        self.options = options;
        self
    }

    /// Set the default silence window for smart commands (`None` waits forever).
    pub fn command_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.options.timeout = timeout;
        self
    }

    /// Enable or disable terminal title stripping (default: enabled).
    pub fn strip_title_noise(mut self, enabled: bool) -> Self {
        self.options.strip_title_noise = enabled;
        self
    }

    fn into_parts(self) -> Result<(SshConfig, TerminalConfig, SessionOptions)> {
        let username = self.username.ok_or_else(|| SessionError::InvalidConfig {
            message: "Username is required".to_string(),
        })?;

        if self.terminal.columns == 0 || self.terminal.rows == 0 {
            return Err(SessionError::InvalidConfig {
                message: "Terminal size must be non-zero".to_string(),
            }
            .into());
        }

        let ssh_config = SshConfig {
            host: self.host,
            port: self.port,
            username,
            auth: self.auth,
            timeout: self.timeout,
            host_key_verification: self.host_key_verification,
            known_hosts_path: self.known_hosts_path,
        };

        Ok((ssh_config, self.terminal, self.options))
    }

    /// Connect, authenticate, and open an interactive shell.
    pub async fn connect(self) -> Result<Session<ShellStream>> {
        let (ssh_config, terminal, options) = self.into_parts()?;
        let transport = SshTransport::connect(ssh_config).await?;
        let stream = transport.open_shell(&terminal).await?;
        debug!("session ready");
        Ok(Session::with_options(stream, options).with_transport(transport))
    }
}
