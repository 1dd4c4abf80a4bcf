//! SSH transport implementation using russh.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use log::{debug, warn};
use russh::Channel;
use russh::client::{self, Handle, Msg};
use russh::keys::PublicKey;
use secrecy::ExposeSecret;

use super::config::{AuthMethod, HostKeyVerification, SshConfig};
use crate::error::{ConnectError, SessionError};

/// Authenticated SSH connection to one device.
pub struct SshTransport {
    /// The russh session handle.
    session: Handle<SshHandler>,

    /// Configuration used for this connection.
    config: SshConfig,
}

impl SshTransport {
    /// Connect to the SSH server and authenticate.
    pub async fn connect(config: SshConfig) -> Result<Self, ConnectError> {
        let ssh_config = Arc::new(client::Config {
            inactivity_timeout: None,
            ..Default::default()
        });

        let host_key_error: Arc<Mutex<Option<String>>> = Arc::new(Mutex::new(None));

        let handler = SshHandler {
            host: config.host.clone(),
            port: config.port,
            host_key_verification: config.host_key_verification.clone(),
            known_hosts_path: config.known_hosts_path.clone(),
            host_key_error: host_key_error.clone(),
        };

        debug!("ssh: connecting to {}", config.socket_addr());

        let mut session = tokio::time::timeout(
            config.timeout,
            client::connect(ssh_config, (config.host.as_str(), config.port), handler),
        )
        .await
        .map_err(|_| ConnectError::Timeout(config.timeout))?
        .map_err(|e| {
            // Prefer the detailed host-key message over russh's generic UnknownKey
            match host_key_error.lock().ok().and_then(|mut slot| slot.take()) {
                Some(message) => ConnectError::Other(message),
                None => ConnectError::Other(format!("ssh connect to {} failed: {e}", config.socket_addr())),
            }
        })?;

        tokio::time::timeout(config.timeout, Self::authenticate(&mut session, &config))
            .await
            .map_err(|_| ConnectError::Timeout(config.timeout))??;

        Ok(Self { session, config })
    }

    /// Open an interactive PTY shell channel on this connection.
    pub async fn open_shell(&self) -> Result<Channel<Msg>, SessionError> {
        let channel = self
            .session
            .channel_open_session()
            .await
            .map_err(|e| SessionError::Transport(e.to_string()))?;

        channel
            .request_pty(
                true,
                "xterm",
                self.config.terminal_width,
                self.config.terminal_height,
                0,
                0,
                &[],
            )
            .await
            .map_err(|e| SessionError::Transport(e.to_string()))?;

        channel
            .request_shell(true)
            .await
            .map_err(|e| SessionError::Transport(e.to_string()))?;

        Ok(channel)
    }

    /// Authenticate with the server.
    async fn authenticate(
        session: &mut Handle<SshHandler>,
        config: &SshConfig,
    ) -> Result<(), ConnectError> {
        let result = match &config.auth {
            AuthMethod::None => session.authenticate_none(&config.username).await,
            AuthMethod::Password(password) => {
                session
                    .authenticate_password(&config.username, password.expose_secret())
                    .await
            }
        }
        .map_err(|e| ConnectError::Other(format!("ssh authentication error: {e}")))?;

        if !result.success() {
            return Err(ConnectError::AuthFailed {
                user: config.username.clone(),
            });
        }

        Ok(())
    }

    /// The configuration this transport was opened with.
    pub fn config(&self) -> &SshConfig {
        &self.config
    }

    /// Disconnect.
    pub async fn close(self) -> Result<(), SessionError> {
        self.session
            .disconnect(russh::Disconnect::ByApplication, "", "en")
            .await
            .map_err(|e| SessionError::Transport(e.to_string()))
    }
}

/// SSH client handler for russh.
struct SshHandler {
    host: String,
    port: u16,
    host_key_verification: HostKeyVerification,
    known_hosts_path: Option<PathBuf>,
    /// Detailed host-key failure surfaced by `connect()`.
    host_key_error: Arc<Mutex<Option<String>>>,
}

impl SshHandler {
    /// `Ok(true)` if known and matching, `Ok(false)` if unknown, `Err` if changed.
    fn check_known_hosts(&self, pubkey: &PublicKey) -> Result<bool, String> {
        let result = match &self.known_hosts_path {
            Some(path) => russh::keys::check_known_hosts_path(&self.host, self.port, pubkey, path),
            None => russh::keys::check_known_hosts(&self.host, self.port, pubkey),
        };

        match result {
            Ok(matched) => Ok(matched),
            Err(russh::keys::Error::KeyChanged { line }) => Err(format!(
                "host key for {}:{} changed (known_hosts line {line})",
                self.host, self.port
            )),
            Err(e) => Err(format!("known_hosts error: {e}")),
        }
    }

    fn learn_host_key(&self, pubkey: &PublicKey) {
        let result = match &self.known_hosts_path {
            Some(path) => {
                russh::keys::known_hosts::learn_known_hosts_path(&self.host, self.port, pubkey, path)
            }
            None => russh::keys::known_hosts::learn_known_hosts(&self.host, self.port, pubkey),
        };
        if let Err(e) = result {
            warn!("Failed to save host key for {}:{}: {}", self.host, self.port, e);
        }
    }

    fn reject(&self, message: String) -> bool {
        if let Ok(mut slot) = self.host_key_error.lock() {
            *slot = Some(message);
        }
        false
    }
}

impl client::Handler for SshHandler {
    type Error = russh::Error;

    async fn check_server_key(&mut self, server_public_key: &PublicKey) -> Result<bool, Self::Error> {
        let accepted = match self.host_key_verification {
            HostKeyVerification::Disabled => true,
            HostKeyVerification::AcceptNew => match self.check_known_hosts(server_public_key) {
                Ok(true) => true,
                Ok(false) => {
                    self.learn_host_key(server_public_key);
                    true
                }
                Err(message) => self.reject(message),
            },
            HostKeyVerification::Strict => match self.check_known_hosts(server_public_key) {
                Ok(true) => true,
                Ok(false) => self.reject(format!(
                    "host key for {}:{} is not in known_hosts",
                    self.host, self.port
                )),
                Err(message) => self.reject(message),
            },
        };
        Ok(accepted)
    }
}
