//! SSH-backed [`Session`] and [`SessionProvider`].

use std::path::PathBuf;
use std::time::Duration;

use log::{debug, warn};
use secrecy::{ExposeSecret, SecretString};

use super::config::{HostKeyVerification, SshConfig};
use super::ssh::SshTransport;
use crate::channel::PtyChannel;
use crate::config::{Credentials, DeviceDescriptor};
use crate::error::{ConnectError, SessionError};
use crate::platform::{PlatformDefinition, PromptPatterns};
use crate::session::{Session, SessionProvider};

/// Most `[Y/N]` questions answered for a single command.
const MAX_CONFIRMATIONS: usize = 3;

/// Opens SSH CLI sessions using each device's vendor command table.
#[derive(Debug, Clone)]
pub struct SshSessionProvider {
    connect_timeout: Duration,
    command_timeout: Duration,
    host_key_verification: HostKeyVerification,
    known_hosts_path: Option<PathBuf>,
}

impl SshSessionProvider {
    /// Create a provider with the given per-attempt connect timeout.
    pub fn new(connect_timeout: Duration) -> Self {
        Self {
            connect_timeout,
            command_timeout: Duration::from_secs(60),
            host_key_verification: HostKeyVerification::default(),
            known_hosts_path: None,
        }
    }

    /// Set how long a single command may take to return a prompt.
    pub fn command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = timeout;
        self
    }

    /// Set host key verification mode.
    pub fn host_key_verification(mut self, mode: HostKeyVerification) -> Self {
        self.host_key_verification = mode;
        self
    }

    /// Use a specific known_hosts file.
    pub fn known_hosts_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.known_hosts_path = Some(path.into());
        self
    }
}

impl SessionProvider for SshSessionProvider {
    type Session = SshSession;

    async fn open(
        &self,
        device: &DeviceDescriptor,
        credentials: &Credentials,
    ) -> Result<SshSession, ConnectError> {
        // A broken pattern table fails every attempt the same way.
        let patterns = device.vendor.patterns().map_err(ConnectError::Other)?;

        let mut config = SshConfig::for_device(device, credentials, self.connect_timeout);
        config.host_key_verification = self.host_key_verification.clone();
        config.known_hosts_path = self.known_hosts_path.clone();

        let transport = SshTransport::connect(config).await?;

        let channel = match transport.open_shell().await {
            Ok(channel) => PtyChannel::new(channel, 1000),
            Err(e) => {
                if let Err(close_err) = transport.close().await {
                    debug!("{}: close after failed shell open: {}", device.name, close_err);
                }
                return Err(ConnectError::Other(e.to_string()));
            }
        };

        let mut session = SshSession::new(transport, channel, device, patterns, self.command_timeout);

        if let Err(e) = session.initialize(self.connect_timeout).await {
            if let Err(close_err) = session.close().await {
                debug!("{}: close after failed session setup: {}", device.name, close_err);
            }
            return Err(match e {
                SessionError::Timeout(d) => ConnectError::Timeout(d),
                other => ConnectError::Other(other.to_string()),
            });
        }

        Ok(session)
    }
}

/// Live CLI session on one device.
pub struct SshSession {
    transport: SshTransport,
    channel: PtyChannel,
    platform: &'static PlatformDefinition,
    patterns: &'static PromptPatterns,
    secret: Option<SecretString>,
    timeout: Duration,
    device: String,
}

impl SshSession {
    fn new(
        transport: SshTransport,
        channel: PtyChannel,
        device: &DeviceDescriptor,
        patterns: &'static PromptPatterns,
        timeout: Duration,
    ) -> Self {
        Self {
            transport,
            channel,
            platform: device.vendor.platform(),
            patterns,
            secret: device.secret.clone(),
            timeout,
            device: device.name.clone(),
        }
    }

    /// Wait for the login prompt, then run the platform's on-open commands.
    async fn initialize(&mut self, timeout: Duration) -> Result<(), SessionError> {
        self.channel.read_until(&[&self.patterns.prompt], timeout).await?;
        for command in self.platform.on_open_commands {
            self.run(command).await?;
        }
        debug!("{}: session ready ({})", self.device, self.platform.name);
        Ok(())
    }

    /// Read until the prompt, answering confirmation questions on the way.
    async fn read_response(&mut self) -> Result<String, SessionError> {
        let mut raw = String::new();
        let mut confirmations = 0;

        loop {
            let prompt = &self.patterns.prompt;
            let (index, text) = match &self.patterns.confirm {
                Some(confirm) => self.channel.read_until(&[prompt, confirm], self.timeout).await?,
                None => self.channel.read_until(&[prompt], self.timeout).await?,
            };
            raw.push_str(&text);

            if index == 0 {
                return Ok(raw);
            }

            confirmations += 1;
            if confirmations > MAX_CONFIRMATIONS {
                return Err(SessionError::CommandFailed {
                    command: String::new(),
                    message: "device kept asking for confirmation".to_string(),
                });
            }
            debug!("{}: answering confirmation prompt", self.device);
            self.channel.send_line(self.platform.confirm_answer).await?;
        }
    }

    fn check_failure(&self, command: &str, output: &str) -> Result<(), SessionError> {
        let failed = self
            .platform
            .failed_when_contains
            .iter()
            .find(|pattern| output.contains(*pattern));

        match failed {
            Some(pattern) => {
                let message = output
                    .lines()
                    .find(|line| line.contains(*pattern))
                    .unwrap_or(*pattern)
                    .trim()
                    .to_string();
                Err(SessionError::CommandFailed {
                    command: command.to_string(),
                    message,
                })
            }
            None => Ok(()),
        }
    }
}

impl Session for SshSession {
    async fn run(&mut self, command: &str) -> Result<String, SessionError> {
        self.channel.send_line(command).await?;
        let raw = self.read_response().await?;
        let output = normalize_output(&raw, command);
        self.check_failure(command, &output)?;
        Ok(output)
    }

    async fn enter_config_mode(&mut self) -> Result<String, SessionError> {
        self.run(self.platform.config_enter).await
    }

    async fn exit_config_mode(&mut self) -> Result<String, SessionError> {
        self.run(self.platform.config_exit).await
    }

    async fn enable(&mut self) -> Result<(), SessionError> {
        let Some(secret) = self.secret.clone() else {
            return Ok(());
        };

        self.channel.send_line(self.platform.enable_command).await?;
        let (index, _) = self
            .channel
            .read_until(&[&self.patterns.enable_password, &self.patterns.prompt], self.timeout)
            .await?;
        if index == 1 {
            // Already privileged; no password was asked for
            return Ok(());
        }

        self.channel.send_line(secret.expose_secret()).await?;
        let (index, text) = self
            .channel
            .read_until(&[&self.patterns.enable_password, &self.patterns.prompt], self.timeout)
            .await?;
        if index == 0 {
            return Err(SessionError::Privilege("enable secret rejected".to_string()));
        }

        let lowered = text.to_ascii_lowercase();
        if ["denied", "bad secret", "error", "fail"]
            .iter()
            .any(|marker| lowered.contains(marker))
        {
            return Err(SessionError::Privilege(normalize_output(&text, "")));
        }

        debug!("{}: privilege escalation complete", self.device);
        Ok(())
    }

    async fn close(self) -> Result<(), SessionError> {
        if let Err(e) = self.channel.close().await {
            warn!("{}: failed to close shell channel: {}", self.device, e);
        }
        self.transport.close().await
    }
}

/// Strip the command echo and the trailing prompt line from raw output.
pub fn normalize_output(raw: &str, command: &str) -> String {
    let text = raw.replace("\r\n", "\n").replace('\r', "");
    let trimmed = text.trim_start_matches('\n');

    let body = match trimmed.strip_prefix(command) {
        Some(rest) if !command.is_empty() => rest.trim_start_matches('\n'),
        _ => trimmed,
    };

    match memchr::memrchr(b'\n', body.as_bytes()) {
        Some(pos) => body[..pos].trim_end().to_string(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_strips_echo_and_prompt() {
        let raw = "display cpu-usage\r\nCPU Usage            : 8% Max: 43%\r\n<SW1>";
        assert_eq!(
            normalize_output(raw, "display cpu-usage"),
            "CPU Usage            : 8% Max: 43%"
        );
    }

    #[test]
    fn test_normalize_prompt_only() {
        assert_eq!(normalize_output("system-view\r\n[SW1]", "system-view"), "");
        assert_eq!(normalize_output("[SW1]", "x"), "");
    }

    #[test]
    fn test_normalize_multiline() {
        let raw = "show vlan brief\nVLAN Name\n1    default\n10   users\nrouter#";
        assert_eq!(
            normalize_output(raw, "show vlan brief"),
            "VLAN Name\n1    default\n10   users"
        );
    }
}
