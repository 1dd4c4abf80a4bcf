//! SSH connection configuration.

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;

use crate::config::{Credentials, DeviceDescriptor};

/// Host key verification mode, analogous to OpenSSH's `StrictHostKeyChecking`.
#[derive(Debug, Clone, Default)]
pub enum HostKeyVerification {
    /// Reject unknown and changed keys.
    Strict,

    /// Accept and remember unknown keys, reject changed keys.
    #[default]
    AcceptNew,

    /// Accept all keys without checking. For lab use only.
    Disabled,
}

/// Authentication method for SSH connections.
#[derive(Debug, Clone)]
pub enum AuthMethod {
    /// No authentication.
    None,

    /// Password authentication.
    Password(SecretString),
}

/// SSH connection configuration for one device.
#[derive(Debug, Clone)]
pub struct SshConfig {
    /// Target host (hostname or IP address).
    pub host: String,

    /// SSH port.
    pub port: u16,

    /// Username for authentication.
    pub username: String,

    /// Authentication method.
    pub auth: AuthMethod,

    /// Connection timeout.
    pub timeout: Duration,

    /// Terminal width for the PTY.
    pub terminal_width: u32,

    /// Terminal height for the PTY.
    pub terminal_height: u32,

    /// Host key verification mode.
    pub host_key_verification: HostKeyVerification,

    /// Path to known_hosts file (`~/.ssh/known_hosts` when unset).
    pub known_hosts_path: Option<PathBuf>,
}

impl SshConfig {
    /// Build the configuration for a device with resolved credentials.
    pub fn for_device(device: &DeviceDescriptor, credentials: &Credentials, timeout: Duration) -> Self {
        let auth = match &credentials.password {
            Some(password) => AuthMethod::Password(password.clone()),
            None => AuthMethod::None,
        };
        Self {
            host: device.address.clone(),
            port: device.port,
            username: credentials.username.clone(),
            auth,
            timeout,
            terminal_width: 511,
            terminal_height: 24,
            host_key_verification: HostKeyVerification::default(),
            known_hosts_path: None,
        }
    }

    /// Get the socket address for connection.
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_for_device() {
        let device = DeviceDescriptor::new("sw1", "10.1.1.1").with_port(2222);
        let config = SshConfig::for_device(
            &device,
            &Credentials::new("admin", "pw"),
            Duration::from_secs(5),
        );
        assert_eq!(config.socket_addr(), "10.1.1.1:2222");
        assert_eq!(config.username, "admin");
        assert!(matches!(config.auth, AuthMethod::Password(_)));

        let config = SshConfig::for_device(&device, &Credentials::default(), Duration::from_secs(5));
        assert!(matches!(config.auth, AuthMethod::None));
    }
}
