//! Session capability traits.
//!
//! A [`SessionProvider`] turns a device descriptor into a live [`Session`].
//! The engine only talks to devices through these traits; the SSH
//! implementation lives in [`crate::transport`], and tests plug in fakes.

use std::future::Future;

use crate::config::{Credentials, DeviceDescriptor};
use crate::error::{ConnectError, SessionError};

/// A live command session on one device.
pub trait Session: Send {
    /// Send one command and return its output.
    fn run(&mut self, command: &str) -> impl Future<Output = Result<String, SessionError>> + Send;

    /// Send several commands in order and return their combined output.
    fn run_many(
        &mut self,
        commands: &[String],
    ) -> impl Future<Output = Result<String, SessionError>> + Send {
        async move {
            let mut output = String::new();
            for command in commands {
                let out = self.run(command).await?;
                if !output.is_empty() && !out.is_empty() {
                    output.push('\n');
                }
                output.push_str(&out);
            }
            Ok(output)
        }
    }

    /// Enter configuration mode.
    fn enter_config_mode(&mut self) -> impl Future<Output = Result<String, SessionError>> + Send;

    /// Leave configuration mode.
    fn exit_config_mode(&mut self) -> impl Future<Output = Result<String, SessionError>> + Send;

    /// Raise the session to privileged mode.
    fn enable(&mut self) -> impl Future<Output = Result<(), SessionError>> + Send;

    /// Close the session.
    ///
    /// Consumes the session, so it cannot be closed twice.
    fn close(self) -> impl Future<Output = Result<(), SessionError>> + Send;
}

/// Opens sessions to devices.
pub trait SessionProvider: Send + Sync {
    /// Session type produced by this provider.
    type Session: Session;

    /// Open and authenticate a session to `device`.
    fn open(
        &self,
        device: &DeviceDescriptor,
        credentials: &Credentials,
    ) -> impl Future<Output = Result<Self::Session, ConnectError>> + Send;
}
