//! SSH transport layer wrapping russh.
//!
//! Provides the production [`SessionProvider`](crate::session::SessionProvider):
//! connection setup, authentication, an interactive PTY shell, and prompt
//! driven command execution using each vendor's command table.

pub mod config;
mod session;
mod ssh;

pub use config::{AuthMethod, HostKeyVerification, SshConfig};
pub use session::{SshSession, SshSessionProvider, normalize_output};
pub use ssh::SshTransport;
