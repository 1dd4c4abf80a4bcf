//! Channel layer: prompt detection over an interactive PTY shell.

mod buffer;
mod pty;

pub use buffer::PatternBuffer;
pub use pty::PtyChannel;
