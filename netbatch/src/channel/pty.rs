//! Interactive PTY channel: write lines, read until a pattern appears.

use std::time::Duration;

use log::trace;
use regex::bytes::Regex;
use russh::client::Msg;
use russh::{Channel, ChannelMsg};

use super::buffer::PatternBuffer;
use crate::error::SessionError;

/// Interactive shell channel on an SSH connection.
pub struct PtyChannel {
    channel: Channel<Msg>,
    buffer: PatternBuffer,
}

impl PtyChannel {
    /// Wrap an open shell channel.
    pub fn new(channel: Channel<Msg>, search_depth: usize) -> Self {
        Self {
            channel,
            buffer: PatternBuffer::new(search_depth),
        }
    }

    /// Send one line of input.
    pub async fn send_line(&mut self, line: &str) -> Result<(), SessionError> {
        let data = format!("{line}\n");
        self.channel
            .data(data.as_bytes())
            .await
            .map_err(|e| SessionError::Transport(e.to_string()))
    }

    /// Read until one of `patterns` matches the end of the output.
    ///
    /// Returns the index of the matching pattern and everything read since
    /// the previous call.
    pub async fn read_until(
        &mut self,
        patterns: &[&Regex],
        timeout: Duration,
    ) -> Result<(usize, String), SessionError> {
        let deadline = tokio::time::Instant::now() + timeout;

        loop {
            if let Some(index) = patterns
                .iter()
                .position(|pattern| self.buffer.search_tail(pattern).is_some())
            {
                return Ok((index, self.buffer.take_string()));
            }

            let msg = tokio::time::timeout_at(deadline, self.channel.wait())
                .await
                .map_err(|_| SessionError::Timeout(timeout))?;

            match msg {
                Some(ChannelMsg::Data { data }) => self.buffer.extend(&data[..]),
                Some(ChannelMsg::ExtendedData { data, .. }) => self.buffer.extend(&data[..]),
                Some(ChannelMsg::Eof) | Some(ChannelMsg::Close) | None => {
                    return Err(SessionError::Closed);
                }
                Some(other) => trace!("pty: ignoring channel message {:?}", other),
            }
        }
    }

    /// Signal end of input to the remote shell.
    pub async fn close(self) -> Result<(), SessionError> {
        self.channel
            .eof()
            .await
            .map_err(|e| SessionError::Transport(e.to_string()))
    }
}
