//! PTY channel for interactive device sessions.

use std::time::Duration;

use log::trace;
use regex::bytes::Regex;
use russh::client::Msg;
use russh::{Channel, ChannelMsg};

use super::buffer::PatternBuffer;
use crate::error::{ChannelError, Result};

/// Default number of tail bytes searched for a prompt.
pub const DEFAULT_SEARCH_DEPTH: usize = 1000;

/// Interactive shell channel with pattern-based reads.
///
/// Every read is bounded by a timeout; nothing here waits forever on a
/// device that stops talking.
pub struct PtyChannel {
    channel: Channel<Msg>,

    /// Pattern buffer for accumulating output.
    buffer: PatternBuffer,

    /// Cleared when the remote end sends EOF or close.
    is_open: bool,
}

impl PtyChannel {
    /// Wrap an opened shell channel.
    pub fn new(channel: Channel<Msg>, search_depth: usize) -> Self {
        Self {
            channel,
            buffer: PatternBuffer::new(search_depth),
            is_open: true,
        }
    }

    /// Check if the channel is open.
    pub fn is_open(&self) -> bool {
        self.is_open
    }

    /// Send a line of input followed by a newline.
    ///
    /// Any unread output is discarded first so the next read only sees the
    /// response to this line.
    pub async fn send_line(&mut self, input: &str) -> Result<()> {
        if !self.is_open {
            return Err(ChannelError::Closed.into());
        }
        self.buffer.clear();
        let mut line = Vec::with_capacity(input.len() + 1);
        line.extend_from_slice(input.as_bytes());
        line.push(b'\n');
        self.channel
            .data(&line[..])
            .await
            .map_err(ChannelError::Ssh)?;
        Ok(())
    }

    /// Read until `pattern` matches the tail of the output.
    ///
    /// Returns the accumulated output and the offset where the match starts.
    pub async fn read_until(&mut self, pattern: &Regex, timeout: Duration) -> Result<(Vec<u8>, usize)> {
        let deadline = deadline_after(timeout);

        loop {
            if let Some(start) = self.buffer.find_tail(pattern) {
                return Ok((self.buffer.take(), start));
            }

            if !self.is_open {
                return Err(ChannelError::Closed.into());
            }

            let msg = tokio::time::timeout_at(deadline, self.channel.wait())
                .await
                .map_err(|_| ChannelError::PatternTimeout(timeout))?;

            match msg {
                Some(ChannelMsg::Data { ref data }) => {
                    trace!("read {} bytes", data.len());
                    self.buffer.extend(data);
                }
                Some(ChannelMsg::ExtendedData { ref data, .. }) => self.buffer.extend(data),
                Some(ChannelMsg::Eof) | Some(ChannelMsg::Close) | None => self.is_open = false,
                Some(_) => {}
            }
        }
    }

    /// Close the channel. Errors are ignored since the session is going away.
    pub async fn close(&mut self) {
        if self.is_open {
            let _ = self.channel.eof().await;
            let _ = self.channel.close().await;
            self.is_open = false;
        }
    }
}

/// Deadline `timeout` from now, clamped for timeouts too large to represent.
fn deadline_after(timeout: Duration) -> tokio::time::Instant {
    let now = tokio::time::Instant::now();
    now.checked_add(timeout)
        .unwrap_or_else(|| now + Duration::from_secs(86400 * 365 * 30))
}
