//! PTY channel abstraction for interactive sessions.

use std::future::Future;
use std::time::Duration;

use log::{debug, trace};
use regex::bytes::Regex;
use russh::client::Msg;
use russh::{Channel, ChannelMsg};
use tokio::time::{Instant, timeout, timeout_at};

use super::buffer::PatternBuffer;
use crate::error::ChannelError;

/// Bytes from the end of the output searched for a prompt.
pub const DEFAULT_SEARCH_DEPTH: usize = 1000;

/// Byte stream under a [`PtyChannel`].
pub trait ShellIo: Send {
    fn write(&mut self, data: &[u8]) -> impl Future<Output = Result<(), ChannelError>> + Send;

    /// Next chunk of output. `None` once the remote side has gone away.
    fn read(&mut self) -> impl Future<Output = Option<Vec<u8>>> + Send;

    fn shutdown(self) -> impl Future<Output = Result<(), ChannelError>> + Send;
}

impl ShellIo for Channel<Msg> {
    async fn write(&mut self, data: &[u8]) -> Result<(), ChannelError> {
        self.data(data).await.map_err(ChannelError::Ssh)
    }

    async fn read(&mut self) -> Option<Vec<u8>> {
        loop {
            match self.wait().await? {
                ChannelMsg::Data { data } => return Some(data.to_vec()),
                ChannelMsg::ExtendedData { data, .. } => return Some(data.to_vec()),
                ChannelMsg::Eof | ChannelMsg::Close => return None,
                other => trace!("Ignoring channel message: {:?}", other),
            }
        }
    }

    async fn shutdown(self) -> Result<(), ChannelError> {
        self.eof().await.map_err(ChannelError::Ssh)?;
        self.close().await.map_err(ChannelError::Ssh)
    }
}

/// Interactive shell channel with prompt-delimited reads.
pub struct PtyChannel<S = Channel<Msg>> {
    io: S,

    /// Pattern buffer for accumulating output.
    buffer: PatternBuffer,

    /// Set once the remote side has closed or a write has failed.
    closed: bool,
}

impl<S: ShellIo> PtyChannel<S> {
    pub fn new(io: S) -> Self {
        Self::with_search_depth(io, DEFAULT_SEARCH_DEPTH)
    }

    pub fn with_search_depth(io: S, search_depth: usize) -> Self {
        Self {
            io,
            buffer: PatternBuffer::new(search_depth),
            closed: false,
        }
    }

    /// Send one line of input. The input itself is never logged.
    pub async fn send(&mut self, input: &str) -> Result<(), ChannelError> {
        if self.closed {
            return Err(ChannelError::Closed);
        }
        let mut line = Vec::with_capacity(input.len() + 1);
        line.extend_from_slice(input.as_bytes());
        line.push(b'\n');

        if let Err(e) = self.io.write(&line).await {
            trace!("Channel write failed: {}", e);
            self.closed = true;
            return Err(ChannelError::Closed);
        }
        Ok(())
    }

    /// Read until `pattern` matches at the end of the output.
    ///
    /// Returns everything up to and including the match. Output received
    /// after the match stays buffered for the next read.
    pub async fn read_until(
        &mut self,
        pattern: &Regex,
        timeout: Duration,
    ) -> Result<Vec<u8>, ChannelError> {
        let deadline = Instant::now() + timeout;

        loop {
            if let Some(end) = self.buffer.prompt_end(pattern) {
                return Ok(self.buffer.take_through(end));
            }
            if self.closed {
                return Err(ChannelError::Closed);
            }

            match timeout_at(deadline, self.io.read()).await {
                Err(_) => return Err(ChannelError::PatternTimeout(timeout)),
                Ok(None) => self.closed = true,
                Ok(Some(data)) => self.buffer.extend(&data),
            }
        }
    }

    /// Get back in step with the device after an abandoned read.
    ///
    /// Output of a command that timed out keeps arriving after the read
    /// gave up, ending in a prompt that would otherwise terminate the next
    /// read. Sends an empty line and discards output until a prompt is
    /// followed by `quiet` of silence. Fails if that takes longer than
    /// `limit`.
    pub async fn resync(
        &mut self,
        pattern: &Regex,
        limit: Duration,
        quiet: Duration,
    ) -> Result<(), ChannelError> {
        let deadline = Instant::now() + limit;
        self.send("").await?;

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            let discarded = self
                .read_until(pattern, remaining)
                .await
                .map_err(|e| match e {
                    ChannelError::PatternTimeout(_) => ChannelError::PatternTimeout(limit),
                    other => other,
                })?;
            trace!("Resync discarded {} bytes", discarded.len());

            if !self.buffer.is_empty() {
                continue;
            }
            match timeout(quiet, self.io.read()).await {
                Err(_) => {
                    debug!("Channel back in sync");
                    return Ok(());
                }
                Ok(None) => {
                    self.closed = true;
                    return Err(ChannelError::Closed);
                }
                Ok(Some(data)) => self.buffer.extend(&data),
            }
        }
    }

    /// Discard anything buffered so far.
    pub fn clear(&mut self) {
        self.buffer.clear();
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Close the channel.
    pub async fn close(mut self) -> Result<(), ChannelError> {
        self.closed = true;
        self.io.shutdown().await
    }
}

#[cfg(test)]
mod tests {
    use std::collections::{HashMap, VecDeque};

    use super::*;

    /// Plays back queued output; written lines may queue a reply.
    #[derive(Default)]
    struct ScriptedShell {
        output: VecDeque<Vec<u8>>,
        replies: HashMap<Vec<u8>, Vec<Vec<u8>>>,
        written: Vec<Vec<u8>>,
    }

    impl ScriptedShell {
        fn reply(mut self, line: &str, chunks: &[&str]) -> Self {
            self.replies.insert(
                line.as_bytes().to_vec(),
                chunks.iter().map(|c| c.as_bytes().to_vec()).collect(),
            );
            self
        }
    }

    impl ShellIo for ScriptedShell {
        async fn write(&mut self, data: &[u8]) -> Result<(), ChannelError> {
            self.written.push(data.to_vec());
            if let Some(chunks) = self.replies.get(data) {
                self.output.extend(chunks.iter().cloned());
            }
            Ok(())
        }

        async fn read(&mut self) -> Option<Vec<u8>> {
            match self.output.pop_front() {
                Some(chunk) => Some(chunk),
                None => std::future::pending().await,
            }
        }

        async fn shutdown(self) -> Result<(), ChannelError> {
            Ok(())
        }
    }

    fn prompt() -> Regex {
        Regex::new(r"(?m)^router#\s?$").unwrap()
    }

    const QUIET: Duration = Duration::from_millis(20);

    #[tokio::test]
    async fn test_read_until_prompt() {
        let shell = ScriptedShell::default().reply(
            "show clock\n",
            &["show clock\r\n", "*10:15:01 UTC\r\nrouter#"],
        );
        let mut channel = PtyChannel::new(shell);

        channel.send("show clock").await.unwrap();
        let data = channel
            .read_until(&prompt(), Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(data, b"show clock\r\n*10:15:01 UTC\r\nrouter#");
    }

    #[tokio::test]
    async fn test_late_output_does_not_leak_into_next_command() {
        let shell = ScriptedShell::default()
            .reply("show tech\n", &["show tech\r\n---- show version ----\r\n"])
            .reply("show clock\n", &["show clock\r\n*10:15:01 UTC\r\nrouter#"]);
        let mut channel = PtyChannel::new(shell);
        let prompt = prompt();

        channel.send("show tech").await.unwrap();
        let err = channel
            .read_until(&prompt, Duration::from_millis(50))
            .await
            .unwrap_err();
        assert!(matches!(err, ChannelError::PatternTimeout(_)));

        // The rest of the slow command arrives after the read gave up
        channel
            .io
            .output
            .push_back(b"Cisco IOS XE Software, Version 17.3\r\nrouter#".to_vec());
        channel.io.replies.insert(b"\n".to_vec(), vec![b"\r\nrouter#".to_vec()]);

        channel
            .resync(&prompt, Duration::from_secs(1), QUIET)
            .await
            .unwrap();

        channel.send("show clock").await.unwrap();
        let data = channel
            .read_until(&prompt, Duration::from_secs(1))
            .await
            .unwrap();
        let text = String::from_utf8(data).unwrap();
        assert!(text.contains("10:15:01"));
        assert!(!text.contains("Cisco IOS XE"));
    }

    #[tokio::test]
    async fn test_resync_fails_while_output_keeps_coming() {
        // No prompt ever arrives: the slow command is still running
        let shell = ScriptedShell::default();
        let mut channel = PtyChannel::new(shell);

        let err = channel
            .resync(&prompt(), Duration::from_millis(50), QUIET)
            .await
            .unwrap_err();
        assert!(matches!(err, ChannelError::PatternTimeout(_)));
        assert_eq!(channel.io.written, vec![b"\n".to_vec()]);
    }

    #[tokio::test]
    async fn test_resync_reports_closed_channel() {
        struct ClosedShell;

        impl ShellIo for ClosedShell {
            async fn write(&mut self, _data: &[u8]) -> Result<(), ChannelError> {
                Ok(())
            }

            async fn read(&mut self) -> Option<Vec<u8>> {
                None
            }

            async fn shutdown(self) -> Result<(), ChannelError> {
                Ok(())
            }
        }

        let mut channel = PtyChannel::new(ClosedShell);
        let err = channel
            .resync(&prompt(), Duration::from_secs(1), QUIET)
            .await
            .unwrap_err();
        assert!(matches!(err, ChannelError::Closed));
        assert!(channel.is_closed());
    }
}
