//! Ephemeral command channels and the interactive command loop
//!
//! Every command runs on its own short-lived channel: open, exec, drain
//! output to the operator, wait for the remote's end-of-stream, then wait
//! for the close acknowledgment. Skipping either wait risks losing buffered
//! output or leaking the channel, so both are explicit steps here.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use russh::client::Msg;
use russh::{Channel, ChannelMsg};
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

use super::ShellError;

/// Operator input that ends the interactive loop without opening a channel
const EXIT_SENTINEL: &str = "exit";

/// Per-command channel failures.
///
/// Any of these tears down the whole session, not just the command.
#[derive(Error, Debug)]
pub enum ChannelError {
    #[error("failed to open channel: {0}")]
    Open(russh::Error),

    #[error("failed to execute command: {0}")]
    Exec(russh::Error),

    #[error("command rejected by remote")]
    Rejected,

    #[error("channel closed before end of stream")]
    UnexpectedEof,

    #[error("failed to close channel: {0}")]
    Close(russh::Error),

    #[error("channel released without close acknowledgment")]
    MissingCloseAck,
}

/// One ephemeral command-execution stream
#[async_trait]
pub trait CommandChannel: Send {
    /// Request execution of `command` on this channel.
    async fn exec(&mut self, command: &str) -> Result<(), ChannelError>;

    /// Next chunk of remote output, or `None` once the remote signaled
    /// end-of-stream.
    async fn read_chunk(&mut self) -> Result<Option<Bytes>, ChannelError>;

    /// Close the channel and wait for the remote's close acknowledgment.
    async fn finish(&mut self) -> Result<(), ChannelError>;
}

/// Source of ephemeral command channels (an authenticated session)
#[async_trait]
pub trait ChannelHost: Send {
    type Channel: CommandChannel;

    async fn open_channel(&mut self) -> Result<Self::Channel, ShellError>;
}

/// A russh session channel carrying exactly one exec request
pub struct ExecChannel {
    channel: Channel<Msg>,
    eof_seen: bool,
}

impl ExecChannel {
    pub(super) fn new(channel: Channel<Msg>) -> Self {
        Self {
            channel,
            eof_seen: false,
        }
    }
}

#[async_trait]
impl CommandChannel for ExecChannel {
    async fn exec(&mut self, command: &str) -> Result<(), ChannelError> {
        self.channel
            .exec(true, command)
            .await
            .map_err(ChannelError::Exec)
    }

    async fn read_chunk(&mut self) -> Result<Option<Bytes>, ChannelError> {
        if self.eof_seen {
            return Ok(None);
        }

        loop {
            match self.channel.wait().await {
                Some(ChannelMsg::Data { data }) => {
                    return Ok(Some(Bytes::copy_from_slice(&data)))
                }
                Some(ChannelMsg::ExtendedData { data, .. }) => {
                    return Ok(Some(Bytes::copy_from_slice(&data)))
                }
                Some(ChannelMsg::Eof) => {
                    self.eof_seen = true;
                    return Ok(None);
                }
                Some(ChannelMsg::Failure) => return Err(ChannelError::Rejected),
                // Close without a preceding EOF loses buffered output
                Some(ChannelMsg::Close) => return Err(ChannelError::UnexpectedEof),
                Some(_) => continue,
                None => return Err(ChannelError::UnexpectedEof),
            }
        }
    }

    async fn finish(&mut self) -> Result<(), ChannelError> {
        self.channel.close().await.map_err(ChannelError::Close)?;

        loop {
            match self.channel.wait().await {
                Some(ChannelMsg::Close) => return Ok(()),
                Some(_) => continue,
                None => return Err(ChannelError::MissingCloseAck),
            }
        }
    }
}

/// Drive the interactive loop over an authenticated session.
///
/// Reads one operator line at a time. The exit sentinel (or end of input)
/// leaves gracefully without opening a channel; any other line runs on a
/// fresh ephemeral channel whose readiness is gated by `ready_timeout`.
/// The first failure aborts the loop and bubbles to the caller.
pub async fn command_loop<H, R, W>(
    host: &mut H,
    input: &mut R,
    output: &mut W,
    prompt: &str,
    ready_timeout: Duration,
) -> Result<(), ShellError>
where
    H: ChannelHost,
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    loop {
        output.write_all(prompt.as_bytes()).await?;
        output.flush().await?;

        let mut line = String::new();
        if input.read_line(&mut line).await? == 0 {
            // Operator input ended; same graceful path as the sentinel
            return Ok(());
        }
        let command = line.trim_end_matches(['\r', '\n']);

        if command == EXIT_SENTINEL {
            return Ok(());
        }
        if command.is_empty() {
            continue;
        }

        let mut channel = tokio::time::timeout(ready_timeout, host.open_channel())
            .await
            .map_err(|_| ShellError::ChannelTimeout {
                timeout: ready_timeout,
            })??;

        channel.exec(command).await?;
        while let Some(chunk) = channel.read_chunk().await? {
            output.write_all(&chunk).await?;
        }
        output.flush().await?;
        channel.finish().await?;
    }
}
