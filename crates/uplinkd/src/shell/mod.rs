//! Remote shell session over SSH
//!
//! One session is one connection lifecycle: connect, handshake,
//! authenticate, run the interactive command loop, tear down. There is no
//! retry inside the session; any failure bubbles to the connection loop,
//! which starts a fresh attempt with a fresh socket and handshake.

mod channel;

pub use channel::{ChannelError, ChannelHost, CommandChannel, ExecChannel};

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use russh::client;
use russh::Disconnect;
use russh_keys::key::PublicKey;
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncWrite};

use uplink_core::{Credentials, EventLog, Level, LinkState};

/// Session-level failures, one variant per step of the attempt
#[derive(Error, Debug)]
pub enum ShellError {
    /// Transport socket could not be opened
    #[error("failed to reach {addr}: {source}")]
    Socket {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    /// Protocol handshake over the open socket failed
    #[error("protocol handshake with {addr} failed: {source}")]
    Handshake {
        addr: SocketAddr,
        #[source]
        source: russh::Error,
    },

    /// Credentials were refused; the established flag stays false
    #[error("authentication rejected for user {user}")]
    AuthRejected { user: String },

    /// Transport fault while authenticating
    #[error("authentication failed: {0}")]
    Auth(russh::Error),

    /// Channel readiness was not signaled within the bounded wait
    #[error("channel was not ready within {timeout:?}")]
    ChannelTimeout { timeout: Duration },

    /// Per-command channel failure
    #[error("channel error: {0}")]
    Channel(#[from] ChannelError),

    /// Operator console failure
    #[error("operator console error: {0}")]
    Io(#[from] std::io::Error),
}

/// Knobs supplied by the connection loop
#[derive(Debug, Clone, Copy)]
pub struct ShellSettings {
    /// Bounded wait gating channel readiness before a command runs
    pub channel_ready_timeout: Duration,
}

/// Accepts the device's host key and traces its fingerprint.
///
/// The device is addressed by IP on a closed link; there is no key registry
/// to verify against.
struct ClientHandler;

#[async_trait]
impl client::Handler for ClientHandler {
    type Error = russh::Error;

    async fn check_server_key(
        &mut self,
        server_public_key: &PublicKey,
    ) -> Result<bool, Self::Error> {
        tracing::debug!("device host key: {}", server_public_key.fingerprint());
        Ok(true)
    }
}

/// An authenticated remote shell session
pub struct ShellSession {
    handle: client::Handle<ClientHandler>,
    user: String,
    host: IpAddr,
    ready_timeout: Duration,
    log: Arc<EventLog>,
}

impl ShellSession {
    /// Connect, handshake, and authenticate against the device.
    ///
    /// Exactly one of each per attempt. On any failure the transport is
    /// released and the error is returned; the caller decides whether to
    /// start a fresh attempt.
    pub async fn connect(
        credentials: &Credentials,
        settings: &ShellSettings,
        log: Arc<EventLog>,
    ) -> Result<Self, ShellError> {
        let addr = SocketAddr::new(credentials.host, credentials.port);
        log.append(
            Level::Info,
            &format!("authenticating user {} at {}", credentials.user, addr),
        );

        let config = Arc::new(client::Config::default());
        let mut handle = client::connect(config, addr, ClientHandler)
            .await
            .map_err(|e| match e {
                russh::Error::IO(source) => ShellError::Socket { addr, source },
                source => ShellError::Handshake { addr, source },
            })?;

        let authenticated = handle
            .authenticate_password(credentials.user.clone(), credentials.password.clone())
            .await
            .map_err(ShellError::Auth)?;

        if !authenticated {
            let _ = handle
                .disconnect(Disconnect::ByApplication, "authentication rejected", "en")
                .await;
            return Err(ShellError::AuthRejected {
                user: credentials.user.clone(),
            });
        }

        log.append(Level::Info, "connected to device");

        Ok(Self {
            handle,
            user: credentials.user.clone(),
            host: credentials.host,
            ready_timeout: settings.channel_ready_timeout,
            log,
        })
    }

    /// Run the interactive loop, then tear the session down.
    ///
    /// The established flag turns true here, strictly after authentication
    /// and strictly before any command runs. Teardown executes on every
    /// exit path and releases the transport before clearing the flag.
    pub async fn run<R, W>(
        mut self,
        state: &LinkState,
        input: &mut R,
        output: &mut W,
    ) -> Result<(), ShellError>
    where
        R: AsyncBufRead + Unpin + Send,
        W: AsyncWrite + Unpin + Send,
    {
        state.set_established(true);

        let prompt = format!("{}@{}:", self.user, self.host);
        let ready_timeout = self.ready_timeout;
        let result = channel::command_loop(&mut self, input, output, &prompt, ready_timeout).await;

        self.teardown(state).await;
        result
    }

    async fn teardown(self, state: &LinkState) {
        if let Err(e) = self
            .handle
            .disconnect(Disconnect::ByApplication, "session ended", "en")
            .await
        {
            tracing::debug!("disconnect during teardown: {}", e);
        }

        state.set_established(false);
        self.log.append(Level::Info, "device session ended");
    }
}

#[async_trait]
impl ChannelHost for ShellSession {
    type Channel = ExecChannel;

    async fn open_channel(&mut self) -> Result<ExecChannel, ShellError> {
        let channel = self
            .handle
            .channel_open_session()
            .await
            .map_err(ChannelError::Open)?;
        Ok(ExecChannel::new(channel))
    }
}
