//! Session management for linewire.
//!
//! A session owns one connection for its whole life: connect, write the
//! handshake token, then read newline-delimited frames until the peer closes,
//! an I/O error occurs, or the stop signal is raised.

use std::io;
use std::time::{Duration, Instant};

use bytes::Bytes;
use futures::{SinkExt, Stream, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::UnixStream;
use tokio_util::codec::Framed;

use super::config::SessionConfig;
use super::framing::{FramingError, LineFramer};
use super::message::{Message, DELIMITER, HANDSHAKE_TOKEN};
use super::stop::StopSignal;
use crate::error::{Phase, Result, SessionError};
use crate::transport::{Connector, Endpoint, UnixConnector};

/// Session state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Not connected yet
    Disconnected,
    /// Connect in progress
    Connecting,
    /// Connection open, handshake not sent
    Connected,
    /// Handshake being written
    Handshaking,
    /// Handshake delivered, reading frames
    Receiving,
    /// Ended by peer close, local close or stop signal
    Closed,
    /// Ended by an error
    Failed,
}

impl SessionState {
    /// Check if no further transitions are possible.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Closed | Self::Failed)
    }
}

/// Line protocol session over a stream `S`.
pub struct Session<S = UnixStream> {
    /// Session ID, used for log correlation
    id: String,
    endpoint: Endpoint,
    state: SessionState,
    config: SessionConfig,
    /// Present from connect until a terminal state
    stream: Option<Framed<S, LineFramer>>,
    stop: StopSignal,
    created_at: Instant,
    messages_sent: u64,
    messages_received: u64,
    bytes_sent: u64,
    bytes_received: u64,
    bytes_discarded: u64,
}

impl Session<UnixStream> {
    /// Connect to a Unix-domain socket endpoint.
    pub async fn open(endpoint: Endpoint, config: SessionConfig, stop: StopSignal) -> Result<Self> {
        let mut session = Self::new(endpoint, config, stop);
        session.connect(&UnixConnector::new()).await?;
        Ok(session)
    }
}

impl<S> Session<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    /// Create a disconnected session.
    pub fn new(endpoint: Endpoint, config: SessionConfig, stop: StopSignal) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            endpoint,
            state: SessionState::Disconnected,
            config,
            stream: None,
            stop,
            created_at: Instant::now(),
            messages_sent: 0,
            messages_received: 0,
            bytes_sent: 0,
            bytes_received: 0,
            bytes_discarded: 0,
        }
    }

    /// Wrap an already-open stream. The session starts in `Connected`.
    pub fn from_stream(stream: S, endpoint: Endpoint, config: SessionConfig, stop: StopSignal) -> Self {
        let mut session = Self::new(endpoint, config, stop);
        session.attach(stream);
        session
    }

    /// Connect to an endpoint with a custom connector.
    pub async fn open_with<C>(
        connector: &C,
        endpoint: Endpoint,
        config: SessionConfig,
        stop: StopSignal,
    ) -> Result<Self>
    where
        C: Connector<Stream = S>,
    {
        let mut session = Self::new(endpoint, config, stop);
        session.connect(connector).await?;
        Ok(session)
    }

    /// Get session ID
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Get peer endpoint
    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Get current state
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Get configuration
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Check if the connection resource is still held
    pub fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    /// Establish the connection.
    pub async fn connect<C>(&mut self, connector: &C) -> Result<()>
    where
        C: Connector<Stream = S>,
    {
        self.expect_state(SessionState::Disconnected, "connect")?;
        self.config.validate()?;
        self.state = SessionState::Connecting;

        tracing::debug!(
            session = %self.id,
            endpoint = %self.endpoint,
            connector = connector.name(),
            "Connecting"
        );

        let limit = self.config.connect_timeout;
        let connect = tokio::time::timeout(limit, connector.connect(&self.endpoint));
        let outcome = tokio::select! {
            biased;
            () = self.stop.stopped() => None,
            result = connect => Some(result),
        };

        match outcome {
            None => Err(self.cancel(Phase::Connect)),
            Some(Err(_elapsed)) => {
                let source = io::Error::new(
                    io::ErrorKind::TimedOut,
                    format!("connect timed out after {limit:?}"),
                );
                Err(self.fail(SessionError::Connect {
                    endpoint: self.endpoint.clone(),
                    source,
                }))
            },
            Some(Ok(Err(source))) => Err(self.fail(SessionError::Connect {
                endpoint: self.endpoint.clone(),
                source,
            })),
            Some(Ok(Ok(stream))) => {
                self.attach(stream);
                tracing::info!(session = %self.id, endpoint = %self.endpoint, "Connected");
                Ok(())
            },
        }
    }

    /// Write the handshake token and flush it to the transport.
    ///
    /// Waits out the configured settling delay first. On success the
    /// session is in `Receiving`; no read happens before this returns.
    pub async fn handshake(&mut self) -> Result<()> {
        self.expect_state(SessionState::Connected, "handshake")?;
        self.state = SessionState::Handshaking;

        let delay = self.config.settle_delay;
        if !delay.is_zero() {
            tracing::trace!(session = %self.id, ?delay, "Settling before handshake");
            let settled = tokio::select! {
                biased;
                () = self.stop.stopped() => false,
                () = tokio::time::sleep(delay) => true,
            };
            if !settled {
                return Err(self.cancel(Phase::Settle));
            }
        }

        let token = Bytes::from_static(HANDSHAKE_TOKEN.as_bytes());
        self.write_frame(token, Phase::Handshake).await?;

        self.state = SessionState::Receiving;
        tracing::info!(session = %self.id, endpoint = %self.endpoint, "Handshake sent");
        Ok(())
    }

    /// Send one outbound frame after the handshake.
    ///
    /// `text` must not contain the delimiter; the delimiter is appended.
    pub async fn send(&mut self, text: &str) -> Result<()> {
        self.expect_state(SessionState::Receiving, "send")?;
        if text.as_bytes().contains(&DELIMITER) {
            return Err(SessionError::InvalidFrame(
                "outbound text contains a newline".to_string(),
            ));
        }

        self.write_frame(Bytes::copy_from_slice(text.as_bytes()), Phase::Send).await
    }

    /// Receive the next message.
    ///
    /// Returns `Ok(None)` once the peer has closed the stream (and on every
    /// later call). Any error moves the session to a terminal state.
    pub async fn next_message(&mut self) -> Result<Option<Message>> {
        if self.state == SessionState::Closed {
            return Ok(None);
        }
        self.expect_state(SessionState::Receiving, "receive")?;

        let Some(framed) = self.stream.as_mut() else {
            return Err(SessionError::InvalidState {
                operation: "receive",
                state: self.state,
            });
        };
        let idle = self.config.idle_timeout;
        let outcome = tokio::select! {
            biased;
            () = self.stop.stopped() => None,
            inbound = next_frame(framed, idle) => Some(inbound),
        };

        match outcome {
            None => Err(self.cancel(Phase::Receive)),
            Some(Err(limit)) => {
                let source = io::Error::new(
                    io::ErrorKind::TimedOut,
                    format!("no data received for {limit:?}"),
                );
                Err(self.fail(SessionError::Read {
                    endpoint: self.endpoint.clone(),
                    source,
                }))
            },
            Some(Ok(None)) => {
                self.finish();
                Ok(None)
            },
            Some(Ok(Some(Ok(frame)))) => {
                if let Some(framed) = &self.stream {
                    self.bytes_received = framed.codec().consumed();
                }
                Ok(Some(self.deliver(frame)))
            },
            Some(Ok(Some(Err(FramingError::TooLong { limit })))) => {
                Err(self.fail(SessionError::FrameTooLong {
                    endpoint: self.endpoint.clone(),
                    limit,
                }))
            },
            Some(Ok(Some(Err(FramingError::Io(source))))) => Err(self.fail(SessionError::Read {
                endpoint: self.endpoint.clone(),
                source,
            })),
        }
    }

    /// Consume the session as a stream of messages.
    ///
    /// The stream ends after the peer closes; an error is yielded once and
    /// then the stream ends.
    pub fn messages(self) -> impl Stream<Item = Result<Message>> + Send
    where
        S: 'static,
    {
        futures::stream::unfold(Some(self), |session| async move {
            let Some(mut session) = session else {
                return None;
            };
            match session.next_message().await {
                Ok(Some(message)) => Some((Ok(message), Some(session))),
                Ok(None) => None,
                Err(err) => Some((Err(err), None)),
            }
        })
    }

    /// Deliver every message to `on_message` until the stream ends.
    ///
    /// Returns the final statistics after an orderly close.
    pub async fn receive_loop<F>(&mut self, mut on_message: F) -> Result<SessionStats>
    where
        F: FnMut(Message),
    {
        while let Some(message) = self.next_message().await? {
            on_message(message);
        }
        Ok(self.stats())
    }

    /// Close the connection. No-op in a terminal state.
    pub fn close(&mut self) {
        if self.state.is_terminal() {
            return;
        }
        self.stream = None;
        self.state = SessionState::Closed;
        tracing::info!(session = %self.id, "Session closed locally");
    }

    /// Get session statistics
    pub fn stats(&self) -> SessionStats {
        SessionStats {
            session_id: self.id.clone(),
            state: self.state,
            messages_sent: self.messages_sent,
            messages_received: self.messages_received,
            bytes_sent: self.bytes_sent,
            bytes_received: self.bytes_received,
            bytes_discarded: self.bytes_discarded,
            uptime: self.created_at.elapsed(),
        }
    }

    /// Encode `frame` with its delimiter, write it and flush.
    async fn write_frame(&mut self, frame: Bytes, phase: Phase) -> Result<()> {
        let Some(framed) = self.stream.as_mut() else {
            return Err(SessionError::InvalidState {
                operation: phase.name(),
                state: self.state,
            });
        };

        let wire_len = frame.len() as u64 + 1;
        let outcome = tokio::select! {
            biased;
            () = self.stop.stopped() => None,
            result = framed.send(frame) => Some(result),
        };

        match outcome {
            None => Err(self.cancel(phase)),
            Some(Err(err)) => Err(self.fail(SessionError::Write {
                endpoint: self.endpoint.clone(),
                phase,
                source: err.into(),
            })),
            Some(Ok(())) => {
                self.messages_sent += 1;
                self.bytes_sent += wire_len;
                Ok(())
            },
        }
    }

    fn attach(&mut self, stream: S) {
        let codec = LineFramer::new()
            .with_max_len(self.config.max_frame_len)
            .with_policy(self.config.partial_frame);
        self.stream = Some(Framed::new(stream, codec));
        self.state = SessionState::Connected;
    }

    fn deliver(&mut self, frame: Bytes) -> Message {
        let message = Message::new(self.messages_received, frame);
        self.messages_received += 1;
        tracing::debug!(
            session = %self.id,
            seq = message.seq(),
            bytes = message.len(),
            "Message received"
        );
        message
    }

    /// Handle orderly end of stream.
    fn finish(&mut self) {
        if let Some(framed) = self.stream.take() {
            let codec = framed.codec();
            self.bytes_received = codec.consumed();
            self.bytes_discarded = codec.discarded();
        }
        self.state = SessionState::Closed;

        if self.bytes_discarded > 0 {
            tracing::warn!(
                session = %self.id,
                bytes = self.bytes_discarded,
                "Discarded undelimited data at end of stream"
            );
        }
        tracing::info!(
            session = %self.id,
            messages = self.messages_received,
            "Peer closed connection"
        );
    }

    fn fail(&mut self, err: SessionError) -> SessionError {
        self.stream = None;
        self.state = SessionState::Failed;
        tracing::debug!(session = %self.id, error = %err, "Session failed");
        err
    }

    fn cancel(&mut self, phase: Phase) -> SessionError {
        self.stream = None;
        self.state = SessionState::Closed;
        tracing::info!(session = %self.id, %phase, "Session cancelled by stop signal");
        SessionError::Cancelled {
            endpoint: self.endpoint.clone(),
            phase,
        }
    }

    fn expect_state(&self, expected: SessionState, operation: &'static str) -> Result<()> {
        if self.state == expected {
            Ok(())
        } else {
            Err(SessionError::InvalidState {
                operation,
                state: self.state,
            })
        }
    }
}

type Inbound = Option<std::result::Result<Bytes, FramingError>>;

/// Wait for the next inbound frame.
///
/// With an idle limit this fails with the limit only after a whole interval
/// in which no new bytes reached the read buffer.
async fn next_frame<S>(
    framed: &mut Framed<S, LineFramer>,
    idle: Option<Duration>,
) -> std::result::Result<Inbound, Duration>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let Some(limit) = idle else {
        return Ok(framed.next().await);
    };

    let mut buffered = framed.read_buffer().len();
    loop {
        match tokio::time::timeout(limit, framed.next()).await {
            Ok(inbound) => return Ok(inbound),
            Err(_elapsed) => {
                let now = framed.read_buffer().len();
                if now == buffered {
                    return Err(limit);
                }
                buffered = now;
            },
        }
    }
}

/// Session statistics
#[derive(Debug, Clone)]
pub struct SessionStats {
    /// Session ID
    pub session_id: String,
    /// State at the time of the snapshot
    pub state: SessionState,
    /// Frames written, handshake included
    pub messages_sent: u64,
    /// Messages delivered to the caller
    pub messages_received: u64,
    /// Bytes written
    pub bytes_sent: u64,
    /// Bytes consumed from the stream, delimiters included
    pub bytes_received: u64,
    /// Undelimited bytes dropped at end of stream
    pub bytes_discarded: u64,
    /// Time since the session was created
    pub uptime: Duration,
}
