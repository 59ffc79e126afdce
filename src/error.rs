//! linewire error types.
//!
//! Every error is fatal to the session that produced it. Nothing is retried
//! internally; the caller receives the error together with the endpoint and
//! the lifecycle phase in which it occurred.
//!
//! I/O failures keep their original `std::io::Error` via `#[source]`, so
//! tools like `anyhow` can print the complete chain.

use std::fmt;
use std::io;

use thiserror::Error;

use crate::protocol::SessionState;
use crate::transport::Endpoint;

/// Lifecycle phase an error was raised in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Establishing the connection.
    Connect,
    /// Waiting out the settling delay before the handshake.
    Settle,
    /// Writing the handshake token.
    Handshake,
    /// Reading inbound frames.
    Receive,
    /// Writing an outbound frame after the handshake.
    Send,
}

impl Phase {
    /// Get descriptive name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Connect => "connect",
            Self::Settle => "settle",
            Self::Handshake => "handshake",
            Self::Receive => "receive",
            Self::Send => "send",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Session errors.
#[derive(Error, Debug)]
pub enum SessionError {
    /// Endpoint missing, not listening, refused, or the connect timed out.
    #[error("Connect error ({endpoint}): {source}")]
    Connect {
        /// Endpoint the connection was attempted against.
        endpoint: Endpoint,
        /// Underlying transport error.
        #[source]
        source: io::Error,
    },

    /// The transport rejected or could not complete a write.
    #[error("Write error during {phase} ({endpoint}): {source}")]
    Write {
        /// Peer endpoint.
        endpoint: Endpoint,
        /// Phase that issued the write.
        phase: Phase,
        /// Underlying transport error.
        #[source]
        source: io::Error,
    },

    /// Read failure other than an orderly close.
    #[error("Read error ({endpoint}): {source}")]
    Read {
        /// Peer endpoint.
        endpoint: Endpoint,
        /// Underlying transport error.
        #[source]
        source: io::Error,
    },

    /// Aborted by the external stop signal.
    #[error("Cancelled during {phase} ({endpoint})")]
    Cancelled {
        /// Peer endpoint.
        endpoint: Endpoint,
        /// Phase that was interrupted.
        phase: Phase,
    },

    /// An inbound frame exceeded the configured length limit.
    #[error("Frame exceeds {limit} bytes ({endpoint})")]
    FrameTooLong {
        /// Peer endpoint.
        endpoint: Endpoint,
        /// Configured limit in bytes.
        limit: usize,
    },

    /// Operation not allowed in the current session state.
    #[error("Cannot {operation} in state {state:?}")]
    InvalidState {
        /// Operation that was attempted.
        operation: &'static str,
        /// State the session was in.
        state: SessionState,
    },

    /// Outbound text cannot be framed (contains the delimiter).
    #[error("Invalid frame: {0}")]
    InvalidFrame(String),

    /// Configuration error.
    #[error("Config error: {0}")]
    Config(String),
}

impl SessionError {
    /// Phase the error belongs to, if it is tied to the connection.
    pub fn phase(&self) -> Option<Phase> {
        match self {
            Self::Connect { .. } => Some(Phase::Connect),
            Self::Write { phase, .. } | Self::Cancelled { phase, .. } => Some(*phase),
            Self::Read { .. } | Self::FrameTooLong { .. } => Some(Phase::Receive),
            Self::InvalidState { .. } | Self::InvalidFrame(_) | Self::Config(_) => None,
        }
    }

    /// Check if this is a connect failure.
    pub fn is_connect(&self) -> bool {
        matches!(self, Self::Connect { .. })
    }

    /// Check if this is a write failure.
    pub fn is_write(&self) -> bool {
        matches!(self, Self::Write { .. })
    }

    /// Check if this is a read failure (including over-long frames).
    pub fn is_read(&self) -> bool {
        matches!(self, Self::Read { .. } | Self::FrameTooLong { .. })
    }

    /// Check if the stop signal ended the operation.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }

    /// Kind of the underlying I/O error, if any.
    pub fn io_kind(&self) -> Option<io::ErrorKind> {
        match self {
            Self::Connect { source, .. } | Self::Write { source, .. } | Self::Read { source, .. } => {
                Some(source.kind())
            },
            _ => None,
        }
    }
}

/// Result type alias for linewire operations
pub type Result<T> = std::result::Result<T, SessionError>;

impl From<toml::de::Error> for SessionError {
    fn from(err: toml::de::Error) -> Self {
        SessionError::Config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_context_in_message() {
        let err = SessionError::Write {
            endpoint: Endpoint::new("/tmp/peer.sock"),
            phase: Phase::Handshake,
            source: io::Error::from(io::ErrorKind::BrokenPipe),
        };
        let text = err.to_string();
        assert!(text.contains("handshake"));
        assert!(text.contains("/tmp/peer.sock"));
        assert_eq!(err.phase(), Some(Phase::Handshake));
        assert_eq!(err.io_kind(), Some(io::ErrorKind::BrokenPipe));
        assert!(err.is_write());
    }

    #[test]
    fn test_error_predicates() {
        let endpoint = Endpoint::new("/tmp/x.sock");
        let cancelled = SessionError::Cancelled {
            endpoint: endpoint.clone(),
            phase: Phase::Receive,
        };
        assert!(cancelled.is_cancelled());
        assert!(!cancelled.is_read());
        assert!(cancelled.io_kind().is_none());

        let too_long = SessionError::FrameTooLong { endpoint, limit: 8 };
        assert!(too_long.is_read());
        assert_eq!(too_long.phase(), Some(Phase::Receive));
    }

    #[test]
    fn test_toml_error_maps_to_config() {
        let err: SessionError = toml::from_str::<toml::Value>("= broken").unwrap_err().into();
        assert!(matches!(err, SessionError::Config(_)));
    }
}
