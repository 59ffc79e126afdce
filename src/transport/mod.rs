//! Transport layer abstraction for linewire.
//!
//! A session talks to its peer over any ordered, reliable byte stream. The
//! default backend is a Unix-domain stream socket addressed by a filesystem
//! path; other backends plug in through [`Connector`].
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │                Session                   │
//! │        (Transport-Agnostic)             │
//! └──────────────────┬──────────────────────┘
//!                    │ Connector::connect(&Endpoint)
//!          ┌────────┴────────┐
//!          ▼                 ▼
//! ┌─────────────────┐ ┌─────────────────┐
//! │  UnixConnector  │ │  custom / test  │
//! │  (UnixStream)   │ │   connectors    │
//! └─────────────────┘ └─────────────────┘
//! ```

mod unix;

pub use unix::UnixConnector;

use std::fmt;
use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};
use std::pin::Pin;

use tokio::io::{AsyncRead, AsyncWrite};

/// Opaque descriptor naming the peer to connect to.
///
/// For the Unix backend this is the socket's filesystem path. How the
/// descriptor is obtained is up to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Endpoint {
    path: PathBuf,
}

impl Endpoint {
    /// Create an endpoint from a socket path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Socket path.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path.display())
    }
}

impl std::str::FromStr for Endpoint {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err("Endpoint must not be empty".to_string());
        }
        Ok(Self::new(trimmed))
    }
}

impl From<&Path> for Endpoint {
    fn from(path: &Path) -> Self {
        Self::new(path)
    }
}

impl From<PathBuf> for Endpoint {
    fn from(path: PathBuf) -> Self {
        Self::new(path)
    }
}

/// Boxed connect future returned by [`Connector::connect`].
pub type ConnectFuture<'a, S> = Pin<Box<dyn Future<Output = io::Result<S>> + Send + 'a>>;

/// Connector trait for pluggable stream backends.
///
/// Implementations open the raw byte stream; the session owns framing,
/// timeouts and cancellation.
pub trait Connector: Send + Sync {
    /// Stream type produced by this connector.
    type Stream: AsyncRead + AsyncWrite + Unpin + Send;

    /// Open a stream to `endpoint`.
    fn connect<'a>(&'a self, endpoint: &'a Endpoint) -> ConnectFuture<'a, Self::Stream>;

    /// Get the connector name for logging.
    fn name(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_endpoint_from_str() {
        let endpoint = Endpoint::from_str("  /tmp/peer.sock ").unwrap();
        assert_eq!(endpoint.path(), Path::new("/tmp/peer.sock"));
        assert_eq!(endpoint.to_string(), "/tmp/peer.sock");
        assert!(Endpoint::from_str("   ").is_err());
    }

    #[test]
    fn test_endpoint_from_path() {
        let endpoint: Endpoint = PathBuf::from("/run/app.sock").into();
        assert_eq!(endpoint, Endpoint::new("/run/app.sock"));
    }
}
