//! Unix-domain stream socket backend.

use tokio::net::UnixStream;

use super::{ConnectFuture, Connector, Endpoint};

/// Connects to a listening Unix-domain stream socket.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnixConnector;

impl UnixConnector {
    /// Create a new Unix connector.
    pub fn new() -> Self {
        Self
    }
}

impl Connector for UnixConnector {
    type Stream = UnixStream;

    fn connect<'a>(&'a self, endpoint: &'a Endpoint) -> ConnectFuture<'a, Self::Stream> {
        Box::pin(async move {
            tracing::debug!(endpoint = %endpoint, "Connecting to Unix socket");
            UnixStream::connect(endpoint.path()).await
        })
    }

    fn name(&self) -> &'static str {
        "unix"
    }
}
