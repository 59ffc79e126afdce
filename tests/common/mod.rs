//! Shared helpers for integration tests: a Unix-socket test peer and a
//! connector that counts live connections.

#![allow(dead_code)]

use std::io;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};

use linewire::transport::ConnectFuture;
use linewire::{Connector, Endpoint, SessionConfig, UnixConnector};
use tempfile::TempDir;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, ReadBuf};
use tokio::net::{UnixListener, UnixStream};

/// Listening socket in a private temp directory.
pub struct TestPeer {
    _dir: TempDir,
    pub endpoint: Endpoint,
    pub listener: UnixListener,
}

impl TestPeer {
    pub fn bind() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("peer.sock");
        let listener = UnixListener::bind(&path).unwrap();
        Self {
            _dir: dir,
            endpoint: Endpoint::new(path),
            listener,
        }
    }

    /// Accept one client and wait for the exact handshake bytes.
    pub async fn accept_handshake(&self) -> UnixStream {
        let (mut stream, _) = self.listener.accept().await.unwrap();
        let mut hello = [0u8; 6];
        stream.read_exact(&mut hello).await.unwrap();
        assert_eq!(&hello, b"HELLO\n");
        stream
    }
}

/// Session config without the settling pause.
pub fn fast_config() -> SessionConfig {
    SessionConfig::default().without_settle_delay()
}

/// Wraps [`UnixConnector`] and tracks how many streams are alive.
#[derive(Default)]
pub struct CountingConnector {
    live: Arc<AtomicUsize>,
    opened: AtomicUsize,
}

impl CountingConnector {
    pub fn live(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }

    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }
}

impl Connector for CountingConnector {
    type Stream = TrackedStream;

    fn connect<'a>(&'a self, endpoint: &'a Endpoint) -> ConnectFuture<'a, Self::Stream> {
        Box::pin(async move {
            let inner = UnixConnector::new().connect(endpoint).await?;
            self.opened.fetch_add(1, Ordering::SeqCst);
            self.live.fetch_add(1, Ordering::SeqCst);
            Ok(TrackedStream {
                inner,
                live: Arc::clone(&self.live),
            })
        })
    }

    fn name(&self) -> &'static str {
        "counting"
    }
}

pub struct TrackedStream {
    inner: UnixStream,
    live: Arc<AtomicUsize>,
}

impl Drop for TrackedStream {
    fn drop(&mut self) {
        self.live.fetch_sub(1, Ordering::SeqCst);
    }
}

impl AsyncRead for TrackedStream {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().inner).poll_read(cx, buf)
    }
}

impl AsyncWrite for TrackedStream {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.get_mut().inner).poll_write(cx, buf)
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().inner).poll_flush(cx)
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().inner).poll_shutdown(cx)
    }
}
