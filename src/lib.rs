//! # linewire - Line-Oriented Handshake Client
//!
//! Client side of a minimal text protocol over a local stream socket: open
//! one connection, write the `HELLO` handshake, then consume
//! newline-delimited messages from the peer until it closes.
//!
//! ## Features
//!
//! - **Strict sequencing**: the handshake is written and flushed before the
//!   first read
//! - **Ordered delivery**: messages arrive byte-for-byte, in wire order, as a
//!   callback, a pull API, or a `futures::Stream`
//! - **Cancellation**: an external stop signal interrupts any pending connect,
//!   delay, write or read and closes the connection
//! - **Typed errors**: connect, write, read and cancel failures carry the
//!   endpoint and the phase they occurred in
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use linewire::{Endpoint, Session, SessionConfig, StopSignal};
//!
//! let (handle, stop) = StopSignal::new();
//! let endpoint = Endpoint::new("/tmp/broker.sock");
//!
//! let mut session = Session::open(endpoint, SessionConfig::default(), stop).await?;
//! session.handshake().await?;
//!
//! let stats = session.receive_loop(|msg| println!("{msg}")).await?;
//! println!("{} messages", stats.messages_received);
//! ```
//!
//! ## Modules
//!
//! - [`protocol`]: Framing, handshake and session state machine
//! - [`transport`]: Endpoint descriptor and stream connectors
//! - [`config`]: Configuration management
//! - [`error`]: Error types and result aliases

pub mod config;
pub mod error;
pub mod protocol;
pub mod transport;

// Re-exports for convenience
pub use config::{Config, ConfigOverlay, SessionOverrides};
pub use error::{Phase, Result, SessionError};
pub use protocol::{
    Message, PartialFramePolicy, Session, SessionConfig, SessionState, SessionStats, StopHandle,
    StopSignal, HANDSHAKE_TOKEN,
};
pub use transport::{Connector, Endpoint, UnixConnector};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
