//! linewire protocol: framing, handshake and session lifecycle.
//!
//! # Wire Format
//!
//! Plain text, one frame per line, `\n` delimited. No length prefix, no
//! escaping, no encoding negotiation.
//!
//! ## Message Flow
//!
//! ```text
//! Client                            Peer
//!    |                                |
//!    |  (settling delay, optional)    |
//!    |-------- HELLO\n -------------->|  Handshake, written and flushed
//!    |                                |
//!    |<------- frame\n ---------------|  Zero or more frames,
//!    |<------- frame\n ---------------|  delivered in arrival order
//!    |                                |
//!    |<------- EOF -------------------|  Orderly close ends the session
//! ```
//!
//! ## State Machine
//!
//! | State          | Description                        | Valid Transitions        |
//! |----------------|------------------------------------|--------------------------|
//! | `Disconnected` | Created, no connection             | → Connecting             |
//! | `Connecting`   | Connect in progress                | → Connected, Failed, Closed |
//! | `Connected`    | Stream open, handshake pending     | → Handshaking, Closed    |
//! | `Handshaking`  | Settling / writing `HELLO`         | → Receiving, Failed, Closed |
//! | `Receiving`    | Reading frames                     | → Closed, Failed         |
//! | `Closed`       | Peer close, local close, or stop   | (terminal)               |
//! | `Failed`       | I/O or framing error               | (terminal)               |
//!
//! The connection is released on entering either terminal state.
//!
//! # Usage
//!
//! ```rust,ignore
//! use linewire::protocol::{Session, SessionConfig, StopSignal};
//! use linewire::transport::Endpoint;
//!
//! let (handle, stop) = StopSignal::new();
//! let mut session = Session::open(Endpoint::new("/tmp/app.sock"), SessionConfig::default(), stop).await?;
//! session.handshake().await?;
//! session.receive_loop(|msg| println!("{msg}")).await?;
//! ```

mod config;
mod framing;
mod message;
mod session;
mod stop;

pub use config::SessionConfig;
pub use framing::{FramingError, LineFramer, PartialFramePolicy};
pub use message::{Message, MessageRecord, DELIMITER, HANDSHAKE_TOKEN};
pub use session::{Session, SessionState, SessionStats};
pub use stop::{StopHandle, StopSignal};

/// Default pause before the handshake write (100 ms).
pub const DEFAULT_SETTLE_DELAY_MS: u64 = 100;

/// Default bound for establishing the connection.
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 5;
