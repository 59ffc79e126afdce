//! Inbound messages and the handshake token.

use std::fmt;
use std::str::Utf8Error;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Handshake token written once at session start, before any read.
pub const HANDSHAKE_TOKEN: &str = "HELLO";

/// Frame delimiter.
pub const DELIMITER: u8 = b'\n';

/// A single framed message received from the peer.
///
/// Holds the frame bytes exactly as they arrived, without the delimiter.
#[derive(Debug, Clone)]
pub struct Message {
    seq: u64,
    payload: Bytes,
    received_at: DateTime<Utc>,
}

impl Message {
    pub(crate) fn new(seq: u64, payload: Bytes) -> Self {
        Self {
            seq,
            payload,
            received_at: Utc::now(),
        }
    }

    /// Position of this message in the session's arrival order, from 0.
    pub fn seq(&self) -> u64 {
        self.seq
    }

    /// Raw frame bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.payload
    }

    /// Frame bytes as a cheaply clonable buffer.
    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    /// Frame length in bytes.
    pub fn len(&self) -> usize {
        self.payload.len()
    }

    /// Check for an empty frame (a bare `\n` on the wire).
    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }

    /// Frame text, if it is valid UTF-8.
    pub fn to_str(&self) -> Result<&str, Utf8Error> {
        std::str::from_utf8(&self.payload)
    }

    /// Frame text with invalid sequences replaced.
    pub fn to_string_lossy(&self) -> String {
        String::from_utf8_lossy(&self.payload).into_owned()
    }

    /// Wall-clock time the frame was delimited.
    pub fn received_at(&self) -> DateTime<Utc> {
        self.received_at
    }

    /// JSON-friendly view used by the CLI.
    pub fn record(&self) -> MessageRecord {
        MessageRecord {
            seq: self.seq,
            text: self.to_string_lossy(),
            received_at: self.received_at,
        }
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", String::from_utf8_lossy(&self.payload))
    }
}

/// Serializable snapshot of a [`Message`].
#[derive(Debug, Clone, Serialize)]
pub struct MessageRecord {
    /// Arrival sequence number
    pub seq: u64,
    /// Frame text (lossy UTF-8)
    pub text: String,
    /// Receive timestamp
    pub received_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_accessors() {
        let msg = Message::new(3, Bytes::from_static(b"ONE"));
        assert_eq!(msg.seq(), 3);
        assert_eq!(msg.as_bytes(), b"ONE");
        assert_eq!(msg.to_str().unwrap(), "ONE");
        assert_eq!(msg.len(), 3);
        assert!(!msg.is_empty());
        assert_eq!(msg.to_string(), "ONE");
    }

    #[test]
    fn test_message_invalid_utf8_is_kept() {
        let msg = Message::new(0, Bytes::from_static(&[0x66, 0xff, 0x6f]));
        assert!(msg.to_str().is_err());
        assert_eq!(msg.as_bytes(), &[0x66, 0xff, 0x6f]);
        assert_eq!(msg.to_string_lossy(), "f\u{fffd}o");
    }

    #[test]
    fn test_message_record_json() {
        let msg = Message::new(1, Bytes::from_static(b"hi"));
        let json = serde_json::to_value(msg.record()).unwrap();
        assert_eq!(json["seq"], 1);
        assert_eq!(json["text"], "hi");
        assert!(json["received_at"].is_string());
    }
}
