//! Newline framing for the inbound byte stream.
//!
//! Frames are the bytes between two `\n` delimiters. There is no length
//! prefix and no escaping; a `\r` before the delimiter is part of the frame.
//! Bytes left over when the stream ends are handled by [`PartialFramePolicy`].
//!
//! [`LineFramer`] is a `tokio_util` codec: the session drives it through
//! `Framed`, which owns the read and write buffers.

use std::io;

use bytes::{Buf, Bytes, BytesMut};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio_util::codec::{Decoder, Encoder};

use super::message::DELIMITER;

/// What to do with an undelimited tail when the stream ends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PartialFramePolicy {
    /// Drop the tail; only delimited frames become messages (default)
    #[default]
    Discard,
    /// Deliver the tail as a final, undelimited message
    Emit,
}

impl std::str::FromStr for PartialFramePolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "discard" => Ok(Self::Discard),
            "emit" => Ok(Self::Emit),
            _ => Err(format!("Unknown partial frame policy: {}", s)),
        }
    }
}

/// Framing violations and transport errors surfaced through the codec.
#[derive(Error, Debug)]
pub enum FramingError {
    /// Frame grew past the configured limit before a delimiter arrived.
    #[error("frame exceeds {limit} bytes")]
    TooLong {
        /// Configured limit in bytes.
        limit: usize,
    },

    /// Underlying read or write failed.
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl From<FramingError> for io::Error {
    fn from(err: FramingError) -> Self {
        match err {
            FramingError::Io(e) => e,
            other @ FramingError::TooLong { .. } => io::Error::new(io::ErrorKind::InvalidData, other),
        }
    }
}

/// Newline codec.
///
/// Decoding yields complete frames in arrival order, delimiter stripped.
/// Already scanned bytes are not rescanned. Encoding appends the delimiter.
#[derive(Debug, Clone, Default)]
pub struct LineFramer {
    /// Bytes at the front of the read buffer known to contain no delimiter
    scanned: usize,
    max_len: Option<usize>,
    policy: PartialFramePolicy,
    /// Bytes taken out of the read buffer, delimiters and tail included
    consumed: u64,
    /// Tail bytes dropped under [`PartialFramePolicy::Discard`]
    discarded: u64,
}

impl LineFramer {
    /// Create an unlimited framer with the default partial-frame policy.
    pub fn new() -> Self {
        Self::default()
    }

    /// Limit frame length (delimiter excluded).
    pub fn with_max_len(mut self, max_len: Option<usize>) -> Self {
        self.max_len = max_len;
        self
    }

    /// Set the end-of-stream policy.
    pub fn with_policy(mut self, policy: PartialFramePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// End-of-stream policy in use.
    pub fn policy(&self) -> PartialFramePolicy {
        self.policy
    }

    /// Bytes removed from the read buffer so far.
    pub fn consumed(&self) -> u64 {
        self.consumed
    }

    /// Bytes dropped at end of stream.
    pub fn discarded(&self) -> u64 {
        self.discarded
    }

    fn check_len(&self, len: usize) -> Result<(), FramingError> {
        match self.max_len {
            Some(limit) if len > limit => Err(FramingError::TooLong { limit }),
            _ => Ok(()),
        }
    }
}

impl Decoder for LineFramer {
    type Item = Bytes;
    type Error = FramingError;

    fn decode(&mut self, buf: &mut BytesMut) -> Result<Option<Bytes>, FramingError> {
        let found = buf[self.scanned..]
            .iter()
            .position(|b| *b == DELIMITER)
            .map(|offset| self.scanned + offset);

        match found {
            Some(end) => {
                self.check_len(end)?;
                self.scanned = 0;
                self.consumed += (end + 1) as u64;
                let frame = buf.split_to(end).freeze();
                buf.advance(1);
                Ok(Some(frame))
            },
            None => {
                self.scanned = buf.len();
                self.check_len(buf.len())?;
                Ok(None)
            },
        }
    }

    fn decode_eof(&mut self, buf: &mut BytesMut) -> Result<Option<Bytes>, FramingError> {
        if let Some(frame) = self.decode(buf)? {
            return Ok(Some(frame));
        }
        self.scanned = 0;
        if buf.is_empty() {
            return Ok(None);
        }

        let tail = buf.split().freeze();
        self.consumed += tail.len() as u64;
        match self.policy {
            PartialFramePolicy::Emit => Ok(Some(tail)),
            PartialFramePolicy::Discard => {
                self.discarded += tail.len() as u64;
                Ok(None)
            },
        }
    }
}

impl Encoder<Bytes> for LineFramer {
    type Error = FramingError;

    fn encode(&mut self, frame: Bytes, dst: &mut BytesMut) -> Result<(), FramingError> {
        dst.reserve(frame.len() + 1);
        dst.extend_from_slice(&frame);
        dst.extend_from_slice(&[DELIMITER]);
        Ok(())
    }
}
