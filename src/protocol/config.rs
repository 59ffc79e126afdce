//! Session tuning knobs.

use std::time::Duration;

use super::framing::PartialFramePolicy;
use super::{DEFAULT_CONNECT_TIMEOUT_SECS, DEFAULT_SETTLE_DELAY_MS};
use crate::error::{Result, SessionError};

/// Session configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Pause between connecting and writing the handshake. Zero disables it.
    pub settle_delay: Duration,
    /// Upper bound for establishing the connection.
    pub connect_timeout: Duration,
    /// Fail a read when no bytes arrive for this long.
    pub idle_timeout: Option<Duration>,
    /// Maximum inbound frame length, delimiter excluded.
    pub max_frame_len: Option<usize>,
    /// Handling of an undelimited tail at end of stream.
    pub partial_frame: PartialFramePolicy,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            settle_delay: Duration::from_millis(DEFAULT_SETTLE_DELAY_MS),
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
            idle_timeout: None,
            max_frame_len: None,
            partial_frame: PartialFramePolicy::default(),
        }
    }
}

impl SessionConfig {
    /// Set the settling delay.
    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    /// Skip the settling delay.
    pub fn without_settle_delay(self) -> Self {
        self.with_settle_delay(Duration::ZERO)
    }

    /// Set the connect timeout.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set the idle read timeout.
    pub fn with_idle_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.idle_timeout = timeout;
        self
    }

    /// Set the maximum frame length.
    pub fn with_max_frame_len(mut self, max_len: Option<usize>) -> Self {
        self.max_frame_len = max_len;
        self
    }

    /// Set the partial-frame policy.
    pub fn with_partial_frame(mut self, policy: PartialFramePolicy) -> Self {
        self.partial_frame = policy;
        self
    }

    /// Reject values that would make a session unusable.
    pub fn validate(&self) -> Result<()> {
        if self.connect_timeout.is_zero() {
            return Err(SessionError::Config(
                "connect timeout must be greater than zero".to_string(),
            ));
        }
        if self.idle_timeout.is_some_and(|t| t.is_zero()) {
            return Err(SessionError::Config(
                "idle timeout must be greater than zero".to_string(),
            ));
        }
        if self.max_frame_len == Some(0) {
            return Err(SessionError::Config(
                "max frame length must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}
