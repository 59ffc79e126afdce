//! Configuration management.
//!
//! Supports configuration from:
//! - TOML config files
//! - Environment variables
//! - CLI arguments (applied by the binary on top)
//!
//! The session itself reads none of these; this layer only produces a
//! [`SessionConfig`] and an optional default endpoint.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SessionError};
use crate::protocol::{
    PartialFramePolicy, SessionConfig, DEFAULT_CONNECT_TIMEOUT_SECS, DEFAULT_SETTLE_DELAY_MS,
};
use crate::transport::Endpoint;

/// Main configuration struct
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Default endpoint when none is given on the command line
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,

    /// Session configuration
    #[serde(default)]
    pub session: SessionSection,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let content = std::fs::read_to_string(&path).map_err(|e| {
            SessionError::Config(format!("Failed to read config file {}: {e}", path.display()))
        })?;

        toml::from_str(&content)
            .map_err(|e| SessionError::Config(format!("Failed to parse config: {e}")))
    }

    /// Default config file location (`<config dir>/linewire/config.toml`)
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("linewire").join("config.toml"))
    }

    /// Load the default config file if it exists, otherwise defaults
    pub fn load_default() -> Result<Self> {
        match Self::default_path() {
            Some(path) if path.exists() => Self::from_file(path),
            _ => Ok(Self::default()),
        }
    }

    /// Load overrides from environment variables
    pub fn from_env() -> ConfigOverlay {
        ConfigOverlay::from_lookup(|key| std::env::var(key).ok())
    }

    /// Apply an override layer; every value it sets wins.
    pub fn merge(self, overlay: ConfigOverlay) -> Self {
        let session = overlay.session;
        Self {
            endpoint: overlay.endpoint.or(self.endpoint),
            session: SessionSection {
                settle_delay_ms: session.settle_delay_ms.unwrap_or(self.session.settle_delay_ms),
                connect_timeout_ms: session
                    .connect_timeout_ms
                    .unwrap_or(self.session.connect_timeout_ms),
                idle_timeout_ms: session.idle_timeout_ms.or(self.session.idle_timeout_ms),
                max_frame_len: session.max_frame_len.or(self.session.max_frame_len),
                partial_frame: session.partial_frame.unwrap_or(self.session.partial_frame),
            },
        }
    }

    /// Configured default endpoint, if any
    pub fn endpoint(&self) -> Result<Option<Endpoint>> {
        self.endpoint
            .as_deref()
            .map(|s| s.parse::<Endpoint>().map_err(SessionError::Config))
            .transpose()
    }

    /// Build a validated session configuration
    pub fn session_config(&self) -> Result<SessionConfig> {
        let config = self.session.to_session_config();
        config.validate()?;
        Ok(config)
    }
}

/// Override layer (environment or command line).
///
/// Unlike [`Config`], an unset field is distinct from a field set to its
/// default, so an explicit value always overrides the layer below.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigOverlay {
    /// Endpoint override
    pub endpoint: Option<String>,
    /// Session overrides
    pub session: SessionOverrides,
}

/// Per-field session overrides
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionOverrides {
    /// Pause before the handshake, milliseconds
    pub settle_delay_ms: Option<u64>,
    /// Connect timeout, milliseconds
    pub connect_timeout_ms: Option<u64>,
    /// Idle read timeout, milliseconds
    pub idle_timeout_ms: Option<u64>,
    /// Maximum inbound frame length in bytes
    pub max_frame_len: Option<usize>,
    /// End-of-stream policy
    pub partial_frame: Option<PartialFramePolicy>,
}

impl ConfigOverlay {
    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let parsed = |key: &str| lookup(key).and_then(|v| v.parse().ok());

        Self {
            endpoint: lookup("LINEWIRE_ENDPOINT"),
            session: SessionOverrides {
                settle_delay_ms: parsed("LINEWIRE_SETTLE_MS"),
                connect_timeout_ms: parsed("LINEWIRE_CONNECT_TIMEOUT_MS"),
                idle_timeout_ms: parsed("LINEWIRE_IDLE_TIMEOUT_MS"),
                max_frame_len: lookup("LINEWIRE_MAX_FRAME_LEN").and_then(|v| v.parse().ok()),
                partial_frame: lookup("LINEWIRE_PARTIAL_FRAME").and_then(|v| v.parse().ok()),
            },
        }
    }
}

/// `[session]` table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSection {
    /// Pause before the handshake, milliseconds (0 disables)
    pub settle_delay_ms: u64,

    /// Connect timeout, milliseconds
    pub connect_timeout_ms: u64,

    /// Idle read timeout, milliseconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub idle_timeout_ms: Option<u64>,

    /// Maximum inbound frame length in bytes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_frame_len: Option<usize>,

    /// `"discard"` or `"emit"`
    pub partial_frame: PartialFramePolicy,
}

impl Default for SessionSection {
    fn default() -> Self {
        Self {
            settle_delay_ms: DEFAULT_SETTLE_DELAY_MS,
            connect_timeout_ms: DEFAULT_CONNECT_TIMEOUT_SECS * 1000,
            idle_timeout_ms: None,
            max_frame_len: None,
            partial_frame: PartialFramePolicy::default(),
        }
    }
}

impl SessionSection {
    /// Convert millisecond fields into a [`SessionConfig`]
    pub fn to_session_config(&self) -> SessionConfig {
        SessionConfig::default()
            .with_settle_delay(Duration::from_millis(self.settle_delay_ms))
            .with_connect_timeout(Duration::from_millis(self.connect_timeout_ms))
            .with_idle_timeout(self.idle_timeout_ms.map(Duration::from_millis))
            .with_max_frame_len(self.max_frame_len)
            .with_partial_frame(self.partial_frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.endpoint.is_none());
        assert_eq!(config.session.settle_delay_ms, 100);
        assert_eq!(config.session.connect_timeout_ms, 5000);
        assert_eq!(config.session_config().unwrap(), SessionConfig::default());
    }

    #[test]
    fn test_config_from_toml() {
        let toml = r#"
            endpoint = "/run/broker.sock"

            [session]
            settle_delay_ms = 0
            idle_timeout_ms = 2500
            max_frame_len = 65536
            partial_frame = "emit"
        "#;

        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.endpoint().unwrap(), Some(Endpoint::new("/run/broker.sock")));

        let session = config.session_config().unwrap();
        assert!(session.settle_delay.is_zero());
        assert_eq!(session.connect_timeout, Duration::from_secs(5));
        assert_eq!(session.idle_timeout, Some(Duration::from_millis(2500)));
        assert_eq!(session.max_frame_len, Some(65536));
        assert_eq!(session.partial_frame, PartialFramePolicy::Emit);
    }

    #[test]
    fn test_config_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[session]\nconnect_timeout_ms = 250\n").unwrap();

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.session.connect_timeout_ms, 250);

        let missing = Config::from_file(dir.path().join("nope.toml")).unwrap_err();
        assert!(matches!(missing, SessionError::Config(_)));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config: Config = toml::from_str("[session]\nconnect_timeout_ms = 0\n").unwrap();
        assert!(config.session_config().is_err());

        let bad_policy = toml::from_str::<Config>("[session]\npartial_frame = \"sometimes\"\n");
        assert!(bad_policy.is_err());
    }

    #[test]
    fn test_overlay_from_lookup() {
        let vars: HashMap<&str, &str> = [
            ("LINEWIRE_ENDPOINT", "/tmp/env.sock"),
            ("LINEWIRE_SETTLE_MS", "0"),
            ("LINEWIRE_IDLE_TIMEOUT_MS", "not-a-number"),
            ("LINEWIRE_PARTIAL_FRAME", "emit"),
        ]
        .into_iter()
        .collect();

        let overlay = ConfigOverlay::from_lookup(|k| vars.get(k).map(|v| (*v).to_string()));
        assert_eq!(overlay.endpoint.as_deref(), Some("/tmp/env.sock"));
        assert_eq!(overlay.session.settle_delay_ms, Some(0));
        assert!(overlay.session.idle_timeout_ms.is_none());
        assert!(overlay.session.connect_timeout_ms.is_none());
        assert_eq!(overlay.session.partial_frame, Some(PartialFramePolicy::Emit));
    }

    #[test]
    fn test_config_merge() {
        let file: Config = toml::from_str(
            "endpoint = \"/tmp/file.sock\"\n[session]\nidle_timeout_ms = 1000\nsettle_delay_ms = 20\n",
        )
        .unwrap();
        let env = ConfigOverlay {
            endpoint: Some("/tmp/env.sock".to_string()),
            ..ConfigOverlay::default()
        };

        let merged = file.merge(env);
        assert_eq!(merged.endpoint.as_deref(), Some("/tmp/env.sock"));
        assert_eq!(merged.session.idle_timeout_ms, Some(1000));
        assert_eq!(merged.session.settle_delay_ms, 20);
    }

    #[test]
    fn test_merge_value_equal_to_default_still_overrides() {
        let file: Config = toml::from_str(
            "[session]\nsettle_delay_ms = 20\nconnect_timeout_ms = 250\npartial_frame = \"emit\"\n",
        )
        .unwrap();
        let vars: HashMap<&str, &str> = [
            ("LINEWIRE_SETTLE_MS", "100"),
            ("LINEWIRE_CONNECT_TIMEOUT_MS", "5000"),
            ("LINEWIRE_PARTIAL_FRAME", "discard"),
        ]
        .into_iter()
        .collect();
        let env = ConfigOverlay::from_lookup(|k| vars.get(k).map(|v| (*v).to_string()));

        let merged = file.merge(env);
        assert_eq!(merged.session.settle_delay_ms, 100);
        assert_eq!(merged.session.connect_timeout_ms, 5000);
        assert_eq!(merged.session.partial_frame, PartialFramePolicy::Discard);
    }

    #[test]
    fn test_merge_layers_in_order() {
        let file: Config = toml::from_str("[session]\nsettle_delay_ms = 20\n").unwrap();
        let env = ConfigOverlay {
            session: SessionOverrides {
                settle_delay_ms: Some(50),
                max_frame_len: Some(1024),
                ..SessionOverrides::default()
            },
            ..ConfigOverlay::default()
        };
        let cli = ConfigOverlay {
            session: SessionOverrides {
                settle_delay_ms: Some(0),
                ..SessionOverrides::default()
            },
            ..ConfigOverlay::default()
        };

        let merged = file.merge(env).merge(cli);
        assert_eq!(merged.session.settle_delay_ms, 0);
        assert_eq!(merged.session.max_frame_len, Some(1024));
    }
}
