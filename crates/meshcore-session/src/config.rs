//! Session configuration, loaded from YAML.
//!
//! ```yaml
//! framing: stream
//! offline_queue_capacity: 16
//! expected_ack_capacity: 8
//! command_timeout_ms: 5000
//! app_version: 3
//! app_name: mccli
//! event_channel_depth: 64
//! ```
//!
//! Every field is optional; missing fields take the defaults above.

use std::path::Path;
use std::time::Duration;

use meshcore_protocol::Framing;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub const DEFAULT_OFFLINE_QUEUE_CAPACITY: usize = 16;
pub const DEFAULT_EXPECTED_ACK_CAPACITY: usize = 8;
pub const DEFAULT_COMMAND_TIMEOUT_MS: u64 = 5000;
pub const DEFAULT_APP_VERSION: u8 = 3;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// How the transport delimits frames.
    pub framing: Framing,
    pub offline_queue_capacity: usize,
    pub expected_ack_capacity: usize,
    /// Deadline for a command whose caller did not pass one.
    pub command_timeout_ms: u64,
    /// Protocol version announced in `DeviceQuery` and `AppStart`.
    pub app_version: u8,
    pub app_name: String,
    /// Buffered unsolicited events before the session applies backpressure.
    pub event_channel_depth: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            framing: Framing::Stream,
            offline_queue_capacity: DEFAULT_OFFLINE_QUEUE_CAPACITY,
            expected_ack_capacity: DEFAULT_EXPECTED_ACK_CAPACITY,
            command_timeout_ms: DEFAULT_COMMAND_TIMEOUT_MS,
            app_version: DEFAULT_APP_VERSION,
            app_name: "meshcore-session".to_string(),
            event_channel_depth: 64,
        }
    }
}

impl SessionConfig {
    /// Parse and validate a YAML document.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        let config: SessionConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.offline_queue_capacity == 0 {
            return Err(ConfigError::Invalid("offline_queue_capacity must be at least 1".into()));
        }
        if self.expected_ack_capacity == 0 {
            return Err(ConfigError::Invalid("expected_ack_capacity must be at least 1".into()));
        }
        if self.command_timeout_ms == 0 {
            return Err(ConfigError::Invalid("command_timeout_ms must be positive".into()));
        }
        if self.event_channel_depth == 0 {
            return Err(ConfigError::Invalid("event_channel_depth must be at least 1".into()));
        }
        Ok(())
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_millis(self.command_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_uses_defaults() {
        let config = SessionConfig::from_yaml_str("{}").unwrap();
        assert_eq!(config, SessionConfig::default());
        assert_eq!(config.offline_queue_capacity, 16);
        assert_eq!(config.expected_ack_capacity, 8);
        assert_eq!(config.command_timeout(), Duration::from_secs(5));
    }

    #[test]
    fn test_partial_document() {
        let config = SessionConfig::from_yaml_str(
            "framing: datagram\ncommand_timeout_ms: 250\napp_name: handheld\n",
        )
        .unwrap();
        assert_eq!(config.framing, Framing::Datagram);
        assert_eq!(config.command_timeout(), Duration::from_millis(250));
        assert_eq!(config.app_name, "handheld");
        assert_eq!(config.app_version, DEFAULT_APP_VERSION);
    }

    #[test]
    fn test_rejects_zero_capacity() {
        let err = SessionConfig::from_yaml_str("expected_ack_capacity: 0").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_rejects_unknown_framing() {
        let err = SessionConfig::from_yaml_str("framing: carrier-pigeon").unwrap_err();
        assert!(matches!(err, ConfigError::Yaml(_)));
    }

    #[test]
    fn test_yaml_round_trip() {
        let config = SessionConfig {
            framing: Framing::Datagram,
            offline_queue_capacity: 4,
            ..Default::default()
        };
        let yaml = serde_yaml::to_string(&config).unwrap();
        assert_eq!(SessionConfig::from_yaml_str(&yaml).unwrap(), config);
    }
}
