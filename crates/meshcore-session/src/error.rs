//! Error types for the session crate.

use std::time::Duration;

use bytes::Bytes;
use meshcore_protocol::{FirmwareErrorCode, ProtocolError};
use thiserror::Error;

/// Errors returned to a caller of the session.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// Another command is still awaiting its response.
    #[error("a command is already awaiting its response")]
    Busy,

    /// No terminal response arrived before the deadline.
    #[error("no response within {0:?}")]
    Timeout(Duration),

    /// The offline queue is full and holds no evictable channel message.
    #[error("offline queue is full")]
    QueueFull,

    /// The session task has stopped.
    #[error("session closed")]
    Closed,

    /// The byte channel to the radio is gone.
    #[error("transport closed")]
    TransportClosed,

    /// The byte channel to the radio has no room for the command.
    #[error("transport is not accepting writes")]
    TransportFull,

    /// An outbound frame could not be built.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// The terminal frame for a command could not be decoded.
    #[error("malformed response ({} bytes): {reason}", raw.len())]
    Malformed { raw: Bytes, reason: ProtocolError },

    /// The radio answered with `RESP_CODE_ERR`.
    #[error("radio error: {0}")]
    Firmware(FirmwareErrorCode),

    /// The radio answered with a response that does not fit the command.
    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),
}

/// Errors loading a [`SessionConfig`](crate::SessionConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}
