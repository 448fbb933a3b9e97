//! Protocol error types.

use thiserror::Error;

use crate::constants::*;

/// Errors produced while decoding companion protocol frames.
///
/// None of these are fatal: the session surfaces them as a parse failure and
/// carries on with the next frame.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// The record is shorter than its fixed header.
    #[error("frame too short: expected at least {expected} bytes, got {actual}")]
    FrameTooShort {
        /// Minimum length required at the failing field.
        expected: usize,
        /// Bytes actually available.
        actual: usize,
    },

    /// A command frame started with a code this crate does not know.
    #[error("unknown command code: 0x{0:02X}")]
    UnknownCommand(u8),

    /// A response or push frame started with an unknown code.
    #[error("unknown response code: 0x{0:02X}")]
    UnknownResponse(u8),

    /// `RESP_CODE_STATS` carried an unknown stats kind.
    #[error("unknown stats type: {0}")]
    UnknownStatsType(u8),

    /// The frame was empty.
    #[error("empty frame")]
    EmptyFrame,

    /// A payload does not fit the 16-bit length field of a stream frame.
    #[error("payload of {0} bytes exceeds the stream frame limit")]
    PayloadTooLarge(usize),
}

impl ProtocolError {
    /// Shorthand for [`ProtocolError::FrameTooShort`].
    pub fn too_short(expected: usize, actual: usize) -> Self {
        ProtocolError::FrameTooShort { expected, actual }
    }
}

/// Error codes carried by a `RESP_CODE_ERR` frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FirmwareErrorCode {
    UnsupportedCommand,
    NotFound,
    TableFull,
    BadState,
    FileIoError,
    IllegalArg,
    /// Code outside the documented set.
    Unknown(u8),
}

impl std::fmt::Display for FirmwareErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            FirmwareErrorCode::UnsupportedCommand => "unsupported command",
            FirmwareErrorCode::NotFound => "not found",
            FirmwareErrorCode::TableFull => "table full",
            FirmwareErrorCode::BadState => "bad state",
            FirmwareErrorCode::FileIoError => "file I/O error",
            FirmwareErrorCode::IllegalArg => "illegal argument",
            FirmwareErrorCode::Unknown(code) => return write!(f, "unknown error (0x{:02X})", code),
        };
        f.write_str(text)
    }
}

impl From<u8> for FirmwareErrorCode {
    fn from(code: u8) -> Self {
        match code {
            ERR_CODE_UNSUPPORTED_CMD => FirmwareErrorCode::UnsupportedCommand,
            ERR_CODE_NOT_FOUND => FirmwareErrorCode::NotFound,
            ERR_CODE_TABLE_FULL => FirmwareErrorCode::TableFull,
            ERR_CODE_BAD_STATE => FirmwareErrorCode::BadState,
            ERR_CODE_FILE_IO_ERROR => FirmwareErrorCode::FileIoError,
            ERR_CODE_ILLEGAL_ARG => FirmwareErrorCode::IllegalArg,
            other => FirmwareErrorCode::Unknown(other),
        }
    }
}

impl From<FirmwareErrorCode> for u8 {
    fn from(code: FirmwareErrorCode) -> Self {
        match code {
            FirmwareErrorCode::UnsupportedCommand => ERR_CODE_UNSUPPORTED_CMD,
            FirmwareErrorCode::NotFound => ERR_CODE_NOT_FOUND,
            FirmwareErrorCode::TableFull => ERR_CODE_TABLE_FULL,
            FirmwareErrorCode::BadState => ERR_CODE_BAD_STATE,
            FirmwareErrorCode::FileIoError => ERR_CODE_FILE_IO_ERROR,
            FirmwareErrorCode::IllegalArg => ERR_CODE_ILLEGAL_ARG,
            FirmwareErrorCode::Unknown(code) => code,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ProtocolError::too_short(7, 3);
        assert_eq!(
            err.to_string(),
            "frame too short: expected at least 7 bytes, got 3"
        );
        assert_eq!(
            ProtocolError::UnknownResponse(0x7F).to_string(),
            "unknown response code: 0x7F"
        );
    }

    #[test]
    fn test_firmware_error_code_mapping() {
        assert_eq!(FirmwareErrorCode::from(1), FirmwareErrorCode::UnsupportedCommand);
        assert_eq!(FirmwareErrorCode::from(0x42), FirmwareErrorCode::Unknown(0x42));
        assert_eq!(u8::from(FirmwareErrorCode::TableFull), ERR_CODE_TABLE_FULL);
        assert_eq!(FirmwareErrorCode::Unknown(9).to_string(), "unknown error (0x09)");
    }
}
