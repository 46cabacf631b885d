//! Wire protocol error types.
//!
//! These never leave a device thread: the decoder drops the offending record
//! and resynchronizes.

use crate::common::ErrorSeverity;

/// Wire decoding errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolError {
    /// Not enough bytes for the expected structure
    #[error("Truncated record: expected {expected} bytes, got {actual}")]
    Truncated {
        /// Required length
        expected: usize,
        /// Available length
        actual: usize,
    },

    /// Read past the end of a record buffer
    #[error("Unexpected end of data")]
    UnexpectedEnd,

    /// Header bytes did not match the record format
    #[error("Invalid record header")]
    InvalidHeader,

    /// The station id byte is not a valid station character
    #[error("Unknown station id byte {0:#04x}")]
    UnknownStation(u8),

    /// A decoded value is not finite
    #[error("Non-finite value in field '{0}'")]
    NonFinite(&'static str),
}

impl ProtocolError {
    /// Protocol errors are informational: the record is dropped.
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            ProtocolError::Truncated { .. } | ProtocolError::UnexpectedEnd => {
                ErrorSeverity::Warning
            }
            _ => ErrorSeverity::Info,
        }
    }
}
