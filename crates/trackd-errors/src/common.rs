//! Top-level error type and classification shared by every trackd crate.

use core::fmt;

use crate::{ConfigError, DeviceError, ProtocolError};

/// Top-level error type wrapping all trackd sub-errors.
#[derive(Debug, thiserror::Error)]
pub enum TrackdError {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Device and transport errors
    #[error("Device error: {0}")]
    Device(#[from] DeviceError),

    /// Wire protocol errors
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[source] std::io::Error),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl TrackdError {
    /// Get the error category for classification.
    pub fn category(&self) -> ErrorCategory {
        match self {
            TrackdError::Config(_) => ErrorCategory::Config,
            TrackdError::Device(_) => ErrorCategory::Device,
            TrackdError::Protocol(_) => ErrorCategory::Protocol,
            TrackdError::Io(_) => ErrorCategory::IO,
            TrackdError::Other(_) => ErrorCategory::Other,
        }
    }

    /// Get the error severity level.
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            TrackdError::Config(e) => e.severity(),
            TrackdError::Device(e) => e.severity(),
            TrackdError::Protocol(e) => e.severity(),
            TrackdError::Io(_) => ErrorSeverity::Error,
            TrackdError::Other(_) => ErrorSeverity::Error,
        }
    }

    /// Whether this error must abort daemon startup.
    pub fn is_fatal(&self) -> bool {
        match self {
            TrackdError::Config(_) => true,
            TrackdError::Device(e) => e.is_fatal(),
            TrackdError::Protocol(_) => false,
            TrackdError::Io(_) | TrackdError::Other(_) => true,
        }
    }

    /// Check if this error is recoverable.
    pub fn is_recoverable(&self) -> bool {
        self.severity() < ErrorSeverity::Critical
    }

    /// Create a generic error with a message.
    pub fn other(msg: impl Into<String>) -> Self {
        TrackdError::Other(msg.into())
    }
}

impl From<std::io::Error> for TrackdError {
    fn from(e: std::io::Error) -> Self {
        TrackdError::Io(e)
    }
}

/// Error category for classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ErrorCategory {
    /// Configuration errors
    Config = 0,
    /// Device and transport errors
    Device = 1,
    /// Wire protocol errors
    Protocol = 2,
    /// I/O errors
    IO = 3,
    /// Other errors
    Other = 255,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCategory::Config => write!(f, "Config"),
            ErrorCategory::Device => write!(f, "Device"),
            ErrorCategory::Protocol => write!(f, "Protocol"),
            ErrorCategory::IO => write!(f, "IO"),
            ErrorCategory::Other => write!(f, "Other"),
        }
    }
}

/// Error severity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum ErrorSeverity {
    /// Informational, no action required
    Info = 0,
    /// Warning, may require attention
    Warning = 1,
    /// Error, operation failed
    Error = 2,
    /// Critical, the daemon cannot continue
    Critical = 3,
}

impl fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorSeverity::Info => write!(f, "INFO"),
            ErrorSeverity::Warning => write!(f, "WARN"),
            ErrorSeverity::Error => write!(f, "ERROR"),
            ErrorSeverity::Critical => write!(f, "CRITICAL"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_category_display() {
        assert_eq!(ErrorCategory::Config.to_string(), "Config");
        assert_eq!(ErrorCategory::Device.to_string(), "Device");
        assert_eq!(ErrorCategory::Protocol.to_string(), "Protocol");
    }

    #[test]
    fn test_error_severity_ordering() {
        assert!(ErrorSeverity::Critical > ErrorSeverity::Error);
        assert!(ErrorSeverity::Error > ErrorSeverity::Warning);
        assert!(ErrorSeverity::Warning > ErrorSeverity::Info);
    }

    #[test]
    fn test_config_errors_are_fatal() {
        let err: TrackdError = ConfigError::missing_key("tracker", "devicePort").into();
        assert_eq!(err.category(), ErrorCategory::Config);
        assert!(err.is_fatal());
    }

    #[test]
    fn test_protocol_errors_are_not_fatal() {
        let err: TrackdError = ProtocolError::UnknownStation(b'#').into();
        assert!(!err.is_fatal());
        assert!(err.is_recoverable());
    }
}
