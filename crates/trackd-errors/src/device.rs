//! Device and transport error types.

use crate::common::ErrorSeverity;

/// Device and transport errors.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DeviceError {
    /// The transport endpoint could not be opened
    #[error("Failed to open {endpoint} for device {device}: {message}")]
    OpenFailed {
        /// Device name
        device: String,
        /// Port path or socket address
        endpoint: String,
        /// Reason
        message: String,
    },

    /// The hardware did not answer the startup status handshake
    #[error("Device {device} did not answer status request within {timeout_ms}ms")]
    HandshakeTimeout {
        /// Device name
        device: String,
        /// Budget in milliseconds
        timeout_ms: u64,
    },

    /// Transport I/O failure during operation
    #[error("I/O error on device {device}: {message}")]
    Io {
        /// Device name
        device: String,
        /// Reason
        message: String,
    },

    /// The transport closed or the hardware vanished
    #[error("Device disconnected: {0}")]
    Disconnected(String),

    /// The polling thread could not be spawned
    #[error("Failed to spawn polling thread for device {device}: {message}")]
    ThreadSpawn {
        /// Device name
        device: String,
        /// Reason
        message: String,
    },

    /// The polling thread panicked
    #[error("Polling thread of device {0} panicked")]
    ThreadPanicked(String),

    /// A hosted third-party driver reported a failure
    #[error("Driver error on device {device}: {message}")]
    Driver {
        /// Device name
        device: String,
        /// Reason
        message: String,
    },

    /// A consumer request referenced an index that does not exist
    #[error("Invalid {kind} index {index}")]
    InvalidIndex {
        /// Namespace
        kind: &'static str,
        /// Requested index
        index: usize,
    },

    /// The device does not implement the requested feature
    #[error("Feature '{feature}' not supported by device {device}")]
    FeatureNotSupported {
        /// Device name
        device: String,
        /// Feature name
        feature: String,
    },
}

impl DeviceError {
    /// Get the error severity.
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            DeviceError::OpenFailed { .. } => ErrorSeverity::Critical,
            DeviceError::HandshakeTimeout { .. } => ErrorSeverity::Critical,
            DeviceError::ThreadSpawn { .. } => ErrorSeverity::Critical,
            DeviceError::Io { .. } => ErrorSeverity::Warning,
            DeviceError::Disconnected(_) => ErrorSeverity::Error,
            DeviceError::ThreadPanicked(_) => ErrorSeverity::Error,
            DeviceError::Driver { .. } => ErrorSeverity::Error,
            DeviceError::InvalidIndex { .. } => ErrorSeverity::Warning,
            DeviceError::FeatureNotSupported { .. } => ErrorSeverity::Info,
        }
    }

    /// Whether this error aborts daemon startup.
    pub fn is_fatal(&self) -> bool {
        self.severity() == ErrorSeverity::Critical
    }

    /// Whether the device is gone and its trackers must be disabled.
    pub fn is_disconnect(&self) -> bool {
        matches!(
            self,
            DeviceError::Disconnected(_) | DeviceError::ThreadPanicked(_)
        )
    }

    /// Create a disconnected error.
    pub fn disconnected(device: impl Into<String>) -> Self {
        DeviceError::Disconnected(device.into())
    }

    /// Create a handshake timeout error.
    pub fn handshake_timeout(device: impl Into<String>, timeout_ms: u64) -> Self {
        DeviceError::HandshakeTimeout {
            device: device.into(),
            timeout_ms,
        }
    }

    /// Create an open failure.
    pub fn open_failed(
        device: impl Into<String>,
        endpoint: impl Into<String>,
        message: impl ToString,
    ) -> Self {
        DeviceError::OpenFailed {
            device: device.into(),
            endpoint: endpoint.into(),
            message: message.to_string(),
        }
    }

    /// Wrap an I/O error raised while talking to a device.
    ///
    /// Broken pipes and end-of-file mean the other side is gone and map to
    /// [`DeviceError::Disconnected`].
    pub fn io(device: impl Into<String>, err: &std::io::Error) -> Self {
        use std::io::ErrorKind;
        let device = device.into();
        match err.kind() {
            ErrorKind::BrokenPipe
            | ErrorKind::UnexpectedEof
            | ErrorKind::NotConnected
            | ErrorKind::ConnectionReset
            | ErrorKind::NotFound => DeviceError::Disconnected(device),
            _ => DeviceError::Io {
                device,
                message: err.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_startup_failures_are_fatal() {
        assert!(DeviceError::handshake_timeout("tracker", 10_000).is_fatal());
        assert!(DeviceError::open_failed("tracker", "/dev/ttyS0", "busy").is_fatal());
        assert!(!DeviceError::disconnected("tracker").is_fatal());
    }

    #[test]
    fn test_io_mapping() {
        let eof = std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "eof");
        assert!(DeviceError::io("joy", &eof).is_disconnect());

        let other = std::io::Error::other("framing");
        let err = DeviceError::io("joy", &other);
        assert!(!err.is_disconnect());
        assert_eq!(err.severity(), ErrorSeverity::Warning);
    }

    #[test]
    fn test_device_error_is_std_error() {
        let err = DeviceError::disconnected("wand");
        let _: &dyn std::error::Error = &err;
    }
}
