//! Configuration error types.
//!
//! Every configuration error is detected while the daemon starts and aborts
//! startup. Errors carry the section name so the offending part of the
//! configuration file can be located.

use crate::common::ErrorSeverity;

/// Configuration errors.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    /// A required key is absent
    #[error("Missing configuration key '{key}' in section '{section}'")]
    MissingKey {
        /// Section name
        section: String,
        /// Key name
        key: String,
    },

    /// A key is present but its value cannot be used
    #[error("Invalid value for '{key}' in section '{section}': {message}")]
    InvalidValue {
        /// Section name
        section: String,
        /// Key name
        key: String,
        /// Reason
        message: String,
    },

    /// A referenced section does not exist
    #[error("Missing configuration section '{0}'")]
    MissingSection(String),

    /// The device type tag is not registered
    #[error("Unknown device type '{type_name}' for device '{device}'")]
    UnknownDeviceType {
        /// Device section name
        device: String,
        /// Requested type tag
        type_name: String,
    },

    /// The calibrator type is not known
    #[error("Unknown calibrator type '{0}'")]
    UnknownCalibrator(String),

    /// The hosted driver name is not registered
    #[error("Unknown hosted driver '{0}'")]
    UnknownDriver(String),

    /// Two devices claim the same global slot
    #[error("{kind} index {index} claimed by '{claimant}' is already owned by '{owner}'")]
    IndexCollision {
        /// Namespace ("tracker", "button", "valuator", "haptic feature")
        kind: &'static str,
        /// Global index
        index: usize,
        /// Device already owning the slot
        owner: String,
        /// Device attempting the claim
        claimant: String,
    },

    /// A reference points outside an allocated namespace
    #[error("{kind} index {index} referenced by '{context}' is out of range (0..{len})")]
    IndexOutOfRange {
        /// Namespace
        kind: &'static str,
        /// Referenced index
        index: usize,
        /// Namespace size
        len: usize,
        /// Referencing entity
        context: String,
    },

    /// A reference by name could not be resolved
    #[error("Unknown {kind} name '{name}' referenced by '{context}'")]
    UnknownName {
        /// Namespace
        kind: &'static str,
        /// Unresolved name
        name: String,
        /// Referencing entity
        context: String,
    },

    /// The configuration source could not be read or parsed
    #[error("Failed to load configuration '{path}': {message}")]
    Load {
        /// File path or source description
        path: String,
        /// Reason
        message: String,
    },
}

impl ConfigError {
    /// Configuration errors always stop startup.
    pub fn severity(&self) -> ErrorSeverity {
        ErrorSeverity::Critical
    }

    /// Create a missing key error.
    pub fn missing_key(section: impl Into<String>, key: impl Into<String>) -> Self {
        ConfigError::MissingKey {
            section: section.into(),
            key: key.into(),
        }
    }

    /// Create an invalid value error.
    pub fn invalid_value(
        section: impl Into<String>,
        key: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        ConfigError::InvalidValue {
            section: section.into(),
            key: key.into(),
            message: message.into(),
        }
    }

    /// Create an out-of-range reference error.
    pub fn out_of_range(
        kind: &'static str,
        index: usize,
        len: usize,
        context: impl Into<String>,
    ) -> Self {
        ConfigError::IndexOutOfRange {
            kind,
            index,
            len,
            context: context.into(),
        }
    }

    /// Section name, when the error is tied to one.
    pub fn section(&self) -> Option<&str> {
        match self {
            ConfigError::MissingKey { section, .. } | ConfigError::InvalidValue { section, .. } => {
                Some(section)
            }
            ConfigError::MissingSection(section) => Some(section),
            ConfigError::UnknownDeviceType { device, .. } => Some(device),
            _ => None,
        }
    }
}
