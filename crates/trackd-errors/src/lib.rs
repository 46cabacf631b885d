//! Centralized error types for trackd
//!
//! The daemon distinguishes three classes of failure:
//!
//! - [`config`]: configuration problems detected at startup (missing keys,
//!   index collisions, unknown device types). Always fatal.
//! - [`device`]: transport and hardware failures. Failing to open a port or a
//!   status handshake that times out is fatal at startup; a device that
//!   disconnects mid-run only takes its own trackers offline.
//! - [`protocol`]: malformed or unsynchronized wire data. Always recovered
//!   inside the device thread and never surfaced to consumers.
//!
//! [`TrackdError`] wraps all of them for code that crosses those boundaries.
//!
//! # Example
//!
//! ```
//! use trackd_errors::prelude::*;
//!
//! fn require_port(port: Option<&str>) -> Result<String> {
//!     port.map(str::to_owned)
//!         .ok_or_else(|| ConfigError::missing_key("tracker", "devicePort").into())
//! }
//!
//! let err = require_port(None).unwrap_err();
//! assert!(err.is_fatal());
//! ```

#![deny(unsafe_op_in_unsafe_fn, clippy::unwrap_used)]
#![warn(missing_docs, rust_2018_idioms)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod common;
pub mod config;
pub mod device;
pub mod prelude;
pub mod protocol;

pub use common::{ErrorCategory, ErrorSeverity, TrackdError};
pub use config::ConfigError;
pub use device::DeviceError;
pub use protocol::ProtocolError;

/// A specialized `Result` type for trackd operations.
pub type Result<T> = std::result::Result<T, TrackdError>;

/// Result alias for configuration handling.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result alias for device operations.
pub type DeviceResult<T = ()> = std::result::Result<T, DeviceError>;

/// Result alias for wire decoding.
pub type ProtocolResult<T> = std::result::Result<T, ProtocolError>;
