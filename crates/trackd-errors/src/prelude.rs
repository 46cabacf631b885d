//! Prelude module for convenient error handling imports.
//!
//! # Example
//!
//! ```
//! use trackd_errors::prelude::*;
//!
//! fn check_port(port: &str) -> Result<()> {
//!     if port.is_empty() {
//!         return Err(ConfigError::missing_key("tracker", "devicePort").into());
//!     }
//!     Ok(())
//! }
//! # assert!(check_port("").is_err());
//! ```

pub use crate::{
    ConfigResult, DeviceResult, ProtocolResult, Result,
    common::{ErrorCategory, ErrorSeverity, TrackdError},
    config::ConfigError,
    device::DeviceError,
    protocol::ProtocolError,
};
