//! YAML configuration for trackd.
//!
//! A configuration file lists devices under `deviceNames` and holds one
//! mapping per device. Devices read their settings through [`ConfigSection`],
//! whose lookups report missing or malformed keys with the section name.
//!
//! ```
//! use trackd_config::ConfigFile;
//!
//! let file = ConfigFile::parse(
//!     "inline",
//!     "deviceNames: [sim]\nsim:\n  type: simulated\n  numTrackers: 1\n",
//! )?;
//! let sim = file.section("sim")?;
//! assert_eq!(sim.get_or("numButtons", 0usize)?, 0);
//! assert_eq!(sim.require::<usize>("numTrackers")?, 1);
//! # Ok::<(), trackd_errors::ConfigError>(())
//! ```

#![deny(unsafe_op_in_unsafe_fn, clippy::unwrap_used)]

pub mod file;
pub mod section;
pub mod transform;
pub mod virtual_device;

pub use file::{ConfigFile, DaemonConfig};
pub use section::ConfigSection;
pub use transform::{RotationConfig, TransformConfig};
pub use virtual_device::{IndexRef, VirtualDeviceConfig};
