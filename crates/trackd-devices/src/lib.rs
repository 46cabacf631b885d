//! Tracking devices for trackd
//!
//! Every device owns a transport, a protocol parser and a polling thread.
//! The thread decodes samples, maps them from device-local to global indices,
//! calibrates tracker poses and writes them into the shared
//! [`DeviceManager`](trackd_manager::DeviceManager), closing one logical cycle
//! at each protocol boundary.
//!
//! - [`transport`]: serial, UDP, event-file and in-memory byte sources
//! - [`core`]: index mapping, calibration and velocity estimation
//! - [`device`]: the [`Device`] contract and [`ThreadedDevice`] runner
//! - [`devices`]: built-in device types
//! - [`registry`] and [`daemon`]: construction from a configuration file
//!
//! ```no_run
//! use trackd_config::ConfigFile;
//! use trackd_devices::{DeviceDaemon, DeviceRegistry};
//!
//! let config = ConfigFile::load("trackd.yaml")?;
//! let mut daemon = DeviceDaemon::from_config(&config, &DeviceRegistry::new())?;
//! daemon.start_all()?;
//! let generation = daemon.manager().generation();
//! daemon.manager().wait_for_update(generation, std::time::Duration::from_secs(1));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![deny(unsafe_op_in_unsafe_fn)]
#![deny(clippy::unwrap_used)]

pub mod core;
pub mod daemon;
pub mod device;
pub mod devices;
pub mod registry;
pub mod transport;
pub mod velocity;

pub use crate::core::{DeviceCore, IndexMap, SlotCounts};
pub use daemon::DeviceDaemon;
pub use device::{Device, DeviceWorker, ThreadedDevice, WorkerContext};
pub use devices::hosted::{
    ChannelHapticSink, DriverContext, DriverInput, DriverLayout, DriverLog, DriverProperties,
    DriverRegistry, DriverSettings, HostedDriver,
};
pub use devices::{HostedDevice, JoystickDevice, OpticalTracker, SimulatedDevice, StationTracker};
pub use registry::{DeviceFactory, DeviceRegistry, DeviceSpec};
pub use transport::{DatagramSource, Transport};
pub use velocity::VelocityEstimator;
