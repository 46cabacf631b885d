//! Device manager for trackd
//!
//! The manager merges the per-device index spaces of every configured device
//! into flat global namespaces for trackers, buttons, valuators and haptic
//! features, and owns the [`DeviceState`](trackd_types::DeviceState) that
//! device threads write and consumers read.
//!
//! Setup happens in two phases. During startup a [`DeviceManagerBuilder`]
//! registers devices and allocates indices; [`DeviceManagerBuilder::build`]
//! freezes the layout into an `Arc<DeviceManager>`, after which no index can
//! be added. Device threads then write slots and call
//! [`DeviceManager::update_state`] at their cycle boundaries.
//!
//! ```
//! use trackd_manager::DeviceManagerBuilder;
//! use trackd_types::{RigidTransform, TrackerSample};
//!
//! let mut builder = DeviceManagerBuilder::new();
//! let wand = builder.register_device("wand");
//! let tracker = builder.add_tracker(wand, "Wand");
//! let trigger = builder.add_button(wand, "Trigger");
//! let manager = builder.build()?;
//!
//! let sample = TrackerSample::at_rest(RigidTransform::identity(), manager.now());
//! manager.set_tracker_state(tracker, sample)?;
//! manager.set_button_state(trigger, true)?;
//! manager.update_state(wand);
//!
//! let state = manager.lock_state();
//! assert_eq!(state.generation, 1);
//! assert!(state.button(trigger));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![deny(unsafe_op_in_unsafe_fn)]
#![deny(clippy::unwrap_used)]

pub mod builder;
pub mod haptic;
pub mod manager;
pub mod namespace;
pub mod stats;

pub use builder::DeviceManagerBuilder;
pub use haptic::{HapticRequest, HapticSink};
pub use manager::{DeviceManager, StateGuard, UpdateCallback};
pub use namespace::{Namespace, Slot};
pub use stats::ManagerStats;

/// Handle of a registered device, assigned in registration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeviceId(pub usize);

impl std::fmt::Display for DeviceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}
