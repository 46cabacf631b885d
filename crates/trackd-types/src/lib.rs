//! Data model shared by trackd devices, the device manager and consumers.
//!
//! - [`geometry`]: rigid transforms and Euler angle conversion
//! - [`sample`]: [`TrackerSample`] and the monotonic microsecond clock
//! - [`state`]: the aggregated [`DeviceState`] snapshot and [`TrackerMask`]
//! - [`virtual_device`]: [`VirtualDeviceDescriptor`]

#![deny(unsafe_op_in_unsafe_fn)]
#![deny(clippy::unwrap_used)]

pub mod geometry;
pub mod index;
pub mod sample;
pub mod state;
pub mod virtual_device;

pub use geometry::*;
pub use index::IndexKind;
pub use sample::{MonotonicClock, MonotonicMicros, TrackerSample};
pub use state::{DeviceState, TrackerMask};
pub use virtual_device::{TrackType, VirtualDeviceDescriptor};
