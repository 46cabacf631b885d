//! Tracker calibration and valuator shaping
//!
//! Calibrators correct raw tracker samples inside the device thread before
//! they reach the shared state. Valuator shaping applies a deadzone and a
//! response exponent to every valuator write at the manager boundary.

#![deny(unsafe_op_in_unsafe_fn)]
#![deny(clippy::unwrap_used)]

pub mod calibrator;
pub mod factory;
pub mod grid;
pub mod shaping;

pub use calibrator::{Calibrator, IdentityCalibrator, TransformCalibrator};
pub use factory::calibrator_from_config;
pub use grid::{GridCalibrator, GridTable};
pub use shaping::ValuatorShaping;
