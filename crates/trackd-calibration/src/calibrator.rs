//! Calibrator trait and the simple calibrators.

use std::fmt;

use trackd_types::{RigidTransform, TrackerSample};

/// Correction applied to raw samples before publication.
///
/// Calibrators are immutable after construction and run inside the owning
/// device thread.
pub trait Calibrator: Send + Sync + fmt::Debug {
    /// Type tag, as used in `calibratorType`.
    fn kind(&self) -> &'static str;

    /// Correct one sample from the device-local tracker `local_index`.
    fn apply(&self, local_index: usize, raw: TrackerSample) -> TrackerSample;
}

/// Returns samples unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityCalibrator;

impl Calibrator for IdentityCalibrator {
    fn kind(&self) -> &'static str {
        "identity"
    }

    fn apply(&self, _local_index: usize, raw: TrackerSample) -> TrackerSample {
        raw
    }
}

/// Maps device tracking space into world space with one rigid transform.
///
/// Velocities are rotated into the new frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransformCalibrator {
    transform: RigidTransform,
}

impl TransformCalibrator {
    pub fn new(transform: RigidTransform) -> Self {
        Self { transform }
    }

    pub fn transform(&self) -> &RigidTransform {
        &self.transform
    }
}

impl Calibrator for TransformCalibrator {
    fn kind(&self) -> &'static str {
        "transform"
    }

    fn apply(&self, _local_index: usize, raw: TrackerSample) -> TrackerSample {
        let rotation = self.transform.rotation;
        TrackerSample {
            position_orientation: self.transform * raw.position_orientation,
            linear_velocity: rotation * raw.linear_velocity,
            angular_velocity: rotation * raw.angular_velocity,
            time_stamp: raw.time_stamp,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trackd_types::{MonotonicMicros, Vector3, rigid_transform, rotation_from_axis_angle};

    fn sample_at(x: f64, y: f64, z: f64) -> TrackerSample {
        TrackerSample::at_rest(
            rigid_transform(Vector3::new(x, y, z), trackd_types::Rotation::identity()),
            MonotonicMicros(42),
        )
    }

    #[test]
    fn test_identity() {
        let raw = sample_at(1.0, 2.0, 3.0);
        assert_eq!(IdentityCalibrator.apply(0, raw), raw);
    }

    #[test]
    fn test_transform_moves_and_rotates() {
        let calib = TransformCalibrator::new(rigid_transform(
            Vector3::new(0.0, 0.0, 10.0),
            rotation_from_axis_angle(Vector3::z(), 90.0),
        ));
        let raw = sample_at(1.0, 0.0, 0.0).with_velocity(Vector3::x(), Vector3::zeros());
        let out = calib.apply(3, raw);
        assert!((out.position() - Vector3::new(0.0, 1.0, 10.0)).norm() < 1e-12);
        assert!((out.linear_velocity - Vector3::y()).norm() < 1e-12);
        assert_eq!(out.time_stamp, MonotonicMicros(42));
        assert_eq!(calib.kind(), "transform");
    }
}
