//! Finite-difference velocity estimation.

use trackd_types::{MonotonicMicros, RigidTransform, Vector3, angular_velocity};

#[derive(Debug, Clone, Copy)]
struct Previous {
    pose: RigidTransform,
    time_stamp: MonotonicMicros,
}

/// Per-tracker velocity estimate from consecutive poses.
///
/// The first pose after construction or [`VelocityEstimator::reset`] yields
/// zero velocities.
#[derive(Debug, Clone, Default)]
pub struct VelocityEstimator {
    previous: Vec<Option<Previous>>,
}

impl VelocityEstimator {
    pub fn new(num_trackers: usize) -> Self {
        Self {
            previous: vec![None; num_trackers],
        }
    }

    /// Forget all previous poses.
    pub fn reset(&mut self) {
        self.previous.iter_mut().for_each(|p| *p = None);
    }

    /// Forget the previous pose of one tracker.
    pub fn reset_one(&mut self, tracker: usize) {
        if let Some(slot) = self.previous.get_mut(tracker) {
            *slot = None;
        }
    }

    /// Linear and angular velocity of `tracker` moving to `pose` at `time_stamp`.
    pub fn estimate(
        &mut self,
        tracker: usize,
        pose: &RigidTransform,
        time_stamp: MonotonicMicros,
    ) -> (Vector3, Vector3) {
        let Some(slot) = self.previous.get_mut(tracker) else {
            return (Vector3::zeros(), Vector3::zeros());
        };
        let velocities = match slot {
            Some(prev) => {
                let dt = time_stamp.seconds_since(prev.time_stamp);
                if dt > 0.0 {
                    (
                        (pose.translation.vector - prev.pose.translation.vector) / dt,
                        angular_velocity(&prev.pose.rotation, &pose.rotation, dt),
                    )
                } else {
                    (Vector3::zeros(), Vector3::zeros())
                }
            }
            None => (Vector3::zeros(), Vector3::zeros()),
        };
        *slot = Some(Previous {
            pose: *pose,
            time_stamp,
        });
        velocities
    }
}

#[cfg(test)]
mod tests {
    use trackd_types::rotation_from_axis_angle;

    use super::*;

    #[test]
    fn test_first_sample_is_at_rest() {
        let mut estimator = VelocityEstimator::new(1);
        let (linear, angular) =
            estimator.estimate(0, &RigidTransform::translation(1.0, 2.0, 3.0), MonotonicMicros(5));
        assert_eq!(linear, Vector3::zeros());
        assert_eq!(angular, Vector3::zeros());
    }

    #[test]
    fn test_linear_and_angular_velocity() {
        let mut estimator = VelocityEstimator::new(2);
        estimator.estimate(1, &RigidTransform::identity(), MonotonicMicros(1_000_000));
        let moved = RigidTransform::from_parts(
            Vector3::new(0.5, 0.0, -1.0).into(),
            rotation_from_axis_angle(Vector3::z(), 90.0),
        );
        let (linear, angular) = estimator.estimate(1, &moved, MonotonicMicros(1_500_000));
        assert!((linear - Vector3::new(1.0, 0.0, -2.0)).norm() < 1e-9);
        assert!((angular - Vector3::new(0.0, 0.0, std::f64::consts::PI)).norm() < 1e-9);
    }

    #[test]
    fn test_reset_and_bounds() {
        let mut estimator = VelocityEstimator::new(1);
        estimator.estimate(0, &RigidTransform::identity(), MonotonicMicros(0));
        estimator.reset();
        let (linear, _) =
            estimator.estimate(0, &RigidTransform::translation(9.0, 0.0, 0.0), MonotonicMicros(10));
        assert_eq!(linear, Vector3::zeros());
        let (linear, _) = estimator.estimate(4, &RigidTransform::identity(), MonotonicMicros(10));
        assert_eq!(linear, Vector3::zeros());
    }
}
