//! Tracker samples and the microsecond clock that timestamps them.

use std::time::Instant;

use serde::Serialize;

use crate::geometry::{RigidTransform, Vector3};

/// Microseconds since the daemon's clock epoch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct MonotonicMicros(pub u64);

impl MonotonicMicros {
    /// Raw microsecond count.
    pub fn as_micros(self) -> u64 {
        self.0
    }

    /// Seconds elapsed from `earlier` to `self`, zero if `earlier` is later.
    pub fn seconds_since(self, earlier: MonotonicMicros) -> f64 {
        self.0.saturating_sub(earlier.0) as f64 * 1e-6
    }
}

/// Free-running clock shared by all devices of one manager.
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    epoch: Instant,
}

impl MonotonicClock {
    /// Starts a clock at the current instant.
    pub fn new() -> Self {
        Self {
            epoch: Instant::now(),
        }
    }

    /// Current time.
    pub fn now(&self) -> MonotonicMicros {
        self.at(Instant::now())
    }

    /// Time of an arbitrary instant; instants before the epoch map to zero.
    pub fn at(&self, instant: Instant) -> MonotonicMicros {
        let micros = instant.saturating_duration_since(self.epoch).as_micros();
        MonotonicMicros(u64::try_from(micros).unwrap_or(u64::MAX))
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

/// One 6-DOF measurement with derived velocities.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TrackerSample {
    /// Pose in tracking space.
    pub position_orientation: RigidTransform,
    /// Linear velocity in tracking-space units per second.
    pub linear_velocity: Vector3,
    /// Angular velocity as a scaled axis in radians per second.
    pub angular_velocity: Vector3,
    /// Acquisition time.
    pub time_stamp: MonotonicMicros,
}

impl TrackerSample {
    /// A sample at `pose` with zero velocity.
    pub fn at_rest(pose: RigidTransform, time_stamp: MonotonicMicros) -> Self {
        Self {
            position_orientation: pose,
            linear_velocity: Vector3::zeros(),
            angular_velocity: Vector3::zeros(),
            time_stamp,
        }
    }

    /// Position part of the pose.
    pub fn position(&self) -> Vector3 {
        self.position_orientation.translation.vector
    }

    /// Set velocities.
    #[must_use]
    pub fn with_velocity(mut self, linear: Vector3, angular: Vector3) -> Self {
        self.linear_velocity = linear;
        self.angular_velocity = angular;
        self
    }
}

impl Default for TrackerSample {
    fn default() -> Self {
        Self::at_rest(RigidTransform::identity(), MonotonicMicros::default())
    }
}
