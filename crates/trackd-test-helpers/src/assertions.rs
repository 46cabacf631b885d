//! Float and pose assertions.

use trackd_types::{RigidTransform, Vector3};

/// Assert that two floating-point values are within `tolerance`.
///
/// ```rust
/// use trackd_test_helpers::assert_approx_eq;
///
/// assert_approx_eq!(1.0_f64, 1.0001, 0.001);
/// ```
#[macro_export]
macro_rules! assert_approx_eq {
    ($left:expr, $right:expr, $tolerance:expr $(,)?) => {
        let left = $left;
        let right = $right;
        let tolerance = $tolerance;
        let diff = (left - right).abs();
        if diff > tolerance {
            panic!(
                "assertion failed: `(left ≈ right)`\n  left: `{:?}`,\n right: `{:?}`,\n  diff: `{:?}`,\n  tolerance: `{:?}`",
                left, right, diff, tolerance
            );
        }
    };
}

/// Assert that `actual` is within `tolerance` of `expected` in every
/// component.
///
/// # Panics
///
/// Panics if any component differs by more than `tolerance`.
#[track_caller]
pub fn assert_vec_near(actual: &Vector3, expected: &Vector3, tolerance: f64) {
    let diff = (actual - expected).abs().max();
    assert!(
        diff <= tolerance,
        "vectors differ by {diff}: actual {actual:?}, expected {expected:?}"
    );
}

/// Assert that two poses agree in translation (meters) and rotation
/// (radians) within `tolerance`.
///
/// # Panics
///
/// Panics if the translations or rotations differ by more than `tolerance`.
#[track_caller]
pub fn assert_pose_near(actual: &RigidTransform, expected: &RigidTransform, tolerance: f64) {
    assert_vec_near(&actual.translation.vector, &expected.translation.vector, tolerance);
    let angle = actual.rotation.angle_to(&expected.rotation);
    assert!(
        angle <= tolerance,
        "rotations differ by {angle} rad: actual {:?}, expected {:?}",
        actual.rotation,
        expected.rotation
    );
}
