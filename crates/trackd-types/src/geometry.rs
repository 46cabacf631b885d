//! Geometry aliases over `nalgebra`.

use nalgebra::{Isometry3, Translation3, UnitQuaternion};

/// Scalar type for all pose math.
pub type Scalar = f64;

/// 3-component vector.
pub type Vector3 = nalgebra::Vector3<Scalar>;

/// Point in tracking space.
pub type Point3 = nalgebra::Point3<Scalar>;

/// Unit quaternion rotation.
pub type Rotation = UnitQuaternion<Scalar>;

/// Position + orientation.
pub type RigidTransform = Isometry3<Scalar>;

/// Builds a rigid transform from a translation and a rotation.
pub fn rigid_transform(translation: Vector3, rotation: Rotation) -> RigidTransform {
    Isometry3::from_parts(Translation3::from(translation), rotation)
}

/// Rotation from azimuth/elevation/roll angles in degrees.
///
/// Azimuth turns about Z, elevation about the rotated Y, roll about the
/// rotated X: `R = Rz(azimuth) * Ry(elevation) * Rx(roll)`.
pub fn rotation_from_euler_degrees(azimuth: Scalar, elevation: Scalar, roll: Scalar) -> Rotation {
    UnitQuaternion::from_euler_angles(roll.to_radians(), elevation.to_radians(), azimuth.to_radians())
}

/// Rotation about `axis` by `angle_deg` degrees; identity for a zero axis.
pub fn rotation_from_axis_angle(axis: Vector3, angle_deg: Scalar) -> Rotation {
    match nalgebra::Unit::try_new(axis, Scalar::EPSILON) {
        Some(axis) => UnitQuaternion::from_axis_angle(&axis, angle_deg.to_radians()),
        None => UnitQuaternion::identity(),
    }
}

/// Angular velocity (rad/s, scaled axis) turning `from` into `to` over `dt` seconds.
pub fn angular_velocity(from: &Rotation, to: &Rotation, dt: Scalar) -> Vector3 {
    if dt <= 0.0 {
        return Vector3::zeros();
    }
    let delta = to * from.inverse();
    delta.scaled_axis() / dt
}
