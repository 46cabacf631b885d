//! Rigid transform configuration values.

use serde::{Deserialize, Serialize};
use trackd_types::{
    RigidTransform, Rotation, Vector3, rigid_transform, rotation_from_axis_angle,
    rotation_from_euler_degrees,
};

/// `{ translation: [x, y, z], rotation: ... }`; both parts default to identity.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TransformConfig {
    #[serde(default)]
    pub translation: [f64; 3],
    #[serde(default)]
    pub rotation: Option<RotationConfig>,
}

/// Rotation as axis + angle (degrees) or azimuth/elevation/roll (degrees).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RotationConfig {
    AxisAngle { axis: [f64; 3], angle: f64 },
    Euler { euler: [f64; 3] },
}

impl RotationConfig {
    pub fn to_rotation(&self) -> Rotation {
        match self {
            RotationConfig::AxisAngle { axis, angle } => {
                rotation_from_axis_angle(Vector3::from(*axis), *angle)
            }
            RotationConfig::Euler { euler: [az, el, roll] } => {
                rotation_from_euler_degrees(*az, *el, *roll)
            }
        }
    }
}

impl TransformConfig {
    pub fn to_transform(&self) -> RigidTransform {
        let rotation = self
            .rotation
            .as_ref()
            .map_or_else(Rotation::identity, RotationConfig::to_rotation);
        rigid_transform(Vector3::from(self.translation), rotation)
    }
}
