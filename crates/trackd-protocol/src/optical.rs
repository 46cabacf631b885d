//! UDP optical tracker frames.
//!
//! A datagram holds a frame counter, a body count and one 68-byte block per
//! tracked body: id, quality, position, Euler angles and a redundant 3x3
//! rotation matrix that is skipped. All fields are little-endian.

use trackd_errors::{ProtocolError, ProtocolResult};
use trackd_types::{RigidTransform, Vector3, rigid_transform, rotation_from_euler_degrees};

use crate::report::ReportParser;

/// Frame counter + body count.
pub const FRAME_HEADER_LEN: usize = 8;
/// Bytes per body block.
pub const BODY_LEN: usize = 4 + 4 + 3 * 4 + 3 * 4 + 9 * 4;

/// Control commands understood by the tracker's control port.
pub mod command {
    pub const START: &str = "dtrack 10 3";
    pub const STOP: &str = "dtrack 10 0";
}

/// One tracked body.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OpticalBody {
    pub id: u32,
    /// Negative when the body is not currently tracked.
    pub quality: f32,
    pub position: [f32; 3],
    pub euler: [f32; 3],
}

impl OpticalBody {
    pub fn is_tracked(&self) -> bool {
        self.quality >= 0.0
    }

    pub fn pose(&self) -> RigidTransform {
        let [x, y, z] = self.position.map(f64::from);
        let [az, el, roll] = self.euler.map(f64::from);
        rigid_transform(Vector3::new(x, y, z), rotation_from_euler_degrees(az, el, roll))
    }
}

/// One decoded datagram.
#[derive(Debug, Clone, PartialEq)]
pub struct OpticalFrame {
    pub frame: u32,
    pub bodies: Vec<OpticalBody>,
}

impl OpticalFrame {
    /// # Errors
    ///
    /// Returns [`ProtocolError::Truncated`] if the datagram is shorter than its
    /// body count implies, or [`ProtocolError::NonFinite`] for corrupt values
    /// of a tracked body.
    pub fn decode(datagram: &[u8]) -> ProtocolResult<Self> {
        let mut parser = ReportParser::new(datagram);
        if parser.remaining() < FRAME_HEADER_LEN {
            return Err(ProtocolError::Truncated {
                expected: FRAME_HEADER_LEN,
                actual: datagram.len(),
            });
        }
        let frame = parser.read_u32_le()?;
        let count = usize::try_from(parser.read_u32_le()?).unwrap_or(usize::MAX);
        let expected = count
            .checked_mul(BODY_LEN)
            .and_then(|n| n.checked_add(FRAME_HEADER_LEN))
            .unwrap_or(usize::MAX);
        if datagram.len() < expected {
            return Err(ProtocolError::Truncated {
                expected,
                actual: datagram.len(),
            });
        }

        let mut bodies = Vec::with_capacity(count);
        for _ in 0..count {
            let id = parser.read_u32_le()?;
            let quality = parser.read_f32_le()?;
            let position = [parser.read_f32_le()?, parser.read_f32_le()?, parser.read_f32_le()?];
            let euler = [parser.read_f32_le()?, parser.read_f32_le()?, parser.read_f32_le()?];
            parser.skip(9 * 4)?;
            let body = OpticalBody {
                id,
                quality,
                position,
                euler,
            };
            if body.is_tracked() && !position.iter().chain(&euler).all(|v| v.is_finite()) {
                return Err(ProtocolError::NonFinite("body pose"));
            }
            bodies.push(body);
        }
        Ok(Self { frame, bodies })
    }
}
