//! Wire encoders for test input.
//!
//! These build byte streams the way the hardware sends them, without going
//! through the crate's own report builders.

/// One record of the RS-232 station tracker.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StationRecordFixture {
    /// Station id character, `'1'`..`'9'`, `'A'`..`'Z'` or `'a'`..`'z'`.
    pub station: u8,
    pub position: [f32; 3],
    /// Azimuth, elevation, roll in degrees.
    pub euler: [f32; 3],
    pub buttons: u8,
    pub joystick: Option<[u8; 2]>,
}

impl StationRecordFixture {
    pub fn new(station: u8, position: [f32; 3]) -> Self {
        Self {
            station,
            position,
            euler: [0.0; 3],
            buttons: 0,
            joystick: None,
        }
    }

    #[must_use]
    pub fn euler(mut self, euler: [f32; 3]) -> Self {
        self.euler = euler;
        self
    }

    #[must_use]
    pub fn buttons(mut self, buttons: u8) -> Self {
        self.buttons = buttons;
        self
    }

    #[must_use]
    pub fn joystick(mut self, x: u8, y: u8) -> Self {
        self.joystick = Some([x, y]);
        self
    }

    /// `CR LF '0' <station> <mode>` followed by six little-endian floats,
    /// the button byte and the optional joystick bytes.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = vec![b'\r', b'\n', b'0', self.station, b' '];
        for value in self.position.iter().chain(&self.euler) {
            out.extend_from_slice(&value.to_le_bytes());
        }
        out.push(self.buttons);
        if let Some(axes) = self.joystick {
            out.extend_from_slice(&axes);
        }
        out
    }
}

/// Reply to the status request of station `station` (`b'0'` for the unit).
pub fn status_reply(station: u8) -> Vec<u8> {
    let mut out = vec![b'2', station, b'S'];
    out.extend_from_slice(b"00000000000000\r\n");
    out
}

/// One body of an optical tracker frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OpticalBodyFixture {
    pub id: u32,
    /// Negative for an untracked body.
    pub quality: f32,
    pub position: [f32; 3],
    pub euler: [f32; 3],
}

impl OpticalBodyFixture {
    pub fn tracked(id: u32, position: [f32; 3]) -> Self {
        Self {
            id,
            quality: 1.0,
            position,
            euler: [0.0; 3],
        }
    }

    pub fn lost(id: u32) -> Self {
        Self {
            id,
            quality: -1.0,
            position: [0.0; 3],
            euler: [0.0; 3],
        }
    }
}

/// One optical tracker datagram. The rotation matrix is filled with the
/// identity.
pub fn optical_frame(frame: u32, bodies: &[OpticalBodyFixture]) -> Vec<u8> {
    const IDENTITY: [f32; 9] = [1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0];
    let mut out = Vec::with_capacity(8 + bodies.len() * 68);
    out.extend_from_slice(&frame.to_le_bytes());
    out.extend_from_slice(&u32::try_from(bodies.len()).unwrap_or(u32::MAX).to_le_bytes());
    for body in bodies {
        out.extend_from_slice(&body.id.to_le_bytes());
        out.extend_from_slice(&body.quality.to_le_bytes());
        for value in body.position.iter().chain(&body.euler).chain(&IDENTITY) {
            out.extend_from_slice(&value.to_le_bytes());
        }
    }
    out
}

/// Linux `js_event`: button (`kind` 0x01) or axis (0x02), optionally or-ed
/// with the initial-state flag 0x80.
pub fn joystick_event(time_ms: u32, value: i16, kind: u8, number: u8) -> [u8; 8] {
    let mut out = [0u8; 8];
    let (time, rest) = out.split_at_mut(4);
    time.copy_from_slice(&time_ms.to_ne_bytes());
    let (val, rest) = rest.split_at_mut(2);
    val.copy_from_slice(&value.to_ne_bytes());
    if let [k, n] = rest {
        *k = kind;
        *n = number;
    }
    out
}
