//! Multi-station serial tracker protocol.
//!
//! Every record starts with `CR LF '0' <station> <mode>`, followed by three
//! position floats, three Euler angle floats (azimuth, elevation, roll in
//! degrees) and a status byte holding the button bits. Stations with a
//! joystick append two axis bytes.

use trackd_errors::{ProtocolError, ProtocolResult};
use trackd_types::{RigidTransform, Vector3, rigid_transform, rotation_from_euler_degrees};

use crate::header::{HeaderElement, HeaderPattern};
use crate::report::ReportParser;
use crate::sync::RecordFormat;

/// Bytes in `CR LF '0' <station> <mode>`.
pub const HEADER_LEN: usize = 5;
/// Header + 6 floats + status byte.
pub const RECORD_LEN: usize = HEADER_LEN + 6 * 4 + 1;
/// Record length for stations reporting a joystick.
pub const JOYSTICK_RECORD_LEN: usize = RECORD_LEN + 2;
/// Highest number of stations addressable by one station character.
pub const MAX_STATIONS: usize = 9 + 26 + 26;

/// Host commands.
pub mod command {
    /// Ctrl-Y: reset the unit.
    pub const RESET: u8 = 0x19;
    /// Request a status line.
    pub const STATUS: u8 = b'S';
    /// Switch record output to binary.
    pub const BINARY_OUTPUT: u8 = b'f';
    /// Start streaming records.
    pub const CONTINUOUS_ON: u8 = b'C';
    /// Stop streaming records.
    pub const CONTINUOUS_OFF: u8 = b'c';
}

/// Map a station id character to a 0-based station index.
pub fn station_index(byte: u8) -> Option<usize> {
    match byte {
        b'1'..=b'9' => Some(usize::from(byte - b'1')),
        b'A'..=b'Z' => Some(9 + usize::from(byte - b'A')),
        b'a'..=b'z' => Some(35 + usize::from(byte - b'a')),
        _ => None,
    }
}

/// Inverse of [`station_index`].
pub fn station_char(index: usize) -> Option<u8> {
    let offset = |base: u8, i: usize| u8::try_from(i).ok().map(|i| base + i);
    match index {
        0..=8 => offset(b'1', index),
        9..=34 => offset(b'A', index - 9),
        35..=60 => offset(b'a', index - 35),
        _ => None,
    }
}

/// Record framing for a set of stations.
#[derive(Debug, Clone)]
pub struct StationFormat {
    header: HeaderPattern,
    joystick: [bool; MAX_STATIONS],
}

impl StationFormat {
    /// `joystick_stations` lists the station indices that append joystick bytes.
    pub fn new(joystick_stations: impl IntoIterator<Item = usize>) -> Self {
        let mut joystick = [false; MAX_STATIONS];
        for index in joystick_stations {
            if let Some(slot) = joystick.get_mut(index) {
                *slot = true;
            }
        }
        Self {
            header: Self::header_pattern(),
            joystick,
        }
    }

    pub fn header_pattern() -> HeaderPattern {
        HeaderPattern::new([
            HeaderElement::Literal(b'\r'),
            HeaderElement::Literal(b'\n'),
            HeaderElement::Literal(b'0'),
            HeaderElement::StationId,
            HeaderElement::Any,
        ])
    }

    pub fn has_joystick(&self, station: usize) -> bool {
        self.joystick.get(station).copied().unwrap_or(false)
    }
}

impl RecordFormat for StationFormat {
    fn header(&self) -> &HeaderPattern {
        &self.header
    }

    fn record_len(&self, header: &[u8]) -> Option<usize> {
        let station = station_index(*header.get(3)?)?;
        Some(if self.has_joystick(station) {
            JOYSTICK_RECORD_LEN
        } else {
            RECORD_LEN
        })
    }
}

/// One decoded station record.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StationRecord {
    pub station: usize,
    pub mode: u8,
    pub position: [f32; 3],
    /// Azimuth, elevation, roll in degrees.
    pub euler: [f32; 3],
    pub status: u8,
    pub joystick: Option<[u8; 2]>,
}

impl StationRecord {
    /// Decode a complete record whose header has already been validated.
    ///
    /// # Errors
    ///
    /// Returns an error for a short record, a bad station byte or
    /// non-finite values.
    pub fn decode(record: &[u8]) -> ProtocolResult<Self> {
        if record.len() < RECORD_LEN {
            return Err(ProtocolError::Truncated {
                expected: RECORD_LEN,
                actual: record.len(),
            });
        }
        let mut parser = ReportParser::new(record);
        parser.skip(3)?;
        let station_byte = parser.read_u8()?;
        let station =
            station_index(station_byte).ok_or(ProtocolError::UnknownStation(station_byte))?;
        let mode = parser.read_u8()?;
        let position = parser.read_vec3_finite("position")?;
        let euler = parser.read_vec3_finite("orientation")?;
        let status = parser.read_u8()?;
        let joystick = if parser.remaining() >= 2 {
            Some([parser.read_u8()?, parser.read_u8()?])
        } else {
            None
        };
        Ok(Self {
            station,
            mode,
            position,
            euler,
            status,
            joystick,
        })
    }

    pub fn pose(&self) -> RigidTransform {
        let [x, y, z] = self.position.map(f64::from);
        let [az, el, roll] = self.euler.map(f64::from);
        rigid_transform(Vector3::new(x, y, z), rotation_from_euler_degrees(az, el, roll))
    }

    /// Button `bit` of the status byte.
    pub fn button(&self, bit: usize) -> bool {
        bit < 8 && self.status & (1 << bit) != 0
    }

    /// Joystick axes scaled to `[-1, 1]`.
    pub fn joystick_axes(&self) -> Option<[f32; 2]> {
        self.joystick
            .map(|axes| axes.map(|v| (f32::from(v) - 127.5) / 127.5))
    }
}

/// Watches the byte stream for a status reply line `2<station>S...\r\n`.
#[derive(Debug, Clone, Default)]
pub struct StatusReplyScanner {
    line: Vec<u8>,
}

impl StatusReplyScanner {
    const MAX_LINE: usize = 256;

    pub fn new() -> Self {
        Self::default()
    }

    /// Feed received bytes; returns the status line once one is complete.
    pub fn feed(&mut self, bytes: &[u8]) -> Option<Vec<u8>> {
        for &byte in bytes {
            if byte == b'\n' || byte == b'\r' {
                if Self::is_status_line(&self.line) {
                    return Some(std::mem::take(&mut self.line));
                }
                self.line.clear();
            } else if self.line.len() < Self::MAX_LINE {
                self.line.push(byte);
            }
        }
        None
    }

    fn is_status_line(line: &[u8]) -> bool {
        matches!(line, [b'2', station, b'S', ..] if *station == b'0' || station_index(*station).is_some())
    }
}
