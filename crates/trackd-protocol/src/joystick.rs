//! Linux joystick (`/dev/input/js*`) events.

use trackd_errors::{ProtocolError, ProtocolResult};

use crate::report::ReportParser;

/// Size of one `js_event`.
pub const EVENT_LEN: usize = 8;

const TYPE_BUTTON: u8 = 0x01;
const TYPE_AXIS: u8 = 0x02;
const TYPE_INIT: u8 = 0x80;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum JoystickInput {
    Button { number: u8, pressed: bool },
    /// Axis value scaled to `[-1, 1]`.
    Axis { number: u8, value: f32 },
}

/// One decoded event.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JoystickEvent {
    /// Driver timestamp in milliseconds.
    pub time_ms: u32,
    /// Synthetic event reporting the initial state.
    pub initial: bool,
    pub input: Option<JoystickInput>,
}

impl JoystickEvent {
    /// # Errors
    ///
    /// Returns [`ProtocolError::Truncated`] for fewer than 8 bytes.
    pub fn decode(bytes: &[u8]) -> ProtocolResult<Self> {
        if bytes.len() < EVENT_LEN {
            return Err(ProtocolError::Truncated {
                expected: EVENT_LEN,
                actual: bytes.len(),
            });
        }
        let mut parser = ReportParser::new(bytes);
        let time_ms = parser.read_u32_le()?;
        let value = parser.read_i16_le()?;
        let kind = parser.read_u8()?;
        let number = parser.read_u8()?;
        let input = match kind & !TYPE_INIT {
            TYPE_BUTTON => Some(JoystickInput::Button {
                number,
                pressed: value != 0,
            }),
            TYPE_AXIS => Some(JoystickInput::Axis {
                number,
                value: (f32::from(value) / 32767.0).clamp(-1.0, 1.0),
            }),
            _ => None,
        };
        Ok(Self {
            time_ms,
            initial: kind & TYPE_INIT != 0,
            input,
        })
    }

    /// Decode every complete event in `bytes`; returns events and bytes used.
    pub fn decode_all(bytes: &[u8]) -> (Vec<JoystickEvent>, usize) {
        let events: Vec<_> = bytes
            .chunks_exact(EVENT_LEN)
            .filter_map(|chunk| Self::decode(chunk).ok())
            .collect();
        let used = bytes.len() - bytes.len() % EVENT_LEN;
        (events, used)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(time: u32, value: i16, kind: u8, number: u8) -> [u8; 8] {
        let mut out = [0u8; 8];
        out[..4].copy_from_slice(&time.to_le_bytes());
        out[4..6].copy_from_slice(&value.to_le_bytes());
        out[6] = kind;
        out[7] = number;
        out
    }

    #[test]
    fn test_button_and_axis() -> ProtocolResult<()> {
        let b = JoystickEvent::decode(&event(10, 1, TYPE_BUTTON, 3))?;
        assert_eq!(b.input, Some(JoystickInput::Button { number: 3, pressed: true }));
        assert!(!b.initial);

        let a = JoystickEvent::decode(&event(11, -32767, TYPE_AXIS | TYPE_INIT, 1))?;
        assert_eq!(a.input, Some(JoystickInput::Axis { number: 1, value: -1.0 }));
        assert!(a.initial);
        Ok(())
    }

    #[test]
    fn test_axis_min_clamped() -> ProtocolResult<()> {
        let a = JoystickEvent::decode(&event(0, i16::MIN, TYPE_AXIS, 0))?;
        assert_eq!(a.input, Some(JoystickInput::Axis { number: 0, value: -1.0 }));
        Ok(())
    }

    #[test]
    fn test_decode_all_keeps_partial_tail() {
        let mut bytes = event(1, 1, TYPE_BUTTON, 0).to_vec();
        bytes.extend_from_slice(&event(2, 0, TYPE_BUTTON, 0));
        bytes.extend_from_slice(&[1, 2, 3]);
        let (events, used) = JoystickEvent::decode_all(&bytes);
        assert_eq!(events.len(), 2);
        assert_eq!(used, 16);
    }

    #[test]
    fn test_unknown_type_ignored() -> ProtocolResult<()> {
        let e = JoystickEvent::decode(&event(0, 0, 0x04, 0))?;
        assert_eq!(e.input, None);
        Ok(())
    }
}
