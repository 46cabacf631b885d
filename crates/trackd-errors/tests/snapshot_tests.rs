//! Snapshot tests for error message formatting.
//!
//! Operators read these messages in the daemon log when startup fails, so
//! their wording is pinned.

use trackd_errors::{ConfigError, DeviceError, ProtocolError, TrackdError};

mod config_error_snapshots {
    use super::*;
    use insta::assert_snapshot;

    #[test]
    fn test_missing_key() {
        assert_snapshot!(
            ConfigError::missing_key("tracker", "devicePort").to_string(),
            @"Missing configuration key 'devicePort' in section 'tracker'"
        );
    }

    #[test]
    fn test_index_collision() {
        let err = ConfigError::IndexCollision {
            kind: "button",
            index: 4,
            owner: "wand".into(),
            claimant: "joystick".into(),
        };
        assert_snapshot!(
            err.to_string(),
            @"button index 4 claimed by 'joystick' is already owned by 'wand'"
        );
    }

    #[test]
    fn test_out_of_range() {
        assert_snapshot!(
            ConfigError::out_of_range("tracker", 7, 3, "Wand").to_string(),
            @"tracker index 7 referenced by 'Wand' is out of range (0..3)"
        );
    }

    #[test]
    fn test_unknown_device_type() {
        let err = ConfigError::UnknownDeviceType {
            device: "tracker".into(),
            type_name: "Flock".into(),
        };
        assert_snapshot!(
            err.to_string(),
            @"Unknown device type 'Flock' for device 'tracker'"
        );
    }
}

mod device_error_snapshots {
    use super::*;
    use insta::assert_snapshot;

    #[test]
    fn test_handshake_timeout() {
        assert_snapshot!(
            DeviceError::handshake_timeout("tracker", 10000).to_string(),
            @"Device tracker did not answer status request within 10000ms"
        );
    }

    #[test]
    fn test_disconnected() {
        assert_snapshot!(
            DeviceError::disconnected("joystick").to_string(),
            @"Device disconnected: joystick"
        );
    }
}

mod wrapped_snapshots {
    use super::*;
    use insta::assert_snapshot;

    #[test]
    fn test_wrapped_protocol_error() {
        let err: TrackdError = ProtocolError::Truncated {
            expected: 47,
            actual: 12,
        }
        .into();
        assert_snapshot!(
            err.to_string(),
            @"Protocol error: Truncated record: expected 47 bytes, got 12"
        );
    }
}
