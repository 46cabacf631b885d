//! Station tracker over an in-memory serial line.

mod common;

use common::{wait_for_generation, wait_until_inactive};
use trackd_config::ConfigSection;
use trackd_devices::transport::MockTransport;
use trackd_devices::{Device, StationTracker};
use trackd_manager::DeviceManagerBuilder;
use trackd_protocol::station::command;
use trackd_test_helpers::prelude::*;
use trackd_types::{IndexKind, Vector3};

const CONFIG: &str = r#"
stationNames: [Head, Wand]
Wand:
  numButtons: 2
  joystick: true
"#;

fn station_tracker(
    transport: &MockTransport,
    builder: &mut DeviceManagerBuilder,
) -> Result<trackd_devices::ThreadedDevice<StationTracker>, Box<dyn std::error::Error>> {
    transport.reply_to(&[command::STATUS], &status_reply(b'0'));
    let section = ConfigSection::from_yaml("tracker", CONFIG)?;
    Ok(StationTracker::with_transport(
        "tracker",
        &section,
        builder,
        Box::new(transport.clone()),
    )?)
}

#[test]
fn test_handshake_and_streaming_commands() -> TestResult {
    let transport = MockTransport::new();
    let mut builder = DeviceManagerBuilder::new();
    let mut device = station_tracker(&transport, &mut builder)?;
    let manager = builder.build()?;
    assert_eq!(
        transport.written(),
        [command::CONTINUOUS_OFF, command::STATUS, command::BINARY_OUTPUT]
    );

    device.start(&manager)?;
    device.stop()?;
    assert_eq!(
        transport.written(),
        [
            command::CONTINUOUS_OFF,
            command::STATUS,
            command::BINARY_OUTPUT,
            command::CONTINUOUS_ON,
            command::CONTINUOUS_OFF
        ]
    );
    Ok(())
}

#[test]
fn test_slot_names_follow_stations() -> TestResult {
    let transport = MockTransport::new();
    let mut builder = DeviceManagerBuilder::new();
    let _device = station_tracker(&transport, &mut builder)?;
    let manager = builder.build()?;
    assert_eq!(manager.names(IndexKind::Tracker), ["Head", "Wand"]);
    assert_eq!(manager.names(IndexKind::Button), ["Wand/button0", "Wand/button1"]);
    assert_eq!(manager.names(IndexKind::Valuator), ["Wand/joyX", "Wand/joyY"]);
    Ok(())
}

#[test]
fn test_records_reach_manager() -> TestResult {
    let transport = MockTransport::new();
    let mut builder = DeviceManagerBuilder::new();
    let mut device = station_tracker(&transport, &mut builder)?;
    let manager = builder.build()?;
    device.start(&manager)?;

    transport.inject(b"line noise\r\n");
    transport.inject(&StationRecordFixture::new(b'1', [1.0, 2.0, 3.0]).encode());
    wait_for_generation(&manager, 1);
    transport.inject(
        &StationRecordFixture::new(b'2', [0.5, 0.0, -0.5])
            .buttons(0b10)
            .joystick(255, 0)
            .encode(),
    );
    wait_for_generation(&manager, 2);
    device.stop()?;

    let state = manager.snapshot();
    let head = must_some(state.tracker(0), "head sample");
    assert_vec_near(&head.position(), &Vector3::new(1.0, 2.0, 3.0), 1e-6);
    let wand = must_some(state.tracker(1), "wand sample");
    assert_vec_near(&wand.position(), &Vector3::new(0.5, 0.0, -0.5), 1e-6);
    assert!(state.is_tracker_valid(0) && state.is_tracker_valid(1));
    assert_eq!(state.buttons, [false, true]);
    assert_eq!(state.valuators, [1.0, -1.0]);
    Ok(())
}

#[test]
fn test_resynchronizes_after_corrupted_header() -> TestResult {
    let transport = MockTransport::new();
    let mut builder = DeviceManagerBuilder::new();
    let mut device = station_tracker(&transport, &mut builder)?;
    let manager = builder.build()?;
    device.start(&manager)?;

    transport.inject(&StationRecordFixture::new(b'1', [1.0, 0.0, 0.0]).encode());
    wait_for_generation(&manager, 1);

    let mut corrupted = StationRecordFixture::new(b'1', [9.0, 9.0, 9.0]).encode();
    if let Some(byte) = corrupted.get_mut(2) {
        *byte = b'X';
    }
    transport.inject(&corrupted);
    transport.inject(&StationRecordFixture::new(b'1', [4.0, 0.0, 0.0]).encode());
    let generation = wait_for_generation(&manager, 2);
    device.stop()?;

    assert_eq!(generation, 2);
    let head = must_some(manager.snapshot().tracker(0).copied(), "head sample");
    assert_vec_near(&head.position(), &Vector3::new(4.0, 0.0, 0.0), 1e-6);
    Ok(())
}

#[test]
fn test_disconnect_disables_trackers() -> TestResult {
    let transport = MockTransport::new();
    let mut builder = DeviceManagerBuilder::new();
    let mut device = station_tracker(&transport, &mut builder)?;
    let manager = builder.build()?;
    device.start(&manager)?;

    transport.inject(&StationRecordFixture::new(b'1', [1.0, 0.0, 0.0]).encode());
    wait_for_generation(&manager, 1);
    assert!(manager.snapshot().is_tracker_valid(0));

    transport.disconnect();
    wait_until_inactive(&device);
    let state = manager.snapshot();
    assert!(!state.is_tracker_valid(0));
    assert!(!state.is_tracker_valid(1));
    device.stop()?;
    Ok(())
}

#[test]
fn test_restart_after_disconnect_resumes_streaming() -> TestResult {
    let transport = MockTransport::new();
    let mut builder = DeviceManagerBuilder::new();
    let mut device = station_tracker(&transport, &mut builder)?;
    let manager = builder.build()?;
    device.start(&manager)?;

    transport.inject(&StationRecordFixture::new(b'1', [1.0, 0.0, 0.0]).encode());
    wait_for_generation(&manager, 1);
    transport.disconnect();
    wait_until_inactive(&device);
    assert!(!manager.snapshot().is_tracker_valid(0));

    transport.reconnect();
    device.start(&manager)?;
    assert!(device.is_active());
    transport.inject(&StationRecordFixture::new(b'1', [2.0, 0.0, 0.0]).encode());
    wait_for_generation(&manager, 2);
    device.stop()?;

    let state = manager.snapshot();
    let head = must_some(state.tracker(0), "head");
    assert_vec_near(&head.position(), &Vector3::new(2.0, 0.0, 0.0), 1e-6);
    assert_eq!(
        transport.written().iter().filter(|&&byte| byte == command::CONTINUOUS_ON).count(),
        2
    );
    Ok(())
}

#[test]
fn test_silent_unit_times_out() -> TestResult {
    let transport = MockTransport::new();
    let section = ConfigSection::from_yaml("tracker", "stationNames: [Head]\nstatusTimeout: 0.3\n")?;
    let mut builder = DeviceManagerBuilder::new();
    let err = StationTracker::with_transport("tracker", &section, &mut builder, Box::new(transport))
        .unwrap_err();
    assert!(err.to_string().contains("tracker"), "{err}");
    Ok(())
}
