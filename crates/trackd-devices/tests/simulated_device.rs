//! End-to-end runs of scripted simulated devices through the daemon.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::wait_for_generation;
use parking_lot::Mutex;
use trackd_config::ConfigFile;
use trackd_devices::{DeviceDaemon, DeviceRegistry};
use trackd_manager::DeviceManagerBuilder;
use trackd_test_helpers::assert_approx_eq;
use trackd_test_helpers::prelude::*;
use trackd_types::{DeviceState, Vector3};

const SCRIPT: &str = r#"
deviceNames: [sim]
sim:
  type: simulated
  numTrackers: 1
  numButtons: 2
  updateRate: 100
  frames:
    - poses: [{ translation: [0, 1, 0] }]
      buttons: [true, false]
    - poses: [{ translation: [0.5, 1, 0] }]
      buttons: [false, true]
    - poses: [{ translation: [1, 1, 0], rotation: { axis: [0, 1, 0], angle: 90 } }]
      buttons: [true, true]
"#;

fn recording_builder() -> (DeviceManagerBuilder, Arc<Mutex<Vec<DeviceState>>>) {
    let states = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&states);
    let builder = DeviceManagerBuilder::new().on_update(move |state| sink.lock().push(state.clone()));
    (builder, states)
}

#[test]
fn test_scripted_frames_reach_generation_three() -> TestResult {
    let config = ConfigFile::parse("inline", SCRIPT)?;
    let mut daemon = DeviceDaemon::from_config(&config, &DeviceRegistry::new())?;
    daemon.start_all()?;
    wait_for_generation(daemon.manager(), 3);
    // the script has ended; no further cycles
    std::thread::sleep(Duration::from_millis(100));
    daemon.stop_all()?;

    let state = daemon.manager().snapshot();
    assert_eq!(state.generation, 3);
    assert_eq!(state.buttons, [true, true]);
    let sample = must_some(state.tracker(0), "tracker sample");
    assert_vec_near(&sample.position(), &Vector3::new(1.0, 1.0, 0.0), 1e-9);
    let forward = sample.position_orientation.rotation * Vector3::x();
    assert_vec_near(&forward, &Vector3::new(0.0, 0.0, -1.0), 1e-9);
    Ok(())
}

#[test]
fn test_velocity_from_consecutive_frames() -> TestResult {
    let config = ConfigFile::parse("inline", SCRIPT)?;
    let (builder, states) = recording_builder();
    let mut daemon = DeviceDaemon::with_builder(&config, &DeviceRegistry::new(), builder)?;
    daemon.start_all()?;
    wait_for_generation(daemon.manager(), 2);
    daemon.stop_all()?;

    let states = states.lock();
    let first = must_some(states.first().and_then(|s| s.tracker(0)), "first sample");
    let second = must_some(states.get(1).and_then(|s| s.tracker(0)), "second sample");
    assert_vec_near(&first.linear_velocity, &Vector3::zeros(), 1e-12);

    let dt = second.time_stamp.seconds_since(first.time_stamp);
    assert!(dt > 0.0);
    let expected = (second.position() - first.position()) / dt;
    assert_vec_near(&second.linear_velocity, &expected, 1e-9);
    assert_approx_eq!(second.linear_velocity.x, 0.5 / dt, 1e-9);
    Ok(())
}

#[test]
fn test_null_pose_invalidates_tracker() -> TestResult {
    let config = ConfigFile::parse(
        "inline",
        r#"
deviceNames: [sim]
sim:
  type: simulated
  updateRate: 100
  frames:
    - poses: [{ translation: [0, 0, 0] }]
    - poses: [null]
"#,
    )?;
    let (builder, states) = recording_builder();
    let mut daemon = DeviceDaemon::with_builder(&config, &DeviceRegistry::new(), builder)?;
    daemon.start_all()?;
    wait_for_generation(daemon.manager(), 2);
    daemon.stop_all()?;

    let states = states.lock();
    assert_eq!(
        states.iter().map(|s| s.is_tracker_valid(0)).collect::<Vec<_>>(),
        [true, false]
    );
    Ok(())
}

#[test]
fn test_two_devices_complete_cycles_together() -> TestResult {
    let config = ConfigFile::parse(
        "inline",
        r#"
deviceNames: [fast, slow]
fast:
  type: simulated
  updateRate: 200
slow:
  type: simulated
  updateRate: 20
"#,
    )?;
    let (builder, states) = recording_builder();
    let mut daemon = DeviceDaemon::with_builder(&config, &DeviceRegistry::new(), builder)?;
    daemon.start_all()?;
    wait_for_generation(daemon.manager(), 3);
    daemon.stop_all()?;

    // a cycle closes only once both devices have reported
    let stats = daemon.manager().stats();
    assert!(stats.samples >= 2 * stats.cycles);
    assert_eq!(stats.forced_cycles, 0);
    assert!(states.lock().iter().all(|s| s.is_tracker_valid(0) && s.is_tracker_valid(1)));
    Ok(())
}
