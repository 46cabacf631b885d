//! Loading complete configuration files from disk.

use std::io::Write;

use trackd_config::{ConfigFile, VirtualDeviceConfig};
use trackd_errors::ConfigError;

type TestResult = Result<(), Box<dyn std::error::Error>>;

const SAMPLE: &str = r#"
deviceNames: [tracker, joystick]
virtualDeviceNames: [Wand]
cycleTimeoutMs: 500

tracker:
  type: stationTracker
  devicePort: /dev/ttyS0
  deviceBaudRate: 115200
  stationNames: [Head, Wand]
  trackerPostTransformation1:
    translation: [0.0, 0.0, -2.5]
    rotation: { axis: [1, 0, 0], angle: 90 }

joystick:
  type: joystick
  devicePort: /dev/input/js0
  valuatorThreshold: 0.1

Wand:
  trackType: direction
  tracker: 1
  buttons: [0, 1]
"#;

#[test]
fn test_load_from_disk() -> TestResult {
    let mut file = tempfile::NamedTempFile::new()?;
    file.write_all(SAMPLE.as_bytes())?;

    let config = ConfigFile::load(file.path())?;
    let daemon = config.daemon()?;
    assert_eq!(daemon.device_names, vec!["tracker", "joystick"]);
    assert_eq!(daemon.virtual_device_names, vec!["Wand"]);

    let tracker = config.section("tracker")?;
    assert_eq!(tracker.name(), "tracker");
    assert!(tracker.indexed_transform("trackerPostTransformation", 0)?.is_none());
    let post = tracker
        .indexed_transform("trackerPostTransformation", 1)?
        .ok_or("missing transform")?;
    assert!((post.translation.vector.z + 2.5).abs() < 1e-12);

    let wand = VirtualDeviceConfig::from_section(&config.section("Wand")?)?;
    assert_eq!(wand.buttons.len(), 2);
    Ok(())
}

#[test]
fn test_missing_file_is_load_error() {
    let err = ConfigFile::load("/nonexistent/trackd.yaml").unwrap_err();
    assert!(matches!(err, ConfigError::Load { .. }));
}

#[test]
fn test_invalid_yaml_message() {
    let err = ConfigFile::parse("broken.yaml", "deviceNames: [a\n").unwrap_err();
    assert!(err.to_string().starts_with("Failed to load configuration 'broken.yaml'"));
}

#[test]
fn test_invalid_value_message() -> TestResult {
    let config = ConfigFile::parse("inline", "deviceNames: [t]\nt:\n  numTrackers: many\n")?;
    let err = config.section("t")?.require::<usize>("numTrackers").unwrap_err();
    let msg = err.to_string();
    insta::assert_snapshot!(msg.split(':').next().unwrap_or_default(), @"Invalid value for 'numTrackers' in section 't'");
    Ok(())
}
