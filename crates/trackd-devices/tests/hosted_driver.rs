//! A hosted driver running inside the daemon.

mod common;

use std::sync::Arc;
use std::time::{Duration, Instant};

use common::{TIMEOUT, wait_for_generation};
use parking_lot::Mutex;
use trackd_config::ConfigFile;
use trackd_devices::{
    DeviceDaemon, DeviceRegistry, DriverContext, DriverInput, DriverLayout, DriverLog, DriverProperties,
    DriverSettings, HostedDriver,
};
use trackd_manager::HapticRequest;
use trackd_test_helpers::prelude::*;
use trackd_types::{IndexKind, Rotation, Vector3, rigid_transform};

const CONFIG: &str = r#"
deviceNames: [lighthouse]
lighthouse:
  type: hosted
  driverName: wand
  deviceSerials: [LHR-0001]
  updateRate: 200
  buttonNames: [Trigger]
"#;

#[derive(Debug, Clone, Default)]
struct CallLog {
    calls: Arc<Mutex<Vec<String>>>,
    pulses: Arc<Mutex<Vec<HapticRequest>>>,
}

#[derive(Debug)]
struct WandDriver {
    frame: u32,
    log: CallLog,
}

impl HostedDriver for WandDriver {
    fn init(&mut self, ctx: &mut dyn DriverContext) -> Result<DriverLayout, String> {
        let serials = ctx.device_serials().to_vec();
        for (tracker, serial) in serials.iter().enumerate() {
            ctx.set_property(tracker, "serial", serial.clone());
        }
        ctx.log("wand driver up");
        self.log.calls.lock().push("init".to_string());
        Ok(DriverLayout {
            trackers: serials.len(),
            buttons: 1,
            axes: 1,
            haptic_features: 1,
        })
    }

    fn run_frame(&mut self, ctx: &mut dyn DriverContext) {
        self.frame += 1;
        let x = f64::from(self.frame);
        ctx.report_pose(
            0,
            rigid_transform(Vector3::new(x, 0.0, 0.0), Rotation::identity()),
            Some((Vector3::new(2.0, 0.0, 0.0), Vector3::zeros())),
        );
        ctx.report_button(0, self.frame % 2 == 1);
        ctx.report_axis(0, 0.25);
    }

    fn enter_standby(&mut self) {
        self.log.calls.lock().push("standby".to_string());
    }

    fn leave_standby(&mut self) {
        self.log.calls.lock().push("resume".to_string());
    }

    fn haptic_pulse(&mut self, request: HapticRequest) {
        self.log.pulses.lock().push(request);
    }

    fn cleanup(&mut self) {
        self.log.calls.lock().push("cleanup".to_string());
    }
}

fn registry(log: &CallLog) -> DeviceRegistry {
    let log = log.clone();
    let mut registry = DeviceRegistry::new();
    registry.register_driver("wand", move || {
        Box::new(WandDriver {
            frame: 0,
            log: log.clone(),
        }) as Box<dyn HostedDriver>
    });
    registry
}

#[test]
fn test_driver_reports_reach_manager() -> TestResult {
    let log = CallLog::default();
    let config = ConfigFile::parse("inline", CONFIG)?;
    let mut daemon = DeviceDaemon::from_config(&config, &registry(&log))?;
    let manager = Arc::clone(daemon.manager());
    assert_eq!(manager.tracker_name(0), Some("lighthouse/LHR-0001"));
    assert_eq!(manager.find(IndexKind::Button, "Trigger"), Some(0));

    daemon.start_all()?;
    wait_for_generation(&manager, 2);
    daemon.stop_all()?;

    let state = manager.snapshot();
    let sample = must_some(state.tracker(0), "tracker sample");
    assert!(sample.position().x >= 2.0);
    assert_vec_near(&sample.linear_velocity, &Vector3::new(2.0, 0.0, 0.0), 1e-12);
    assert_eq!(state.valuators, [0.25]);

    drop(daemon);
    assert_eq!(*log.calls.lock(), ["init", "resume", "standby", "cleanup"]);
    Ok(())
}

#[test]
fn test_haptic_pulse_reaches_driver() -> TestResult {
    let log = CallLog::default();
    let config = ConfigFile::parse("inline", CONFIG)?;
    let mut daemon = DeviceDaemon::from_config(&config, &registry(&log))?;
    daemon.start_all()?;

    daemon.manager().haptic_tick(0, 20, 160, 1.5)?;
    let deadline = Instant::now() + TIMEOUT;
    while log.pulses.lock().is_empty() {
        assert!(Instant::now() < deadline, "haptic pulse never reached the driver");
        std::thread::sleep(Duration::from_millis(5));
    }
    daemon.stop_all()?;

    let pulses = log.pulses.lock();
    assert_eq!(
        *pulses,
        [HapticRequest {
            local_index: 0,
            duration_ms: 20,
            frequency: 160,
            amplitude: 1.0,
        }]
    );
    assert_eq!(daemon.manager().stats().haptic_requests, 1);
    Ok(())
}

#[test]
fn test_unknown_driver_rejected() -> TestResult {
    let config = ConfigFile::parse("inline", CONFIG)?;
    let err = DeviceDaemon::from_config(&config, &DeviceRegistry::new()).unwrap_err();
    assert!(err.to_string().contains("wand"), "{err}");
    Ok(())
}
