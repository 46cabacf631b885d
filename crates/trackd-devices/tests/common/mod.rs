//! Shared helpers for device integration tests.

#![allow(dead_code)]

use std::time::{Duration, Instant};

use trackd_devices::Device;
use trackd_manager::DeviceManager;

pub const TIMEOUT: Duration = Duration::from_secs(5);

/// Block until the manager has completed at least `target` cycles.
#[track_caller]
pub fn wait_for_generation(manager: &DeviceManager, target: u64) -> u64 {
    let deadline = Instant::now() + TIMEOUT;
    loop {
        let generation = manager.generation();
        if generation >= target {
            return generation;
        }
        assert!(
            Instant::now() < deadline,
            "timed out at generation {generation} waiting for {target}"
        );
        manager.wait_for_update(generation, Duration::from_millis(50));
    }
}

/// Block until the device's polling thread has exited on its own.
#[track_caller]
pub fn wait_until_inactive(device: &dyn Device) {
    let deadline = Instant::now() + TIMEOUT;
    while device.is_active() {
        assert!(Instant::now() < deadline, "device {} still active", device.name());
        std::thread::sleep(Duration::from_millis(5));
    }
}
