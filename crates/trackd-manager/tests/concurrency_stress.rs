//! Concurrent writers on disjoint index ranges.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam::sync::WaitGroup;
use proptest::prelude::*;
use trackd_manager::{DeviceId, DeviceManager, DeviceManagerBuilder};
use trackd_types::{MonotonicMicros, RigidTransform, TrackerSample};

type TestResult = Result<(), Box<dyn std::error::Error>>;

const ITERATIONS: usize = 10_000;
const TRACKERS_PER_DEVICE: usize = 3;
const BUTTONS_PER_DEVICE: usize = 4;

struct Layout {
    manager: Arc<DeviceManager>,
    devices: Vec<(DeviceId, Vec<usize>, Vec<usize>, usize)>,
}

fn layout(num_devices: usize) -> Result<Layout, Box<dyn std::error::Error>> {
    let mut builder = DeviceManagerBuilder::new();
    let mut devices = Vec::new();
    for d in 0..num_devices {
        let id = builder.register_device(format!("dev{d}"));
        let trackers = (0..TRACKERS_PER_DEVICE)
            .map(|t| builder.add_tracker(id, format!("dev{d}/t{t}")))
            .collect();
        let buttons = (0..BUTTONS_PER_DEVICE)
            .map(|b| builder.add_button(id, format!("dev{d}/b{b}")))
            .collect();
        let valuator = builder.add_valuator(id, format!("dev{d}/v"));
        devices.push((id, trackers, buttons, valuator));
    }
    Ok(Layout {
        manager: builder.build()?,
        devices,
    })
}

/// Encodes writer identity and iteration in the pose so torn or foreign
/// writes are detectable.
fn tagged_sample(device: usize, iteration: usize) -> TrackerSample {
    TrackerSample::at_rest(
        RigidTransform::translation(device as f64, iteration as f64, 0.0),
        MonotonicMicros(iteration as u64),
    )
}

#[test]
fn test_disjoint_writers_never_corrupt_each_other() -> TestResult {
    let Layout { manager, devices } = layout(2)?;
    let start = WaitGroup::new();

    let handles: Vec<_> = devices
        .iter()
        .cloned()
        .enumerate()
        .map(|(d, (id, trackers, buttons, valuator))| {
            let manager = Arc::clone(&manager);
            let start = start.clone();
            thread::spawn(move || -> Result<(), String> {
                start.wait();
                for i in 0..ITERATIONS {
                    for &t in &trackers {
                        manager
                            .set_tracker_state(t, tagged_sample(d, i))
                            .map_err(|e| e.to_string())?;
                    }
                    for (k, &b) in buttons.iter().enumerate() {
                        manager
                            .set_button_state(b, (i + k + d) % 2 == 0)
                            .map_err(|e| e.to_string())?;
                    }
                    manager
                        .set_valuator_state(valuator, d as f32 * 0.5)
                        .map_err(|e| e.to_string())?;
                    manager.update_state(id);
                }
                Ok(())
            })
        })
        .collect();
    start.wait();

    // concurrent reader checks every observed slot belongs to its owner
    for _ in 0..1_000 {
        let state = manager.lock_state();
        for (d, (_, trackers, _, _)) in devices.iter().enumerate() {
            for &t in trackers {
                if let Some(sample) = state.tracker(t)
                    && state.is_tracker_valid(t)
                {
                    assert_eq!(sample.position().x, d as f64);
                }
            }
        }
    }

    for handle in handles {
        handle.join().map_err(|_| "writer panicked")??;
    }

    let state = manager.snapshot();
    let last = ITERATIONS - 1;
    for (d, (_, trackers, buttons, valuator)) in devices.iter().enumerate() {
        for &t in trackers {
            let sample = state.tracker(t).ok_or("missing tracker")?;
            assert!(state.is_tracker_valid(t));
            assert_eq!(sample.position().x, d as f64);
            assert_eq!(sample.position().y, last as f64);
            assert_eq!(sample.time_stamp, MonotonicMicros(last as u64));
        }
        for (k, &b) in buttons.iter().enumerate() {
            assert_eq!(state.button(b), (last + k + d) % 2 == 0);
        }
        assert_eq!(state.valuator(*valuator), d as f32 * 0.5);
    }

    // interleaving decides how many cycles closed, but never more than the
    // slower writer's updates and never fewer than one
    assert!(state.generation >= 1);
    assert!(state.generation <= ITERATIONS as u64);
    assert_eq!(manager.stats().samples, (2 * ITERATIONS * TRACKERS_PER_DEVICE) as u64);
    Ok(())
}

#[test]
fn test_waiter_observes_monotonic_generations() -> TestResult {
    let Layout { manager, devices } = layout(1)?;
    let (id, ..) = devices.first().cloned().ok_or("no device")?;

    let writer = {
        let manager = Arc::clone(&manager);
        thread::spawn(move || {
            for _ in 0..200 {
                manager.update_state(id);
                thread::sleep(Duration::from_micros(200));
            }
        })
    };

    let mut last = 0;
    while let Some(generation) = manager.wait_for_update(last, Duration::from_millis(500)) {
        assert!(generation > last);
        last = generation;
        if last == 200 {
            break;
        }
    }
    writer.join().map_err(|_| "writer panicked")?;
    assert_eq!(manager.generation(), 200);
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    /// With one tracker per device, a cycle closes exactly when the last
    /// not-yet-reported device calls update_state.
    #[test]
    fn prop_generation_counts_full_rounds(order in prop::collection::vec(0usize..3, 0..64)) {
        let mut builder = DeviceManagerBuilder::new();
        let ids: Vec<_> = (0..3)
            .map(|d| {
                let id = builder.register_device(format!("d{d}"));
                builder.add_tracker(id, format!("t{d}"));
                id
            })
            .collect();
        let manager = builder.build().map_err(|e| TestCaseError::fail(e.to_string()))?;

        let mut reported = [false; 3];
        let mut expected = 0u64;
        for d in order {
            if let (Some(flag), Some(&id)) = (reported.get_mut(d), ids.get(d)) {
                *flag = true;
                let completed = manager.update_state(id);
                let all = reported.iter().all(|r| *r);
                prop_assert_eq!(completed, all);
                if all {
                    expected += 1;
                    reported = [false; 3];
                }
            }
        }
        prop_assert_eq!(manager.generation(), expected);
    }
}
