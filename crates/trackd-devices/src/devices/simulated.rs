//! Synthetic device for tests and demos.
//!
//! With a `frames` list the device plays the frames once (or forever with
//! `loop: true`) at `updateRate` Hz, then idles. Without frames it moves its
//! trackers on horizontal circles and toggles its buttons once a second.
//!
//! ```yaml
//! sim:
//!   type: simulated
//!   numTrackers: 1
//!   numButtons: 2
//!   updateRate: 100
//!   frames:
//!     - poses: [{ translation: [0, 1, 0] }]
//!       buttons: [true, false]
//!     - poses: [null]
//! ```
//!
//! A `null` pose marks the tracker invalid for that frame.

use std::f64::consts::TAU;
use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, info};
use trackd_config::{ConfigSection, TransformConfig};
use trackd_errors::{ConfigResult, DeviceResult};
use trackd_manager::{DeviceManager, DeviceManagerBuilder};
use trackd_types::{MonotonicMicros, Vector3, rigid_transform, rotation_from_axis_angle};

use crate::core::{DeviceCore, SlotCounts};
use crate::device::{DeviceWorker, ThreadedDevice, WorkerContext};

pub const DEFAULT_UPDATE_RATE: f64 = 60.0;
/// Radius of the procedural circle in meters.
const CIRCLE_RADIUS: f64 = 0.3;
/// Seconds per procedural revolution.
const CIRCLE_PERIOD: f64 = 4.0;

/// One scripted frame. Missing trailing entries leave their slots unchanged.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SimulatedFrame {
    #[serde(default)]
    pub poses: Vec<Option<TransformConfig>>,
    #[serde(default)]
    pub buttons: Vec<bool>,
    #[serde(default)]
    pub valuators: Vec<f32>,
}

#[derive(Debug, Clone, PartialEq)]
enum Script {
    Frames { frames: Vec<SimulatedFrame>, repeat: bool, next: usize },
    Circle,
}

/// Polling half of the simulated device.
#[derive(Debug)]
pub struct SimulatedDevice {
    core: DeviceCore,
    script: Script,
    period: Duration,
    started: Option<MonotonicMicros>,
}

impl SimulatedDevice {
    /// # Errors
    ///
    /// Returns an error for malformed frames or frames that address more
    /// slots than the device owns.
    pub fn from_config(
        name: &str,
        section: &ConfigSection,
        builder: &mut DeviceManagerBuilder,
    ) -> ConfigResult<ThreadedDevice<Self>> {
        let counts = SlotCounts::from_config(
            section,
            SlotCounts {
                trackers: 1,
                ..SlotCounts::default()
            },
        )?;
        let rate: f64 = section.get_or("updateRate", DEFAULT_UPDATE_RATE)?;
        if !(rate.is_finite() && rate > 0.0) {
            return Err(section.invalid("updateRate", format!("{rate} is not a positive rate")));
        }

        let script = match section.get::<Vec<SimulatedFrame>>("frames")? {
            Some(frames) => {
                validate_frames(section, &frames, counts)?;
                Script::Frames {
                    frames,
                    repeat: section.get_or("loop", false)?,
                    next: 0,
                }
            }
            None => Script::Circle,
        };

        let core = DeviceCore::from_config(name, section, builder, counts, &DeviceCore::generic_names(name))?;
        info!(device = name, rate, scripted = matches!(script, Script::Frames { .. }), "Simulated device ready");
        Ok(ThreadedDevice::new(Self {
            core,
            script,
            period: Duration::from_secs_f64(1.0 / rate),
            started: None,
        }))
    }

    fn play(core: &mut DeviceCore, manager: &DeviceManager, frame: &SimulatedFrame) -> DeviceResult {
        let now = manager.now();
        for (local, pose) in frame.poses.iter().enumerate() {
            match pose {
                Some(pose) => core.publish_pose(manager, local, pose.to_transform(), now)?,
                None => core.disable_tracker(manager, local)?,
            }
        }
        for (local, &pressed) in frame.buttons.iter().enumerate() {
            core.publish_button(manager, local, pressed)?;
        }
        for (local, &value) in frame.valuators.iter().enumerate() {
            core.publish_valuator(manager, local, value)?;
        }
        core.update(manager);
        Ok(())
    }

    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn circle(&mut self, manager: &DeviceManager) -> DeviceResult {
        let now = manager.now();
        let started = *self.started.get_or_insert(now);
        let t = now.seconds_since(started);
        let counts = self.core.index_map().counts();

        for local in 0..counts.trackers {
            let phase = TAU * (t / CIRCLE_PERIOD + local as f64 / counts.trackers as f64);
            let position = Vector3::new(CIRCLE_RADIUS * phase.cos(), 1.5, CIRCLE_RADIUS * phase.sin());
            let heading = rotation_from_axis_angle(Vector3::y(), -phase.to_degrees());
            self.core
                .publish_pose(manager, local, rigid_transform(position, heading), now)?;
        }
        let second = t as u64;
        for local in 0..counts.buttons {
            self.core
                .publish_button(manager, local, (second + local as u64) % 2 == 0)?;
        }
        for local in 0..counts.valuators {
            let value = (TAU * t / CIRCLE_PERIOD + local as f64).sin() as f32;
            self.core.publish_valuator(manager, local, value)?;
        }
        self.core.update(manager);
        Ok(())
    }
}

fn validate_frames(section: &ConfigSection, frames: &[SimulatedFrame], counts: SlotCounts) -> ConfigResult<()> {
    for (i, frame) in frames.iter().enumerate() {
        let overflow = [
            ("poses", frame.poses.len(), counts.trackers),
            ("buttons", frame.buttons.len(), counts.buttons),
            ("valuators", frame.valuators.len(), counts.valuators),
        ]
        .into_iter()
        .find(|&(_, used, owned)| used > owned);
        if let Some((field, used, owned)) = overflow {
            return Err(section.invalid(
                "frames",
                format!("frame {i} sets {used} {field} but the device has {owned}"),
            ));
        }
    }
    Ok(())
}

impl DeviceWorker for SimulatedDevice {
    fn core(&self) -> &DeviceCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut DeviceCore {
        &mut self.core
    }

    fn begin(&mut self, _ctx: &WorkerContext<'_>) -> DeviceResult {
        self.started = None;
        if let Script::Frames { next, .. } = &mut self.script {
            *next = 0;
        }
        Ok(())
    }

    fn step(&mut self, ctx: &WorkerContext<'_>) -> DeviceResult {
        match &mut self.script {
            Script::Frames { frames, repeat, next } => {
                if *next >= frames.len() && *repeat {
                    *next = 0;
                }
                let Some(frame) = frames.get(*next) else {
                    ctx.sleep(self.period);
                    return Ok(());
                };
                Self::play(&mut self.core, ctx.manager, frame)?;
                *next += 1;
                if *next == frames.len() && !*repeat {
                    debug!(frames = frames.len(), "Script finished");
                }
            }
            Script::Circle => self.circle(ctx.manager)?,
        }
        ctx.sleep(self.period);
        Ok(())
    }
}
