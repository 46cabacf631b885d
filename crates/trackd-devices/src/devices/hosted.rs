//! Adapter running a third-party tracking driver inside the daemon.
//!
//! A [`HostedDriver`] is stepped at `updateRate` Hz on the device thread. It
//! reports through a [`DriverContext`], which the host implements as a set
//! of small capability traits; reported poses, buttons and axes are buffered
//! during the frame and published afterwards as one cycle.
//!
//! ```yaml
//! lighthouse:
//!   type: hosted
//!   driverName: lighthouse
//!   deviceSerials: [LHR-0001, LHR-0002]
//!   updateRate: 90
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crossbeam::channel::{Receiver, Sender, TrySendError};
use tracing::{debug, info, trace, warn};
use trackd_config::ConfigSection;
use trackd_errors::{ConfigError, ConfigResult, DeviceError, DeviceResult};
use trackd_manager::{DeviceManagerBuilder, HapticRequest, HapticSink};
use trackd_types::{IndexKind, RigidTransform, TrackerSample, Vector3};

use crate::core::{DeviceCore, SlotCounts};
use crate::device::{DeviceWorker, ThreadedDevice, WorkerContext};

pub const DEFAULT_UPDATE_RATE: f64 = 90.0;
/// Haptic requests queued for the driver thread before new ones are dropped.
const HAPTIC_QUEUE: usize = 64;

/// Read access to the device's configuration section.
pub trait DriverSettings {
    fn setting_str(&self, key: &str) -> Option<String>;
    fn setting_f64(&self, key: &str) -> Option<f64>;
    fn setting_bool(&self, key: &str) -> Option<bool>;
    /// Serial numbers listed in `deviceSerials`.
    fn device_serials(&self) -> &[String];
}

/// Per-tracker string properties, e.g. model number or firmware version.
pub trait DriverProperties {
    fn set_property(&mut self, tracker: usize, key: &str, value: String);
    fn property(&self, tracker: usize, key: &str) -> Option<&str>;
}

/// Input reports. Indices are local to the device.
pub trait DriverInput {
    /// Report a pose; with `velocity` the driver's own linear and angular
    /// velocity is used instead of a finite-difference estimate.
    fn report_pose(&mut self, tracker: usize, pose: RigidTransform, velocity: Option<(Vector3, Vector3)>);
    fn report_tracking_lost(&mut self, tracker: usize);
    fn report_button(&mut self, button: usize, pressed: bool);
    fn report_axis(&mut self, axis: usize, value: f32);
}

pub trait DriverLog {
    fn log(&self, message: &str);
}

/// Everything the host offers a driver.
pub trait DriverContext: DriverSettings + DriverProperties + DriverInput + DriverLog {}

impl<T: DriverSettings + DriverProperties + DriverInput + DriverLog> DriverContext for T {}

/// Slots a driver reports on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DriverLayout {
    pub trackers: usize,
    pub buttons: usize,
    pub axes: usize,
    pub haptic_features: usize,
}

impl From<DriverLayout> for SlotCounts {
    fn from(layout: DriverLayout) -> Self {
        SlotCounts {
            trackers: layout.trackers,
            buttons: layout.buttons,
            valuators: layout.axes,
            haptic_features: layout.haptic_features,
        }
    }
}

/// A third-party tracking driver.
pub trait HostedDriver: Send {
    /// Bring the driver up and describe its slots. Runs during startup.
    ///
    /// # Errors
    ///
    /// Returns a message if the driver cannot be initialized.
    fn init(&mut self, ctx: &mut dyn DriverContext) -> Result<DriverLayout, String>;

    /// Advance one frame, reporting new input through `ctx`.
    fn run_frame(&mut self, ctx: &mut dyn DriverContext);

    fn enter_standby(&mut self) {}

    fn leave_standby(&mut self) {}

    /// `request.local_index` is the driver's haptic feature number.
    fn haptic_pulse(&mut self, _request: HapticRequest) {}

    /// Release driver resources. Called once when the device is dropped.
    fn cleanup(&mut self) {}
}

/// Creates driver instances by name.
pub type DriverFactory = Arc<dyn Fn() -> Box<dyn HostedDriver> + Send + Sync>;

/// Named hosted driver factories.
#[derive(Clone, Default)]
pub struct DriverRegistry {
    factories: HashMap<String, DriverFactory>,
}

impl fmt::Debug for DriverRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.factories.keys().collect();
        names.sort();
        f.debug_struct("DriverRegistry").field("drivers", &names).finish()
    }
}

impl DriverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `factory` under `name`, replacing an earlier registration.
    pub fn register<F>(&mut self, name: impl Into<String>, factory: F)
    where
        F: Fn() -> Box<dyn HostedDriver> + Send + Sync + 'static,
    {
        let name = name.into();
        if self.factories.insert(name.clone(), Arc::new(factory)).is_some() {
            debug!(driver = %name, "Replaced hosted driver factory");
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownDriver`] if `name` is not registered.
    pub fn create(&self, name: &str) -> ConfigResult<Box<dyn HostedDriver>> {
        self.factories
            .get(name)
            .map(|factory| factory())
            .ok_or_else(|| ConfigError::UnknownDriver(name.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq)]
enum DriverEvent {
    Pose {
        tracker: usize,
        pose: RigidTransform,
        velocity: Option<(Vector3, Vector3)>,
    },
    TrackingLost(usize),
    Button(usize, bool),
    Axis(usize, f32),
}

/// Host side of the driver interface.
#[derive(Debug)]
pub struct DriverHost {
    device: String,
    settings: ConfigSection,
    serials: Vec<String>,
    properties: HashMap<(usize, String), String>,
    events: Vec<DriverEvent>,
}

impl DriverHost {
    fn new(device: &str, settings: ConfigSection, serials: Vec<String>) -> Self {
        Self {
            device: device.to_string(),
            settings,
            serials,
            properties: HashMap::new(),
            events: Vec::new(),
        }
    }
}

impl DriverSettings for DriverHost {
    fn setting_str(&self, key: &str) -> Option<String> {
        self.settings.get(key).ok().flatten()
    }

    fn setting_f64(&self, key: &str) -> Option<f64> {
        self.settings.get(key).ok().flatten()
    }

    fn setting_bool(&self, key: &str) -> Option<bool> {
        self.settings.get(key).ok().flatten()
    }

    fn device_serials(&self) -> &[String] {
        &self.serials
    }
}

impl DriverProperties for DriverHost {
    fn set_property(&mut self, tracker: usize, key: &str, value: String) {
        trace!(tracker, key, %value, "Driver property");
        self.properties.insert((tracker, key.to_string()), value);
    }

    fn property(&self, tracker: usize, key: &str) -> Option<&str> {
        self.properties
            .get(&(tracker, key.to_string()))
            .map(String::as_str)
    }
}

impl DriverInput for DriverHost {
    fn report_pose(&mut self, tracker: usize, pose: RigidTransform, velocity: Option<(Vector3, Vector3)>) {
        self.events.push(DriverEvent::Pose {
            tracker,
            pose,
            velocity,
        });
    }

    fn report_tracking_lost(&mut self, tracker: usize) {
        self.events.push(DriverEvent::TrackingLost(tracker));
    }

    fn report_button(&mut self, button: usize, pressed: bool) {
        self.events.push(DriverEvent::Button(button, pressed));
    }

    fn report_axis(&mut self, axis: usize, value: f32) {
        self.events.push(DriverEvent::Axis(axis, value));
    }
}

impl DriverLog for DriverHost {
    fn log(&self, message: &str) {
        info!(device = %self.device, "driver: {message}");
    }
}

/// Forwards haptic requests to the device thread over a bounded channel.
#[derive(Debug, Clone)]
pub struct ChannelHapticSink {
    sender: Sender<HapticRequest>,
}

impl ChannelHapticSink {
    pub fn new(capacity: usize) -> (Self, Receiver<HapticRequest>) {
        let (sender, receiver) = crossbeam::channel::bounded(capacity);
        (Self { sender }, receiver)
    }
}

impl HapticSink for ChannelHapticSink {
    fn haptic_tick(&self, request: HapticRequest) {
        match self.sender.try_send(request) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => trace!(feature = request.local_index, "Haptic queue full"),
            Err(TrySendError::Disconnected(_)) => {
                trace!(feature = request.local_index, "Haptic receiver gone");
            }
        }
    }
}

/// Polling half of a hosted driver device.
pub struct HostedDevice {
    core: DeviceCore,
    driver_name: String,
    driver: Box<dyn HostedDriver>,
    host: DriverHost,
    haptics: Receiver<HapticRequest>,
    period: Duration,
}

impl fmt::Debug for HostedDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostedDevice")
            .field("core", &self.core)
            .field("driver", &self.driver_name)
            .field("period", &self.period)
            .finish_non_exhaustive()
    }
}

impl HostedDevice {
    /// Create and initialize the driver named by `driverName`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownDriver`], other configuration errors, or
    /// [`DeviceError::Driver`] if the driver fails to initialize.
    pub fn from_config(
        name: &str,
        section: &ConfigSection,
        builder: &mut DeviceManagerBuilder,
        drivers: &DriverRegistry,
    ) -> trackd_errors::Result<ThreadedDevice<Self>> {
        let driver_name: String = section.require("driverName")?;
        let driver = drivers.create(&driver_name)?;
        Self::with_driver(name, section, builder, &driver_name, driver)
    }

    /// # Errors
    ///
    /// Returns configuration errors or [`DeviceError::Driver`] if the driver
    /// fails to initialize.
    pub fn with_driver(
        name: &str,
        section: &ConfigSection,
        builder: &mut DeviceManagerBuilder,
        driver_name: &str,
        mut driver: Box<dyn HostedDriver>,
    ) -> trackd_errors::Result<ThreadedDevice<Self>> {
        let rate: f64 = section.get_or("updateRate", DEFAULT_UPDATE_RATE)?;
        if !(rate.is_finite() && rate > 0.0) {
            return Err(section
                .invalid("updateRate", format!("{rate} is not a positive rate"))
                .into());
        }
        let serials = section.string_list("deviceSerials")?;
        let mut host = DriverHost::new(name, section.clone(), serials);

        let layout = driver.init(&mut host).map_err(|message| DeviceError::Driver {
            device: name.to_string(),
            message,
        })?;
        // init may already report the initial state; it is published on the first frame
        let core = DeviceCore::from_config(name, section, builder, layout.into(), &|kind, local| {
            match (kind, host.serials.get(local)) {
                (IndexKind::Tracker, Some(serial)) => format!("{name}/{serial}"),
                _ => DeviceCore::generic_names(name)(kind, local),
            }
        })?;

        let (sink, haptics) = ChannelHapticSink::new(HAPTIC_QUEUE);
        if layout.haptic_features > 0 {
            builder.set_haptic_sink(core.id(), Arc::new(sink));
        }
        info!(
            device = name,
            driver = driver_name,
            trackers = layout.trackers,
            buttons = layout.buttons,
            axes = layout.axes,
            rate,
            "Hosted driver ready"
        );
        Ok(ThreadedDevice::new(Self {
            core,
            driver_name: driver_name.to_string(),
            driver,
            host,
            haptics,
            period: Duration::from_secs_f64(1.0 / rate),
        }))
    }

    /// Property reported by the driver.
    pub fn property(&self, tracker: usize, key: &str) -> Option<&str> {
        self.host.property(tracker, key)
    }

    fn publish_events(&mut self, ctx: &WorkerContext<'_>) -> DeviceResult {
        if self.host.events.is_empty() {
            return Ok(());
        }
        let manager = ctx.manager;
        let now = manager.now();
        for event in std::mem::take(&mut self.host.events) {
            match event {
                DriverEvent::Pose {
                    tracker,
                    pose,
                    velocity: Some((linear, angular)),
                } => self.core.publish_sample(
                    manager,
                    tracker,
                    TrackerSample::at_rest(pose, now).with_velocity(linear, angular),
                )?,
                DriverEvent::Pose {
                    tracker,
                    pose,
                    velocity: None,
                } => self.core.publish_pose(manager, tracker, pose, now)?,
                DriverEvent::TrackingLost(tracker) => self.core.disable_tracker(manager, tracker)?,
                DriverEvent::Button(button, pressed) => self.core.publish_button(manager, button, pressed)?,
                DriverEvent::Axis(axis, value) => self.core.publish_valuator(manager, axis, value)?,
            }
        }
        self.core.update(manager);
        Ok(())
    }
}

impl DeviceWorker for HostedDevice {
    fn core(&self) -> &DeviceCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut DeviceCore {
        &mut self.core
    }

    fn begin(&mut self, _ctx: &WorkerContext<'_>) -> DeviceResult {
        while self.haptics.try_recv().is_ok() {}
        self.driver.leave_standby();
        Ok(())
    }

    fn step(&mut self, ctx: &WorkerContext<'_>) -> DeviceResult {
        for request in self.haptics.try_iter() {
            self.driver.haptic_pulse(request);
        }
        self.driver.run_frame(&mut self.host);
        self.publish_events(ctx)?;
        ctx.sleep(self.period);
        Ok(())
    }

    fn end(&mut self, _ctx: &WorkerContext<'_>) -> DeviceResult {
        self.driver.enter_standby();
        self.host.events.clear();
        Ok(())
    }
}

impl Drop for HostedDevice {
    fn drop(&mut self) {
        self.driver.cleanup();
        debug!(device = %self.core.name(), driver = %self.driver_name, "Hosted driver cleaned up");
    }
}
