//! Shared device state and cycle bookkeeping.

use std::fmt;
use std::ops::Deref;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, MappedMutexGuard, Mutex, MutexGuard};
use tracing::{debug, trace, warn};
use trackd_calibration::ValuatorShaping;
use trackd_errors::{DeviceError, DeviceResult};
use trackd_types::{
    DeviceState, IndexKind, MonotonicClock, MonotonicMicros, TrackerMask, TrackerSample,
    VirtualDeviceDescriptor,
};

use crate::haptic::{HapticRequest, HapticSink};
use crate::namespace::{Namespace, Slot};
use crate::stats::{ManagerCounters, ManagerStats};
use crate::DeviceId;

/// Called with the state lock held after each completed cycle.
pub type UpdateCallback = Box<dyn Fn(&DeviceState) + Send + Sync>;

pub(crate) struct DeviceEntry {
    pub(crate) name: String,
    pub(crate) tracker_mask: TrackerMask,
    pub(crate) haptic_sink: Option<Arc<dyn HapticSink>>,
}

pub(crate) struct ManagerParts {
    pub(crate) devices: Vec<DeviceEntry>,
    pub(crate) expect_all: TrackerMask,
    pub(crate) trackers: Namespace,
    pub(crate) buttons: Namespace,
    pub(crate) valuators: Namespace,
    pub(crate) haptics: Namespace,
    pub(crate) shaping: Vec<ValuatorShaping>,
    pub(crate) virtual_devices: Vec<VirtualDeviceDescriptor>,
    pub(crate) cycle_timeout: Option<Duration>,
    pub(crate) notify_waiters: bool,
    pub(crate) callback: Option<UpdateCallback>,
}

struct Shared {
    state: DeviceState,
    reported: TrackerMask,
    cycle_started: Instant,
}

/// Read-only access to the locked [`DeviceState`].
///
/// Device threads block on their next write while a guard is alive, so
/// consumers should drop it as soon as they have copied what they need.
pub struct StateGuard<'a> {
    inner: MappedMutexGuard<'a, DeviceState>,
}

impl Deref for StateGuard<'_> {
    type Target = DeviceState;

    fn deref(&self) -> &DeviceState {
        &self.inner
    }
}

impl fmt::Debug for StateGuard<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("StateGuard").field(&*self.inner).finish()
    }
}

/// Owner of the global namespaces and the shared [`DeviceState`].
///
/// Created by [`DeviceManagerBuilder::build`](crate::DeviceManagerBuilder::build)
/// and handed to every device as an `Arc`. Index layout is frozen at that
/// point; only slot contents change afterwards.
///
/// Every write takes the single state mutex for the duration of one slot
/// update. [`DeviceManager::update_state`] closes a cycle once each expected
/// tracker has reported since the previous one.
pub struct DeviceManager {
    devices: Vec<DeviceEntry>,
    expect_all: TrackerMask,
    trackers: Namespace,
    buttons: Namespace,
    valuators: Namespace,
    haptics: Namespace,
    shaping: Vec<ValuatorShaping>,
    virtual_devices: Vec<VirtualDeviceDescriptor>,
    cycle_timeout: Option<Duration>,
    notify_waiters: bool,
    callback: Option<UpdateCallback>,
    shared: Mutex<Shared>,
    cycle_done: Condvar,
    counters: ManagerCounters,
    clock: MonotonicClock,
}

impl fmt::Debug for DeviceManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceManager")
            .field("devices", &self.devices.iter().map(|d| &d.name).collect::<Vec<_>>())
            .field("trackers", &self.trackers.len())
            .field("buttons", &self.buttons.len())
            .field("valuators", &self.valuators.len())
            .field("cycle_timeout", &self.cycle_timeout)
            .finish_non_exhaustive()
    }
}

impl DeviceManager {
    pub(crate) fn new(parts: ManagerParts) -> Self {
        let state = DeviceState::new(parts.trackers.len(), parts.buttons.len(), parts.valuators.len());
        let reported = TrackerMask::new(parts.trackers.len());
        Self {
            devices: parts.devices,
            expect_all: parts.expect_all,
            trackers: parts.trackers,
            buttons: parts.buttons,
            valuators: parts.valuators,
            haptics: parts.haptics,
            shaping: parts.shaping,
            virtual_devices: parts.virtual_devices,
            cycle_timeout: parts.cycle_timeout,
            notify_waiters: parts.notify_waiters,
            callback: parts.callback,
            shared: Mutex::new(Shared {
                state,
                reported,
                cycle_started: Instant::now(),
            }),
            cycle_done: Condvar::new(),
            counters: ManagerCounters::default(),
            clock: MonotonicClock::new(),
        }
    }

    // ---- device side ----

    /// Write one tracker slot and mark it valid.
    ///
    /// # Errors
    ///
    /// Returns [`DeviceError::InvalidIndex`] for an index outside the namespace.
    pub fn set_tracker_state(&self, index: usize, sample: TrackerSample) -> DeviceResult {
        if !self.shared.lock().state.set_tracker(index, sample) {
            return Err(Self::invalid(IndexKind::Tracker, index));
        }
        self.counters.inc_samples();
        Ok(())
    }

    /// # Errors
    ///
    /// Returns [`DeviceError::InvalidIndex`] for an index outside the namespace.
    pub fn set_button_state(&self, index: usize, pressed: bool) -> DeviceResult {
        if !self.shared.lock().state.set_button(index, pressed) {
            return Err(Self::invalid(IndexKind::Button, index));
        }
        self.counters.inc_input_writes();
        Ok(())
    }

    /// Write one valuator slot after applying its response shaping.
    ///
    /// # Errors
    ///
    /// Returns [`DeviceError::InvalidIndex`] for an index outside the namespace.
    pub fn set_valuator_state(&self, index: usize, value: f32) -> DeviceResult {
        let shaped = self
            .shaping
            .get(index)
            .map_or(value, |shaping| shaping.apply(value));
        if !self.shared.lock().state.set_valuator(index, shaped) {
            return Err(Self::invalid(IndexKind::Valuator, index));
        }
        self.counters.inc_input_writes();
        Ok(())
    }

    /// Record that `device` finished a logical cycle of its own.
    ///
    /// Returns `true` if this call completed a global cycle, either because
    /// every expected tracker has now reported or because the configured
    /// cycle timeout expired.
    pub fn update_state(&self, device: DeviceId) -> bool {
        let mut shared = self.shared.lock();
        if let Some(entry) = self.devices.get(device.0) {
            shared.reported.union_with(&entry.tracker_mask);
        }

        let complete = shared.reported.covers(&self.expect_all);
        let forced = !complete
            && self
                .cycle_timeout
                .is_some_and(|timeout| shared.cycle_started.elapsed() >= timeout);
        if !complete && !forced {
            return false;
        }

        if forced {
            let missing: Vec<usize> = self
                .expect_all
                .iter()
                .filter(|&i| !shared.reported.contains(i))
                .collect();
            debug!(?missing, "Cycle timeout expired, forcing completion");
        }
        shared.state.generation += 1;
        shared.reported.clear();
        shared.cycle_started = Instant::now();
        self.counters.inc_cycles(forced);
        trace!(generation = shared.state.generation, "Cycle complete");

        if self.notify_waiters {
            self.cycle_done.notify_all();
        }
        if let Some(callback) = &self.callback {
            callback(&shared.state);
        }
        true
    }

    /// Mark a tracker invalid, e.g. after its device disconnected. Only a
    /// transition from valid to invalid is counted in [`ManagerStats`].
    ///
    /// # Errors
    ///
    /// Returns [`DeviceError::InvalidIndex`] for an index outside the namespace.
    pub fn disable_tracker(&self, index: usize) -> DeviceResult {
        let was_valid = {
            let mut shared = self.shared.lock();
            let was_valid = shared.state.is_tracker_valid(index);
            if !shared.state.invalidate_tracker(index) {
                return Err(Self::invalid(IndexKind::Tracker, index));
            }
            was_valid
        };
        if was_valid {
            self.counters.inc_disabled_trackers();
        }
        Ok(())
    }

    /// Disable every tracker owned by `device`; returns how many were valid.
    pub fn disable_trackers_of(&self, device: DeviceId) -> usize {
        let Some(entry) = self.devices.get(device.0) else {
            return 0;
        };
        let mut shared = self.shared.lock();
        let mut disabled = 0;
        for index in entry.tracker_mask.iter() {
            let was_valid = shared.state.is_tracker_valid(index);
            if shared.state.invalidate_tracker(index) && was_valid {
                self.counters.inc_disabled_trackers();
                disabled += 1;
            }
        }
        if disabled > 0 {
            warn!(device = %entry.name, trackers = disabled, "Disabled trackers");
        }
        disabled
    }

    // ---- consumer side ----

    /// Lock the shared state for reading.
    pub fn lock_state(&self) -> StateGuard<'_> {
        StateGuard {
            inner: MutexGuard::map(self.shared.lock(), |shared| &mut shared.state),
        }
    }

    /// Copy of the current state.
    pub fn snapshot(&self) -> DeviceState {
        self.shared.lock().state.clone()
    }

    pub fn generation(&self) -> u64 {
        self.shared.lock().state.generation
    }

    /// Block until the generation exceeds `after` or `timeout` passes.
    ///
    /// Returns the new generation, or `None` on timeout. Only wakes early when
    /// waiter notification is enabled.
    pub fn wait_for_update(&self, after: u64, timeout: Duration) -> Option<u64> {
        let mut shared = self.shared.lock();
        self.cycle_done
            .wait_while_for(&mut shared, |s| s.state.generation <= after, timeout);
        let generation = shared.state.generation;
        (generation > after).then_some(generation)
    }

    /// Send a haptic pulse to the device owning feature `index`.
    ///
    /// # Errors
    ///
    /// Returns [`DeviceError::InvalidIndex`] for an unknown feature, or
    /// [`DeviceError::FeatureNotSupported`] if the owner accepts no requests.
    pub fn haptic_tick(
        &self,
        index: usize,
        duration_ms: u32,
        frequency: u32,
        amplitude: f32,
    ) -> DeviceResult {
        let slot = self
            .haptics
            .slot(index)
            .ok_or_else(|| Self::invalid(IndexKind::Haptic, index))?;
        let entry = self
            .devices
            .get(slot.owner.0)
            .ok_or_else(|| Self::invalid(IndexKind::Haptic, index))?;
        let sink = entry
            .haptic_sink
            .as_ref()
            .ok_or_else(|| DeviceError::FeatureNotSupported {
                device: entry.name.clone(),
                feature: "haptic".to_string(),
            })?;
        sink.haptic_tick(HapticRequest {
            local_index: slot.local_index,
            duration_ms,
            frequency,
            amplitude: amplitude.clamp(0.0, 1.0),
        });
        self.counters.inc_haptic_requests();
        Ok(())
    }

    // ---- layout ----

    pub fn num_devices(&self) -> usize {
        self.devices.len()
    }

    pub fn device_name(&self, device: DeviceId) -> Option<&str> {
        self.devices.get(device.0).map(|d| d.name.as_str())
    }

    pub fn find_device(&self, name: &str) -> Option<DeviceId> {
        self.devices.iter().position(|d| d.name == name).map(DeviceId)
    }

    /// Trackers whose report `device` contributes to a cycle.
    pub fn tracker_mask(&self, device: DeviceId) -> Option<&TrackerMask> {
        self.devices.get(device.0).map(|d| &d.tracker_mask)
    }

    pub fn num_trackers(&self) -> usize {
        self.trackers.len()
    }

    pub fn num_buttons(&self) -> usize {
        self.buttons.len()
    }

    pub fn num_valuators(&self) -> usize {
        self.valuators.len()
    }

    pub fn num_haptic_features(&self) -> usize {
        self.haptics.len()
    }

    fn namespace(&self, kind: IndexKind) -> &Namespace {
        match kind {
            IndexKind::Tracker => &self.trackers,
            IndexKind::Button => &self.buttons,
            IndexKind::Valuator => &self.valuators,
            IndexKind::Haptic => &self.haptics,
        }
    }

    /// Owner and name of one allocated slot.
    pub fn slot(&self, kind: IndexKind, index: usize) -> Option<&Slot> {
        self.namespace(kind).slot(index)
    }

    pub fn find(&self, kind: IndexKind, name: &str) -> Option<usize> {
        self.namespace(kind).find(name)
    }

    /// Slot names in index order; holes are empty strings.
    pub fn names(&self, kind: IndexKind) -> Vec<String> {
        self.namespace(kind).names()
    }

    pub fn tracker_name(&self, index: usize) -> Option<&str> {
        self.trackers.slot(index).map(|s| s.name.as_str())
    }

    pub fn valuator_shaping(&self, index: usize) -> Option<ValuatorShaping> {
        self.shaping.get(index).copied()
    }

    pub fn virtual_devices(&self) -> &[VirtualDeviceDescriptor] {
        &self.virtual_devices
    }

    pub fn find_virtual_device(&self, name: &str) -> Option<&VirtualDeviceDescriptor> {
        self.virtual_devices.iter().find(|d| d.name == name)
    }

    pub fn cycle_timeout(&self) -> Option<Duration> {
        self.cycle_timeout
    }

    // ---- time and stats ----

    /// Clock shared by all devices for sample time stamps.
    pub fn clock(&self) -> &MonotonicClock {
        &self.clock
    }

    pub fn now(&self) -> MonotonicMicros {
        self.clock.now()
    }

    pub fn stats(&self) -> ManagerStats {
        self.counters.snapshot()
    }

    fn invalid(kind: IndexKind, index: usize) -> DeviceError {
        DeviceError::InvalidIndex {
            kind: kind.as_str(),
            index,
        }
    }
}
