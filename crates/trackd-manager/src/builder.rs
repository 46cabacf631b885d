//! Startup phase: device registration and index allocation.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};
use trackd_calibration::ValuatorShaping;
use trackd_config::{IndexRef, VirtualDeviceConfig};
use trackd_errors::{ConfigError, ConfigResult};
use trackd_types::{IndexKind, TrackType, TrackerMask, Vector3, VirtualDeviceDescriptor};

use crate::haptic::HapticSink;
use crate::manager::{DeviceEntry, DeviceManager, UpdateCallback};
use crate::namespace::{Namespace, Slot};
use crate::DeviceId;

/// Collects devices, index allocations and virtual devices before any device
/// thread runs, then freezes them into a [`DeviceManager`].
///
/// # Example
///
/// ```
/// use trackd_manager::DeviceManagerBuilder;
///
/// let mut builder = DeviceManagerBuilder::new();
/// let head = builder.register_device("head");
/// let tracker = builder.add_tracker(head, "Head");
/// let manager = builder.build()?;
/// assert_eq!(manager.num_trackers(), 1);
/// assert_eq!(tracker, 0);
/// # Ok::<(), trackd_errors::ConfigError>(())
/// ```
pub struct DeviceManagerBuilder {
    devices: Vec<PendingDevice>,
    trackers: Namespace,
    buttons: Namespace,
    valuators: Namespace,
    haptics: Namespace,
    shaping: Vec<ValuatorShaping>,
    virtual_devices: Vec<VirtualDeviceDescriptor>,
    cycle_timeout: Option<Duration>,
    notify_waiters: bool,
    callback: Option<UpdateCallback>,
}

struct PendingDevice {
    name: String,
    haptic_sink: Option<Arc<dyn HapticSink>>,
}

impl fmt::Debug for DeviceManagerBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceManagerBuilder")
            .field("devices", &self.devices.iter().map(|d| &d.name).collect::<Vec<_>>())
            .field("trackers", &self.trackers.len())
            .field("buttons", &self.buttons.len())
            .field("valuators", &self.valuators.len())
            .field("virtual_devices", &self.virtual_devices.len())
            .finish_non_exhaustive()
    }
}

impl Default for DeviceManagerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl DeviceManagerBuilder {
    pub fn new() -> Self {
        Self {
            devices: Vec::new(),
            trackers: Namespace::new(IndexKind::Tracker),
            buttons: Namespace::new(IndexKind::Button),
            valuators: Namespace::new(IndexKind::Valuator),
            haptics: Namespace::new(IndexKind::Haptic),
            shaping: Vec::new(),
            virtual_devices: Vec::new(),
            cycle_timeout: None,
            notify_waiters: true,
            callback: None,
        }
    }

    /// Force-complete a cycle that stayed open this long. `None` waits forever.
    #[must_use]
    pub fn cycle_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.cycle_timeout = timeout;
        self
    }

    /// Wake [`DeviceManager::wait_for_update`] callers on every completed cycle.
    #[must_use]
    pub fn notify_waiters(mut self, enabled: bool) -> Self {
        self.notify_waiters = enabled;
        self
    }

    /// Callback invoked with the state lock held after every completed cycle.
    #[must_use]
    pub fn on_update<F>(mut self, callback: F) -> Self
    where
        F: Fn(&trackd_types::DeviceState) + Send + Sync + 'static,
    {
        self.callback = Some(Box::new(callback));
        self
    }

    pub fn register_device(&mut self, name: impl Into<String>) -> DeviceId {
        let name = name.into();
        debug!(device = %name, id = self.devices.len(), "Registered device");
        self.devices.push(PendingDevice {
            name,
            haptic_sink: None,
        });
        DeviceId(self.devices.len() - 1)
    }

    pub fn device_name(&self, id: DeviceId) -> &str {
        self.devices.get(id.0).map_or("<unknown>", |d| d.name.as_str())
    }

    pub fn num_devices(&self) -> usize {
        self.devices.len()
    }

    fn namespace(&self, kind: IndexKind) -> &Namespace {
        match kind {
            IndexKind::Tracker => &self.trackers,
            IndexKind::Button => &self.buttons,
            IndexKind::Valuator => &self.valuators,
            IndexKind::Haptic => &self.haptics,
        }
    }

    fn namespace_mut(&mut self, kind: IndexKind) -> &mut Namespace {
        match kind {
            IndexKind::Tracker => &mut self.trackers,
            IndexKind::Button => &mut self.buttons,
            IndexKind::Valuator => &mut self.valuators,
            IndexKind::Haptic => &mut self.haptics,
        }
    }

    fn slot(&self, owner: DeviceId, name: String, local_index: usize) -> Slot {
        Slot {
            owner,
            owner_name: self.device_name(owner).to_string(),
            name,
            local_index,
        }
    }

    /// Next index that sequential allocation would hand out.
    pub fn next_index(&self, kind: IndexKind) -> usize {
        self.namespace(kind).next_index()
    }

    /// Allocate the next free index in `kind`.
    pub fn allocate(
        &mut self,
        kind: IndexKind,
        owner: DeviceId,
        local_index: usize,
        name: impl Into<String>,
    ) -> usize {
        let slot = self.slot(owner, name.into(), local_index);
        let index = self.namespace_mut(kind).allocate(slot);
        if kind == IndexKind::Valuator {
            self.sync_shaping();
        }
        index
    }

    /// Claim an explicit index in `kind`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::IndexCollision`] if the index is already owned.
    pub fn claim(
        &mut self,
        kind: IndexKind,
        owner: DeviceId,
        index: usize,
        local_index: usize,
        name: impl Into<String>,
    ) -> ConfigResult<usize> {
        let slot = self.slot(owner, name.into(), local_index);
        let index = self.namespace_mut(kind).claim(index, slot)?;
        if kind == IndexKind::Valuator {
            self.sync_shaping();
        }
        Ok(index)
    }

    fn sync_shaping(&mut self) {
        self.shaping
            .resize(self.valuators.len(), ValuatorShaping::IDENTITY);
    }

    pub fn add_tracker(&mut self, owner: DeviceId, name: impl Into<String>) -> usize {
        let local = self.trackers.owned_by(owner).count();
        self.allocate(IndexKind::Tracker, owner, local, name)
    }

    pub fn add_button(&mut self, owner: DeviceId, name: impl Into<String>) -> usize {
        let local = self.buttons.owned_by(owner).count();
        self.allocate(IndexKind::Button, owner, local, name)
    }

    pub fn add_valuator(&mut self, owner: DeviceId, name: impl Into<String>) -> usize {
        let local = self.valuators.owned_by(owner).count();
        self.allocate(IndexKind::Valuator, owner, local, name)
    }

    pub fn add_haptic_feature(&mut self, owner: DeviceId, name: impl Into<String>) -> usize {
        let local = self.haptics.owned_by(owner).count();
        self.allocate(IndexKind::Haptic, owner, local, name)
    }

    /// Response shaping applied to every write of valuator `index`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::IndexOutOfRange`] for an unallocated valuator.
    pub fn set_valuator_shaping(
        &mut self,
        index: usize,
        shaping: ValuatorShaping,
    ) -> ConfigResult<()> {
        let len = self.shaping.len();
        match self.shaping.get_mut(index) {
            Some(slot) if self.valuators.slot(index).is_some() => {
                *slot = shaping;
                Ok(())
            }
            _ => Err(ConfigError::out_of_range("valuator", index, len, "valuator shaping")),
        }
    }

    /// Route haptic requests for `owner`'s features to `sink`.
    pub fn set_haptic_sink(&mut self, owner: DeviceId, sink: Arc<dyn HapticSink>) {
        if let Some(device) = self.devices.get_mut(owner.0) {
            device.haptic_sink = Some(sink);
        }
    }

    /// Register a virtual device built from allocated indices.
    ///
    /// # Errors
    ///
    /// Returns an error if any referenced index is unallocated.
    pub fn add_virtual_device(&mut self, descriptor: VirtualDeviceDescriptor) -> ConfigResult<usize> {
        let context = descriptor.name.as_str();
        if let Some(tracker) = descriptor.tracker_index {
            self.trackers.check(tracker, context)?;
        } else if descriptor.track_type.needs_tracker() {
            return Err(ConfigError::invalid_value(
                context,
                "tracker",
                "required unless trackType is none",
            ));
        }
        for &i in &descriptor.button_indices {
            self.buttons.check(i, context)?;
        }
        for &i in &descriptor.valuator_indices {
            self.valuators.check(i, context)?;
        }
        for &i in &descriptor.haptic_indices {
            self.haptics.check(i, context)?;
        }
        info!(
            name = %descriptor.name,
            buttons = descriptor.button_indices.len(),
            valuators = descriptor.valuator_indices.len(),
            "Added virtual device"
        );
        self.virtual_devices.push(descriptor);
        Ok(self.virtual_devices.len() - 1)
    }

    /// Resolve a configured virtual device by index or slot name.
    ///
    /// # Errors
    ///
    /// Returns an error for unknown names or unallocated indices.
    pub fn resolve_virtual_device(
        &self,
        name: &str,
        config: &VirtualDeviceConfig,
    ) -> ConfigResult<VirtualDeviceDescriptor> {
        let resolve_all = |ns: &Namespace, refs: &[IndexRef]| {
            refs.iter()
                .map(|r| ns.resolve(r, name))
                .collect::<ConfigResult<Vec<_>>>()
        };
        let tracker_index = config
            .tracker
            .as_ref()
            .map(|r| self.trackers.resolve(r, name))
            .transpose()?;
        Ok(VirtualDeviceDescriptor {
            name: name.to_string(),
            track_type: if tracker_index.is_some() {
                config.track_type
            } else {
                TrackType::None
            },
            ray_direction: Vector3::from(config.ray_direction),
            ray_start: config.ray_start,
            tracker_index,
            button_indices: resolve_all(&self.buttons, &config.buttons)?,
            valuator_indices: resolve_all(&self.valuators, &config.valuators)?,
            haptic_indices: resolve_all(&self.haptics, &config.haptic_features)?,
        })
    }

    /// Freeze the namespaces and create the manager.
    ///
    /// Unclaimed tracker indices are logged and excluded from cycle
    /// completion.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] if the cycle timeout is zero.
    pub fn build(self) -> ConfigResult<Arc<DeviceManager>> {
        if self.cycle_timeout.is_some_and(|t| t.is_zero()) {
            return Err(ConfigError::invalid_value("", "cycleTimeoutMs", "must be positive"));
        }
        for ns in [&self.trackers, &self.buttons, &self.valuators, &self.haptics] {
            let holes = ns.holes();
            if !holes.is_empty() {
                warn!(kind = %ns.kind(), ?holes, "Unclaimed global indices");
            }
        }

        let num_trackers = self.trackers.len();
        let mut expect_all = TrackerMask::new(num_trackers);
        let devices: Vec<DeviceEntry> = self
            .devices
            .into_iter()
            .enumerate()
            .map(|(i, device)| {
                let mut mask = TrackerMask::new(num_trackers);
                self.trackers.owned_by(DeviceId(i)).for_each(|t| mask.set(t));
                expect_all.union_with(&mask);
                DeviceEntry {
                    name: device.name,
                    tracker_mask: mask,
                    haptic_sink: device.haptic_sink,
                }
            })
            .collect();

        info!(
            devices = devices.len(),
            trackers = num_trackers,
            buttons = self.buttons.len(),
            valuators = self.valuators.len(),
            haptic_features = self.haptics.len(),
            virtual_devices = self.virtual_devices.len(),
            cycle_timeout_ms = self.cycle_timeout.map(|t| t.as_millis()),
            "Device manager ready"
        );

        Ok(Arc::new(DeviceManager::new(crate::manager::ManagerParts {
            devices,
            expect_all,
            trackers: self.trackers,
            buttons: self.buttons,
            valuators: self.valuators,
            haptics: self.haptics,
            shaping: self.shaping,
            virtual_devices: self.virtual_devices,
            cycle_timeout: self.cycle_timeout,
            notify_waiters: self.notify_waiters,
            callback: self.callback,
        })))
    }
}
