//! Device type tags and their constructors.

use std::collections::BTreeMap;

use trackd_config::ConfigSection;
use trackd_errors::{ConfigError, Result};
use trackd_manager::DeviceManagerBuilder;

use crate::device::Device;
use crate::devices::hosted::{DriverRegistry, HostedDriver};
use crate::devices::{HostedDevice, JoystickDevice, OpticalTracker, SimulatedDevice, StationTracker};

/// What a factory gets to build one device.
#[derive(Debug, Clone, Copy)]
pub struct DeviceSpec<'a> {
    pub name: &'a str,
    pub section: &'a ConfigSection,
    pub drivers: &'a DriverRegistry,
}

/// Constructs a device and allocates its slots in the builder.
pub type DeviceFactory = fn(&DeviceSpec<'_>, &mut DeviceManagerBuilder) -> Result<Box<dyn Device>>;

fn new_station_tracker(spec: &DeviceSpec<'_>, builder: &mut DeviceManagerBuilder) -> Result<Box<dyn Device>> {
    Ok(Box::new(StationTracker::from_config(spec.name, spec.section, builder)?))
}

fn new_optical(spec: &DeviceSpec<'_>, builder: &mut DeviceManagerBuilder) -> Result<Box<dyn Device>> {
    Ok(Box::new(OpticalTracker::from_config(spec.name, spec.section, builder)?))
}

fn new_joystick(spec: &DeviceSpec<'_>, builder: &mut DeviceManagerBuilder) -> Result<Box<dyn Device>> {
    Ok(Box::new(JoystickDevice::from_config(spec.name, spec.section, builder)?))
}

fn new_simulated(spec: &DeviceSpec<'_>, builder: &mut DeviceManagerBuilder) -> Result<Box<dyn Device>> {
    Ok(Box::new(SimulatedDevice::from_config(spec.name, spec.section, builder)?))
}

fn new_hosted(spec: &DeviceSpec<'_>, builder: &mut DeviceManagerBuilder) -> Result<Box<dyn Device>> {
    Ok(Box::new(HostedDevice::from_config(
        spec.name,
        spec.section,
        builder,
        spec.drivers,
    )?))
}

/// Built-in device types.
pub fn builtin_device_factories() -> &'static [(&'static str, DeviceFactory)] {
    &[
        ("stationTracker", new_station_tracker),
        ("optical", new_optical),
        ("joystick", new_joystick),
        ("simulated", new_simulated),
        ("hosted", new_hosted),
    ]
}

/// Maps the `type` key of a device section to its constructor.
#[derive(Debug, Clone)]
pub struct DeviceRegistry {
    factories: BTreeMap<String, DeviceFactory>,
    drivers: DriverRegistry,
}

impl Default for DeviceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl DeviceRegistry {
    /// Registry with the built-in device types and no hosted drivers.
    pub fn new() -> Self {
        Self {
            factories: builtin_device_factories()
                .iter()
                .map(|&(tag, factory)| (tag.to_string(), factory))
                .collect(),
            drivers: DriverRegistry::new(),
        }
    }

    /// Register an additional device type; replaces a type of the same tag.
    pub fn register(&mut self, tag: impl Into<String>, factory: DeviceFactory) {
        self.factories.insert(tag.into(), factory);
    }

    /// Register a driver for `hosted` devices.
    pub fn register_driver<F>(&mut self, name: impl Into<String>, factory: F)
    where
        F: Fn() -> Box<dyn HostedDriver> + Send + Sync + 'static,
    {
        self.drivers.register(name, factory);
    }

    pub fn drivers(&self) -> &DriverRegistry {
        &self.drivers
    }

    pub fn types(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }

    /// Construct the device configured in `section`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownDeviceType`] for an unregistered `type`,
    /// or whatever the device's constructor fails with.
    pub fn create(
        &self,
        name: &str,
        section: &ConfigSection,
        builder: &mut DeviceManagerBuilder,
    ) -> Result<Box<dyn Device>> {
        let type_name: String = section.require("type")?;
        let factory = self
            .factories
            .get(&type_name)
            .ok_or_else(|| ConfigError::UnknownDeviceType {
                device: name.to_string(),
                type_name: type_name.clone(),
            })?;
        let spec = DeviceSpec {
            name,
            section,
            drivers: &self.drivers,
        };
        factory(&spec, builder)
    }
}
