//! Assembly of a running daemon from a configuration file.

use std::sync::Arc;

use tracing::{error, info, warn};
use trackd_config::{ConfigFile, VirtualDeviceConfig};
use trackd_errors::{ConfigError, DeviceResult, Result};
use trackd_manager::{DeviceManager, DeviceManagerBuilder};

use crate::device::Device;
use crate::registry::DeviceRegistry;

/// All configured devices and the manager they feed.
///
/// Devices are constructed (and their hardware handshakes run) by
/// [`DeviceDaemon::from_config`] but only stream after
/// [`DeviceDaemon::start_all`]. Dropping the daemon stops every device.
#[derive(Debug)]
pub struct DeviceDaemon {
    manager: Arc<DeviceManager>,
    devices: Vec<Box<dyn Device>>,
}

impl DeviceDaemon {
    /// # Errors
    ///
    /// Returns the first configuration or device construction error.
    pub fn from_config(config: &ConfigFile, registry: &DeviceRegistry) -> Result<Self> {
        Self::with_builder(config, registry, DeviceManagerBuilder::new())
    }

    /// Like [`DeviceDaemon::from_config`] on a caller-prepared builder, e.g.
    /// one with an update callback. Daemon-level settings of `config`
    /// override the builder's.
    ///
    /// # Errors
    ///
    /// Returns the first configuration or device construction error.
    pub fn with_builder(
        config: &ConfigFile,
        registry: &DeviceRegistry,
        builder: DeviceManagerBuilder,
    ) -> Result<Self> {
        let settings = config.daemon()?;
        let mut builder = builder
            .cycle_timeout(settings.cycle_timeout)
            .notify_waiters(settings.notify_waiters);

        let mut devices: Vec<Box<dyn Device>> = Vec::with_capacity(settings.device_names.len());
        for (i, name) in settings.device_names.iter().enumerate() {
            if settings.device_names.iter().take(i).any(|other| other == name) {
                return Err(ConfigError::invalid_value(
                    config.root().name(),
                    trackd_config::file::keys::DEVICE_NAMES,
                    format!("device '{name}' listed twice"),
                )
                .into());
            }
            let section = config.section(name)?;
            let device = registry.create(name, &section, &mut builder).inspect_err(|e| {
                error!(device = %name, error = %e, "Failed to create device");
            })?;
            devices.push(device);
        }

        for name in &settings.virtual_device_names {
            let section = config.section(name)?;
            let virtual_config = VirtualDeviceConfig::from_section(&section)?;
            let descriptor = builder.resolve_virtual_device(name, &virtual_config)?;
            builder.add_virtual_device(descriptor)?;
        }

        let manager = builder.build()?;
        info!(
            source = config.source(),
            devices = devices.len(),
            virtual_devices = settings.virtual_device_names.len(),
            "Daemon assembled"
        );
        Ok(Self { manager, devices })
    }

    pub fn manager(&self) -> &Arc<DeviceManager> {
        &self.manager
    }

    pub fn devices(&self) -> &[Box<dyn Device>] {
        &self.devices
    }

    pub fn device(&self, name: &str) -> Option<&dyn Device> {
        self.devices
            .iter()
            .find(|d| d.name() == name)
            .map(|d| d.as_ref())
    }

    /// Start every device in configuration order. If one fails, the devices
    /// started before it are stopped again.
    ///
    /// # Errors
    ///
    /// Returns the error of the device that failed to start.
    pub fn start_all(&mut self) -> DeviceResult {
        for i in 0..self.devices.len() {
            let Some(device) = self.devices.get_mut(i) else {
                continue;
            };
            if let Err(e) = device.start(&self.manager) {
                error!(device = %device.name(), error = %e, "Failed to start device");
                for started in self.devices.iter_mut().take(i).rev() {
                    if let Err(stop_err) = started.stop() {
                        warn!(device = %started.name(), error = %stop_err, "Failed to stop device");
                    }
                }
                return Err(e);
            }
        }
        info!(devices = self.devices.len(), "All devices started");
        Ok(())
    }

    /// Stop every device in reverse order.
    ///
    /// # Errors
    ///
    /// Returns the first stop error; the remaining devices are still stopped.
    pub fn stop_all(&mut self) -> DeviceResult {
        let mut first_error = None;
        for device in self.devices.iter_mut().rev() {
            if let Err(e) = device.stop() {
                warn!(device = %device.name(), error = %e, "Failed to stop device");
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    pub fn is_running(&self) -> bool {
        self.devices.iter().any(|d| d.is_active())
    }
}

impl Drop for DeviceDaemon {
    fn drop(&mut self) {
        if self.stop_all().is_err() {
            warn!("Some devices failed to stop cleanly");
        }
    }
}
