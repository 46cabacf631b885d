//! Linux joystick event device.
//!
//! Buttons map to buttons and axes to valuators by their driver number;
//! events for numbers beyond `numButtons` / `numValuators` are ignored.

use std::time::Duration;

use tracing::{info, trace};
use trackd_config::ConfigSection;
use trackd_errors::{DeviceError, DeviceResult};
use trackd_manager::{DeviceManager, DeviceManagerBuilder};
use trackd_protocol::joystick::EVENT_LEN;
use trackd_protocol::{JoystickEvent, JoystickInput};

use crate::core::{DeviceCore, SlotCounts};
use crate::device::{DeviceWorker, ThreadedDevice, WorkerContext};
use crate::transport::{EventFileTransport, Transport};

pub const DEFAULT_PORT: &str = "/dev/input/js0";
/// Sleep when the event file has nothing to deliver.
const IDLE_SLEEP: Duration = Duration::from_millis(10);

/// Polling half of the joystick device.
pub struct JoystickDevice {
    core: DeviceCore,
    transport: Box<dyn Transport>,
    pending: Vec<u8>,
    buffer: [u8; EVENT_LEN * 32],
}

impl std::fmt::Debug for JoystickDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JoystickDevice")
            .field("core", &self.core)
            .field("endpoint", &self.transport.endpoint())
            .finish_non_exhaustive()
    }
}

impl JoystickDevice {
    /// Open `devicePort` (default `/dev/input/js0`) and build the device.
    ///
    /// # Errors
    ///
    /// Returns configuration errors or [`DeviceError::OpenFailed`].
    pub fn from_config(
        name: &str,
        section: &ConfigSection,
        builder: &mut DeviceManagerBuilder,
    ) -> trackd_errors::Result<ThreadedDevice<Self>> {
        let port: String = section.get_or("devicePort", DEFAULT_PORT.to_string())?;
        let transport =
            EventFileTransport::open(&port).map_err(|e| DeviceError::open_failed(name, &port, e))?;
        Ok(Self::with_transport(name, section, builder, Box::new(transport))?)
    }

    /// # Errors
    ///
    /// Returns configuration errors.
    pub fn with_transport(
        name: &str,
        section: &ConfigSection,
        builder: &mut DeviceManagerBuilder,
        transport: Box<dyn Transport>,
    ) -> trackd_errors::ConfigResult<ThreadedDevice<Self>> {
        let counts = SlotCounts::from_config(
            section,
            SlotCounts {
                buttons: 1,
                valuators: 2,
                ..SlotCounts::default()
            },
        )?;
        if counts.trackers != 0 {
            return Err(section.invalid("numTrackers", "joysticks have no trackers"));
        }
        let core = DeviceCore::from_config(name, section, builder, counts, &DeviceCore::generic_names(name))?;
        info!(
            device = name,
            buttons = counts.buttons,
            valuators = counts.valuators,
            endpoint = %transport.endpoint(),
            "Joystick ready"
        );
        Ok(ThreadedDevice::new(Self {
            core,
            transport,
            pending: Vec::with_capacity(EVENT_LEN * 2),
            buffer: [0; EVENT_LEN * 32],
        }))
    }

    fn apply(&self, manager: &DeviceManager, event: &JoystickEvent) -> DeviceResult {
        match event.input {
            Some(JoystickInput::Button { number, pressed }) => {
                self.core.publish_button(manager, usize::from(number), pressed)
            }
            Some(JoystickInput::Axis { number, value }) => {
                self.core.publish_valuator(manager, usize::from(number), value)
            }
            None => {
                trace!(time_ms = event.time_ms, "Ignoring unknown joystick event");
                Ok(())
            }
        }
    }
}

impl DeviceWorker for JoystickDevice {
    fn core(&self) -> &DeviceCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut DeviceCore {
        &mut self.core
    }

    fn begin(&mut self, _ctx: &WorkerContext<'_>) -> DeviceResult {
        self.pending.clear();
        Ok(())
    }

    fn step(&mut self, ctx: &WorkerContext<'_>) -> DeviceResult {
        let n = self
            .transport
            .read(&mut self.buffer)
            .map_err(|e| DeviceError::io(self.core.name(), &e))?;
        if n == 0 {
            ctx.sleep(IDLE_SLEEP);
            return Ok(());
        }
        self.pending.extend(self.buffer.iter().take(n));

        let (events, used) = JoystickEvent::decode_all(&self.pending);
        self.pending.drain(..used);
        for event in &events {
            self.apply(ctx.manager, event)?;
        }
        if !events.is_empty() {
            self.core.update(ctx.manager);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::MockTransport;

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    #[test]
    fn test_default_layout() -> TestResult {
        let section = ConfigSection::from_yaml("joy", "")?;
        let mut builder = DeviceManagerBuilder::new();
        JoystickDevice::with_transport("joy", &section, &mut builder, Box::new(MockTransport::new()))?;
        let manager = builder.build()?;
        assert_eq!(manager.num_buttons(), 1);
        assert_eq!(manager.num_valuators(), 2);
        assert_eq!(manager.num_trackers(), 0);
        Ok(())
    }

    #[test]
    fn test_trackers_rejected() -> TestResult {
        let section = ConfigSection::from_yaml("joy", "numTrackers: 1\n")?;
        let mut builder = DeviceManagerBuilder::new();
        let result =
            JoystickDevice::with_transport("joy", &section, &mut builder, Box::new(MockTransport::new()));
        assert!(result.is_err());
        Ok(())
    }
}
