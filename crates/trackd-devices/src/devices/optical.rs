//! UDP optical body tracker.
//!
//! ```yaml
//! optical:
//!   type: optical
//!   serverDataPort: 5000
//!   serverName: tracking-pc
//!   serverControlPort: 5001
//!   bodyIds: [3, 7]
//!   trackerNames: [Head, Hand]
//! ```
//!
//! Body `bodyIds[i]` feeds local tracker `i`. Without `bodyIds`, body `i`
//! feeds tracker `i` for `numTrackers` trackers.

use tracing::{debug, info, trace};
use trackd_config::ConfigSection;
use trackd_errors::{DeviceError, DeviceResult};
use trackd_manager::{DeviceManager, DeviceManagerBuilder};
use trackd_protocol::OpticalFrame;
use trackd_protocol::optical::command;

use crate::core::{DeviceCore, SlotCounts};
use crate::device::{DeviceWorker, ThreadedDevice, WorkerContext};
use crate::transport::{DatagramSource, UdpTransport};

/// Largest datagram accepted.
const MAX_DATAGRAM: usize = 64 * 1024;

/// Polling half of the optical tracker.
pub struct OpticalTracker {
    core: DeviceCore,
    source: Box<dyn DatagramSource>,
    body_ids: Vec<u32>,
    buffer: Vec<u8>,
    last_frame: Option<u32>,
}

impl std::fmt::Debug for OpticalTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpticalTracker")
            .field("core", &self.core)
            .field("endpoint", &self.source.endpoint())
            .field("body_ids", &self.body_ids)
            .finish_non_exhaustive()
    }
}

impl OpticalTracker {
    /// Bind `serverDataPort` and build the device.
    ///
    /// # Errors
    ///
    /// Returns configuration errors or [`DeviceError::OpenFailed`] if the
    /// sockets cannot be set up.
    pub fn from_config(
        name: &str,
        section: &ConfigSection,
        builder: &mut DeviceManagerBuilder,
    ) -> trackd_errors::Result<ThreadedDevice<Self>> {
        let data_port: u16 = section.require("serverDataPort")?;
        let control_port: Option<u16> = section.get("serverControlPort")?;
        let server: Option<String> = section.get("serverName")?;

        let endpoint = format!("udp:{data_port}");
        let mut transport = UdpTransport::bind(data_port)
            .map_err(|e| DeviceError::open_failed(name, &endpoint, e))?;
        if let (Some(server), Some(port)) = (server, control_port) {
            transport = transport
                .with_control(&server, port)
                .map_err(|e| DeviceError::open_failed(name, format!("{server}:{port}"), e))?;
        }
        Ok(Self::with_source(name, section, builder, Box::new(transport))?)
    }

    /// Build the device on an already bound datagram source.
    ///
    /// # Errors
    ///
    /// Returns configuration errors.
    pub fn with_source(
        name: &str,
        section: &ConfigSection,
        builder: &mut DeviceManagerBuilder,
        source: Box<dyn DatagramSource>,
    ) -> trackd_errors::ConfigResult<ThreadedDevice<Self>> {
        let body_ids: Vec<u32> = match section.get::<Vec<u32>>("bodyIds")? {
            Some(ids) => ids,
            None => {
                let count: u32 = section.get_or(trackd_types::IndexKind::Tracker.count_key(), 1)?;
                (0..count).collect()
            }
        };
        for (i, id) in body_ids.iter().enumerate() {
            if body_ids.iter().take(i).any(|other| other == id) {
                return Err(section.invalid("bodyIds", format!("body {id} listed twice")));
            }
        }

        let counts = SlotCounts {
            trackers: body_ids.len(),
            ..SlotCounts::default()
        };
        let core = DeviceCore::from_config(name, section, builder, counts, &DeviceCore::generic_names(name))?;
        info!(
            device = name,
            bodies = ?body_ids,
            endpoint = %source.endpoint(),
            "Optical tracker ready"
        );
        Ok(ThreadedDevice::new(Self {
            core,
            source,
            body_ids,
            buffer: vec![0; MAX_DATAGRAM],
            last_frame: None,
        }))
    }

    fn local_of(&self, body: u32) -> Option<usize> {
        self.body_ids.iter().position(|&id| id == body)
    }

    fn publish(&mut self, manager: &DeviceManager, frame: &OpticalFrame) -> DeviceResult {
        if let Some(last) = self.last_frame
            && frame.frame.wrapping_sub(last) > 1
        {
            trace!(last, frame = frame.frame, "Skipped optical frames");
        }
        self.last_frame = Some(frame.frame);

        let now = manager.now();
        for body in &frame.bodies {
            let Some(local) = self.local_of(body.id) else {
                trace!(body = body.id, "Ignoring unconfigured body");
                continue;
            };
            if body.is_tracked() {
                self.core.publish_pose(manager, local, body.pose(), now)?;
            } else {
                self.core.disable_tracker(manager, local)?;
            }
        }
        self.core.update(manager);
        Ok(())
    }
}

impl DeviceWorker for OpticalTracker {
    fn core(&self) -> &DeviceCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut DeviceCore {
        &mut self.core
    }

    fn begin(&mut self, _ctx: &WorkerContext<'_>) -> DeviceResult {
        self.last_frame = None;
        self.source
            .send_command(command::START)
            .map_err(|e| DeviceError::io(self.core.name(), &e))
    }

    fn step(&mut self, ctx: &WorkerContext<'_>) -> DeviceResult {
        let received = self
            .source
            .recv(&mut self.buffer)
            .map_err(|e| DeviceError::io(self.core.name(), &e))?;
        let Some(n) = received else {
            return Ok(());
        };
        let frame = match self.buffer.get(..n).map(OpticalFrame::decode) {
            Some(Ok(frame)) => frame,
            Some(Err(e)) => {
                debug!(error = %e, len = n, "Dropping malformed datagram");
                return Ok(());
            }
            None => return Ok(()),
        };
        self.publish(ctx.manager, &frame)
    }

    fn end(&mut self, _ctx: &WorkerContext<'_>) -> DeviceResult {
        self.source
            .send_command(command::STOP)
            .map_err(|e| DeviceError::io(self.core.name(), &e))
    }
}
