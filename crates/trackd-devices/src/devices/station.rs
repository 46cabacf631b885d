//! Multi-station RS-232 tracker.
//!
//! ```yaml
//! tracker:
//!   type: stationTracker
//!   devicePort: /dev/ttyS0
//!   deviceBaudRate: 115200
//!   resetDevice: false
//!   statusTimeout: 10
//!   stationNames: [Head, Wand]
//!   Wand:
//!     id: 2
//!     numButtons: 4
//!     joystick: true
//! ```
//!
//! Each station owns one tracker, `numButtons` buttons taken from the low
//! bits of the status byte, and two valuators if it reports a joystick.

use std::time::{Duration, Instant};

use serde::Deserialize;
use tracing::{debug, info, trace};
use trackd_config::ConfigSection;
use trackd_errors::{DeviceError, DeviceResult, TrackdError};
use trackd_manager::{DeviceManager, DeviceManagerBuilder};
use trackd_protocol::station::{MAX_STATIONS, command};
use trackd_protocol::{RecordSync, StationFormat, StationRecord, StatusReplyScanner, SyncState};
use trackd_types::IndexKind;

use crate::core::{DeviceCore, SlotCounts};
use crate::device::{DeviceWorker, ThreadedDevice, WorkerContext};
use crate::transport::{SerialTransport, Transport};

/// Default status handshake timeout.
pub const STATUS_TIMEOUT: Duration = Duration::from_secs(10);
/// Pause between consecutive commands.
pub const SETTLE_DELAY: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct StationSection {
    /// 1-based station number.
    id: Option<usize>,
    #[serde(default)]
    num_buttons: usize,
    #[serde(default)]
    joystick: bool,
}

/// Per-station layout resolved at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Station {
    name: String,
    tracker: usize,
    first_button: usize,
    num_buttons: usize,
    /// First of two joystick valuators.
    joystick: Option<usize>,
}

/// Station configuration and the device-wide slot counts it implies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StationLayout {
    stations: Vec<Station>,
    /// Station index to position in `stations`.
    by_station: Vec<Option<usize>>,
}

impl StationLayout {
    /// # Errors
    ///
    /// Returns an error for a missing `stationNames` list, an out-of-range or
    /// duplicate station id, or a malformed station section.
    pub fn from_config(section: &ConfigSection) -> trackd_errors::ConfigResult<Self> {
        let names: Vec<String> = section.require("stationNames")?;
        let mut by_station = vec![None; MAX_STATIONS];
        let mut stations = Vec::with_capacity(names.len());
        let (mut buttons, mut valuators) = (0, 0);

        for (position, name) in names.iter().enumerate() {
            let settings: StationSection = match section.subsection_opt(name)? {
                Some(sub) => sub.parse()?,
                None => StationSection::default(),
            };
            let id = settings.id.unwrap_or(position + 1);
            let key = format!("{name}/id");
            let slot = id
                .checked_sub(1)
                .and_then(|index| by_station.get_mut(index))
                .ok_or_else(|| section.invalid(&key, format!("{id} is outside 1..={MAX_STATIONS}")))?;
            if slot.is_some() {
                return Err(section.invalid(&key, format!("station {id} listed twice")));
            }
            *slot = Some(position);

            stations.push(Station {
                name: name.clone(),
                tracker: position,
                first_button: buttons,
                num_buttons: settings.num_buttons.min(8),
                joystick: settings.joystick.then_some(valuators),
            });
            buttons += settings.num_buttons.min(8);
            if settings.joystick {
                valuators += 2;
            }
        }
        Ok(Self {
            stations,
            by_station,
        })
    }

    pub fn counts(&self) -> SlotCounts {
        SlotCounts {
            trackers: self.stations.len(),
            buttons: self.stations.iter().map(|s| s.num_buttons).sum(),
            valuators: self.stations.iter().filter(|s| s.joystick.is_some()).count() * 2,
            haptic_features: 0,
        }
    }

    /// Station indices whose records carry joystick bytes.
    pub fn joystick_stations(&self) -> Vec<usize> {
        self.by_station
            .iter()
            .enumerate()
            .filter_map(|(station, position)| {
                position
                    .and_then(|p| self.stations.get(p))
                    .filter(|s| s.joystick.is_some())
                    .map(|_| station)
            })
            .collect()
    }

    fn station(&self, station: usize) -> Option<&Station> {
        self.by_station
            .get(station)
            .copied()
            .flatten()
            .and_then(|p| self.stations.get(p))
    }

    fn slot_name(&self, device: &str, kind: IndexKind, local: usize) -> String {
        let owner = |pred: &dyn Fn(&Station) -> Option<usize>| {
            self.stations.iter().find_map(|s| pred(s).map(|offset| (s, offset)))
        };
        match kind {
            IndexKind::Tracker => self
                .stations
                .get(local)
                .map_or_else(|| format!("{device}/tracker{local}"), |s| s.name.clone()),
            IndexKind::Button => owner(&|s| {
                (s.first_button..s.first_button + s.num_buttons)
                    .contains(&local)
                    .then(|| local - s.first_button)
            })
            .map_or_else(
                || format!("{device}/button{local}"),
                |(s, offset)| format!("{}/button{offset}", s.name),
            ),
            IndexKind::Valuator => owner(&|s| {
                s.joystick
                    .filter(|first| (*first..first + 2).contains(&local))
                    .map(|first| local - first)
            })
            .map_or_else(
                || format!("{device}/valuator{local}"),
                |(s, offset)| format!("{}/{}", s.name, if offset == 0 { "joyX" } else { "joyY" }),
            ),
            IndexKind::Haptic => format!("{device}/haptic{local}"),
        }
    }
}

/// Polling half of the station tracker.
pub struct StationTracker {
    core: DeviceCore,
    transport: Box<dyn Transport>,
    layout: StationLayout,
    sync: RecordSync<StationFormat>,
    buffer: Vec<u8>,
}

impl std::fmt::Debug for StationTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StationTracker")
            .field("core", &self.core)
            .field("endpoint", &self.transport.endpoint())
            .field("sync", &self.sync.state())
            .finish_non_exhaustive()
    }
}

impl StationTracker {
    /// Open `devicePort` and build the device.
    ///
    /// # Errors
    ///
    /// Returns configuration errors, [`DeviceError::OpenFailed`] if the port
    /// cannot be opened, or [`DeviceError::HandshakeTimeout`] if the unit
    /// does not answer the status request.
    pub fn from_config(
        name: &str,
        section: &ConfigSection,
        builder: &mut DeviceManagerBuilder,
    ) -> trackd_errors::Result<ThreadedDevice<Self>> {
        let port: String = section.require("devicePort")?;
        let baud_rate: u32 = section.get_or("deviceBaudRate", 115_200)?;
        let transport = SerialTransport::open(&port, baud_rate)
            .map_err(|e| DeviceError::open_failed(name, &port, e))?;
        Self::with_transport(name, section, builder, Box::new(transport))
    }

    /// Build the device on an already opened transport and run the startup
    /// handshake: optional reset, status request, binary output mode.
    ///
    /// # Errors
    ///
    /// Returns configuration errors or a handshake failure.
    pub fn with_transport(
        name: &str,
        section: &ConfigSection,
        builder: &mut DeviceManagerBuilder,
        mut transport: Box<dyn Transport>,
    ) -> trackd_errors::Result<ThreadedDevice<Self>> {
        let layout = StationLayout::from_config(section)?;
        let reset: bool = section.get_or("resetDevice", false)?;
        let timeout = section
            .get::<f64>("statusTimeout")?
            .filter(|s| s.is_finite() && *s > 0.0)
            .map_or(STATUS_TIMEOUT, Duration::from_secs_f64);

        handshake(name, transport.as_mut(), reset, timeout)?;

        let core = DeviceCore::from_config(name, section, builder, layout.counts(), &|kind, local| {
            layout.slot_name(name, kind, local)
        })?;
        info!(
            device = name,
            stations = layout.stations.len(),
            endpoint = %transport.endpoint(),
            "Station tracker ready"
        );
        let sync = RecordSync::new(StationFormat::new(layout.joystick_stations()));
        Ok(ThreadedDevice::new(Self {
            core,
            transport,
            layout,
            sync,
            buffer: vec![0; 256],
        }))
    }

    fn io_error(&self, err: &std::io::Error) -> DeviceError {
        DeviceError::io(self.core.name(), err)
    }

    fn publish(
        core: &mut DeviceCore,
        layout: &StationLayout,
        manager: &DeviceManager,
        bytes: &[u8],
    ) -> DeviceResult {
        let record = match StationRecord::decode(bytes) {
            Ok(record) => record,
            Err(e) => {
                trace!(error = %e, "Dropping undecodable record");
                return Ok(());
            }
        };
        let Some(station) = layout.station(record.station) else {
            trace!(station = record.station, "Dropping record of unconfigured station");
            return Ok(());
        };
        core.publish_pose(manager, station.tracker, record.pose(), manager.now())?;
        for bit in 0..station.num_buttons {
            core.publish_button(manager, station.first_button + bit, record.button(bit))?;
        }
        if let (Some(first), Some([x, y])) = (station.joystick, record.joystick_axes()) {
            core.publish_valuator(manager, first, x)?;
            core.publish_valuator(manager, first + 1, y)?;
        }
        core.update(manager);
        Ok(())
    }
}

/// Reset (optional), request status until a reply arrives, switch to binary.
fn handshake(
    name: &str,
    transport: &mut dyn Transport,
    reset: bool,
    timeout: Duration,
) -> Result<(), TrackdError> {
    let io = |e: std::io::Error| DeviceError::io(name, &e);
    if reset {
        debug!(device = name, "Resetting unit");
        transport.write_all(&[command::RESET]).map_err(io)?;
        std::thread::sleep(SETTLE_DELAY);
    }
    transport.write_all(&[command::CONTINUOUS_OFF]).map_err(io)?;
    std::thread::sleep(SETTLE_DELAY);
    transport.clear_input().map_err(io)?;

    let deadline = Instant::now() + timeout;
    let mut scanner = StatusReplyScanner::new();
    let mut buffer = [0u8; 64];
    let status = 'wait: loop {
        transport.write_all(&[command::STATUS]).map_err(io)?;
        transport.flush().map_err(io)?;
        let retry_at = Instant::now() + SETTLE_DELAY * 5;
        while Instant::now() < retry_at.min(deadline) {
            let n = transport.read(&mut buffer).map_err(io)?;
            if n == 0 {
                std::thread::sleep(Duration::from_millis(5));
                continue;
            }
            if let Some(line) = buffer.get(..n).and_then(|bytes| scanner.feed(bytes)) {
                break 'wait line;
            }
        }
        if Instant::now() >= deadline {
            let millis = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
            return Err(DeviceError::handshake_timeout(name, millis).into());
        }
    };
    info!(device = name, status = %String::from_utf8_lossy(&status), "Unit answered status request");

    transport.write_all(&[command::BINARY_OUTPUT]).map_err(io)?;
    std::thread::sleep(SETTLE_DELAY);
    Ok(())
}

impl DeviceWorker for StationTracker {
    fn core(&self) -> &DeviceCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut DeviceCore {
        &mut self.core
    }

    fn begin(&mut self, _ctx: &WorkerContext<'_>) -> DeviceResult {
        self.sync.reset();
        self.transport
            .write_all(&[command::CONTINUOUS_ON])
            .map_err(|e| self.io_error(&e))
    }

    fn step(&mut self, ctx: &WorkerContext<'_>) -> DeviceResult {
        let n = match self.transport.read(&mut self.buffer) {
            Ok(n) => n,
            Err(e) => return Err(self.io_error(&e)),
        };
        let Some(bytes) = self.buffer.get(..n) else {
            return Ok(());
        };
        if bytes.is_empty() {
            return Ok(());
        }

        let was_synced = self.sync.state() == SyncState::Synchronized;
        let (core, layout) = (&mut self.core, &self.layout);
        let mut result = Ok(());
        self.sync.feed(bytes, |record| {
            if result.is_ok() {
                result = Self::publish(core, layout, ctx.manager, record);
            }
        });
        match (was_synced, self.sync.state()) {
            (false, SyncState::Synchronized) => debug!("Acquired record synchronization"),
            (true, SyncState::Syncing) => debug!("Lost record synchronization"),
            _ => {}
        }
        result
    }

    fn end(&mut self, _ctx: &WorkerContext<'_>) -> DeviceResult {
        self.transport
            .write_all(&[command::CONTINUOUS_OFF])
            .map_err(|e| self.io_error(&e))?;
        self.transport.flush().map_err(|e| self.io_error(&e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    #[test]
    fn test_layout_counts_and_names() -> TestResult {
        let section = ConfigSection::from_yaml(
            "tracker",
            r#"
stationNames: [Head, Wand]
Wand:
  id: 3
  numButtons: 4
  joystick: true
"#,
        )?;
        let layout = StationLayout::from_config(&section)?;
        assert_eq!(
            layout.counts(),
            SlotCounts {
                trackers: 2,
                buttons: 4,
                valuators: 2,
                haptic_features: 0
            }
        );
        assert_eq!(layout.joystick_stations(), vec![2]);
        assert_eq!(layout.station(0).map(|s| s.name.as_str()), Some("Head"));
        assert_eq!(layout.station(2).map(|s| s.tracker), Some(1));
        assert!(layout.station(1).is_none());
        assert_eq!(layout.slot_name("tracker", IndexKind::Button, 2), "Wand/button2");
        assert_eq!(layout.slot_name("tracker", IndexKind::Valuator, 1), "Wand/joyY");
        Ok(())
    }

    #[test]
    fn test_duplicate_station_rejected() -> TestResult {
        let section = ConfigSection::from_yaml(
            "tracker",
            "stationNames: [A, B]\nB:\n  id: 1\n",
        )?;
        assert!(StationLayout::from_config(&section).is_err());
        let section = ConfigSection::from_yaml("tracker", "stationNames: [A]\nA:\n  id: 99\n")?;
        assert!(StationLayout::from_config(&section).is_err());
        Ok(())
    }
}
