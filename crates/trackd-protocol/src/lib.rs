//! Wire protocols of trackd tracking hardware
//!
//! - [`report`]: little-endian record parsing and building
//! - [`header`] and [`sync`]: header matching and the resynchronizing
//!   record state machine shared by the streaming serial protocols
//! - [`station`]: multi-station serial tracker records and commands
//! - [`optical`]: UDP optical tracker frames
//! - [`joystick`]: Linux joystick events
//!
//! # Example
//!
//! ```
//! use trackd_protocol::{RecordSync, StationFormat, StationRecord, SyncState};
//!
//! let mut sync = RecordSync::new(StationFormat::new([]));
//! let mut record = b"\r\n01 ".to_vec();
//! record.extend_from_slice(&[0u8; 25]);
//!
//! let mut stream = b"noise".to_vec();
//! stream.extend_from_slice(&record);
//!
//! let mut stations = Vec::new();
//! sync.feed(&stream, |bytes| {
//!     if let Ok(r) = StationRecord::decode(bytes) {
//!         stations.push(r.station);
//!     }
//! });
//! assert_eq!(stations, vec![0]);
//! assert_eq!(sync.state(), SyncState::Synchronized);
//! ```

#![deny(unsafe_op_in_unsafe_fn)]
#![deny(clippy::unwrap_used)]

pub mod header;
pub mod joystick;
pub mod optical;
pub mod report;
pub mod station;
pub mod sync;

pub use header::{HeaderElement, HeaderMatcher, HeaderPattern, MatchStep};
pub use joystick::{JoystickEvent, JoystickInput};
pub use optical::{OpticalBody, OpticalFrame};
pub use report::{ReportBuilder, ReportParser};
pub use station::{StationFormat, StationRecord, StatusReplyScanner, station_char, station_index};
pub use sync::{RecordFormat, RecordSync, SyncState, SyncStats};
