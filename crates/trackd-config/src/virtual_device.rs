//! Virtual device sections.
//!
//! ```yaml
//! Wand:
//!   trackType: direction
//!   rayDirection: [0, 1, 0]
//!   tracker: WandTracker
//!   buttons: [0, 1, Trigger]
//!   valuators: [JoyX, JoyY]
//! ```

use serde::{Deserialize, Serialize};
use trackd_errors::ConfigResult;
use trackd_types::TrackType;

use crate::section::ConfigSection;

/// Reference to a global slot by number or by the name it was allocated under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum IndexRef {
    Index(usize),
    Name(String),
}

impl From<usize> for IndexRef {
    fn from(index: usize) -> Self {
        IndexRef::Index(index)
    }
}

impl From<&str> for IndexRef {
    fn from(name: &str) -> Self {
        IndexRef::Name(name.to_string())
    }
}

/// Unresolved virtual device description; indices are resolved by the manager.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct VirtualDeviceConfig {
    #[serde(default)]
    pub track_type: TrackType,
    #[serde(default = "default_ray_direction")]
    pub ray_direction: [f64; 3],
    #[serde(default)]
    pub ray_start: f64,
    #[serde(default)]
    pub tracker: Option<IndexRef>,
    #[serde(default)]
    pub buttons: Vec<IndexRef>,
    #[serde(default)]
    pub valuators: Vec<IndexRef>,
    #[serde(default)]
    pub haptic_features: Vec<IndexRef>,
}

fn default_ray_direction() -> [f64; 3] {
    [0.0, 1.0, 0.0]
}

impl VirtualDeviceConfig {
    /// Parse a virtual device section.
    ///
    /// # Errors
    ///
    /// Returns an error for unknown keys, malformed values, or a tracked
    /// device without a tracker.
    pub fn from_section(section: &ConfigSection) -> ConfigResult<Self> {
        let config: Self = section.parse()?;
        if config.track_type.needs_tracker() && config.tracker.is_none() {
            return Err(section.invalid("tracker", "required unless trackType is none"));
        }
        Ok(config)
    }
}
