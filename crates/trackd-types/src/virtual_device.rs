//! Named groupings of global indices exposed to clients.

use serde::{Deserialize, Serialize};

use crate::geometry::Vector3;

/// Which parts of the tracker pose a virtual device uses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackType {
    /// No tracker; buttons and valuators only.
    #[default]
    None,
    /// 3-DOF position.
    Position,
    /// Position plus a pointing ray.
    Direction,
    /// Full 6-DOF.
    Full,
}

impl TrackType {
    /// Whether a tracker index is required.
    pub fn needs_tracker(self) -> bool {
        !matches!(self, TrackType::None)
    }
}

/// A logical input device built from already allocated global indices.
///
/// Descriptors never own state; they only reference slots of
/// [`DeviceState`](crate::DeviceState).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VirtualDeviceDescriptor {
    pub name: String,
    pub track_type: TrackType,
    /// Pointing direction in the tracker's local frame.
    pub ray_direction: Vector3,
    /// Ray origin offset along `ray_direction`.
    pub ray_start: f64,
    pub tracker_index: Option<usize>,
    pub button_indices: Vec<usize>,
    pub valuator_indices: Vec<usize>,
    pub haptic_indices: Vec<usize>,
}

impl VirtualDeviceDescriptor {
    /// Descriptor with no tracker, buttons or valuators, pointing along +Y.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            track_type: TrackType::None,
            ray_direction: Vector3::y(),
            ray_start: 0.0,
            tracker_index: None,
            button_indices: Vec::new(),
            valuator_indices: Vec::new(),
            haptic_indices: Vec::new(),
        }
    }

    /// Attach a tracker.
    #[must_use]
    pub fn with_tracker(mut self, track_type: TrackType, index: usize) -> Self {
        self.track_type = track_type;
        self.tracker_index = Some(index);
        self
    }

    /// Set the pointing ray.
    #[must_use]
    pub fn with_ray(mut self, direction: Vector3, start: f64) -> Self {
        self.ray_direction = direction;
        self.ray_start = start;
        self
    }

    #[must_use]
    pub fn with_buttons(mut self, indices: impl IntoIterator<Item = usize>) -> Self {
        self.button_indices.extend(indices);
        self
    }

    #[must_use]
    pub fn with_valuators(mut self, indices: impl IntoIterator<Item = usize>) -> Self {
        self.valuator_indices.extend(indices);
        self
    }

    #[must_use]
    pub fn with_haptics(mut self, indices: impl IntoIterator<Item = usize>) -> Self {
        self.haptic_indices.extend(indices);
        self
    }

    pub fn num_buttons(&self) -> usize {
        self.button_indices.len()
    }

    pub fn num_valuators(&self) -> usize {
        self.valuator_indices.len()
    }

    /// Global index of the descriptor's `i`-th button.
    pub fn button_index(&self, i: usize) -> Option<usize> {
        self.button_indices.get(i).copied()
    }

    /// Global index of the descriptor's `i`-th valuator.
    pub fn valuator_index(&self, i: usize) -> Option<usize> {
        self.valuator_indices.get(i).copied()
    }
}
