//! Aggregated device state and the per-cycle tracker bitmask.

use serde::Serialize;

use crate::sample::TrackerSample;

/// Fixed-size bitset over global tracker indices.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackerMask {
    words: Vec<u64>,
    len: usize,
}

impl TrackerMask {
    /// Empty mask able to hold `len` trackers.
    pub fn new(len: usize) -> Self {
        Self {
            words: vec![0; len.div_ceil(64)],
            len,
        }
    }

    /// Mask with every tracker in `0..len` set.
    pub fn full(len: usize) -> Self {
        let mut mask = Self::new(len);
        for index in 0..len {
            mask.set(index);
        }
        mask
    }

    /// Number of addressable trackers.
    pub fn len(&self) -> usize {
        self.len
    }

    /// True if the mask addresses no trackers.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Set one bit; out-of-range indices are ignored.
    pub fn set(&mut self, index: usize) {
        if index < self.len
            && let Some(word) = self.words.get_mut(index / 64)
        {
            *word |= 1 << (index % 64);
        }
    }

    /// Test one bit.
    pub fn contains(&self, index: usize) -> bool {
        index < self.len
            && self
                .words
                .get(index / 64)
                .is_some_and(|word| word & (1 << (index % 64)) != 0)
    }

    /// OR `other` into `self`.
    pub fn union_with(&mut self, other: &TrackerMask) {
        for (word, bits) in self.words.iter_mut().zip(&other.words) {
            *word |= bits;
        }
    }

    /// True if every bit set in `other` is set in `self`.
    pub fn covers(&self, other: &TrackerMask) -> bool {
        other
            .words
            .iter()
            .enumerate()
            .all(|(i, bits)| self.words.get(i).copied().unwrap_or(0) & bits == *bits)
    }

    /// Clear all bits.
    pub fn clear(&mut self) {
        self.words.iter_mut().for_each(|w| *w = 0);
    }

    /// Number of set bits.
    pub fn count(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// Indices of set bits in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.len).filter(|&i| self.contains(i))
    }
}

/// Flat snapshot of every tracker, button and valuator in the namespace.
///
/// Slots are indexed by global index. `generation` advances by one each time
/// every expected tracker has reported.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DeviceState {
    pub trackers: Vec<TrackerSample>,
    pub tracker_valid: Vec<bool>,
    pub buttons: Vec<bool>,
    pub valuators: Vec<f32>,
    pub generation: u64,
}

impl DeviceState {
    /// State with the given namespace sizes; all trackers start invalid.
    pub fn new(num_trackers: usize, num_buttons: usize, num_valuators: usize) -> Self {
        Self {
            trackers: vec![TrackerSample::default(); num_trackers],
            tracker_valid: vec![false; num_trackers],
            buttons: vec![false; num_buttons],
            valuators: vec![0.0; num_valuators],
            generation: 0,
        }
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

    /// Tracker sample, `None` if out of range.
    pub fn tracker(&self, index: usize) -> Option<&TrackerSample> {
        self.trackers.get(index)
    }

    /// Whether the tracker currently has a valid pose.
    pub fn is_tracker_valid(&self, index: usize) -> bool {
        self.tracker_valid.get(index).copied().unwrap_or(false)
    }

    /// Button value, `false` if out of range.
    pub fn button(&self, index: usize) -> bool {
        self.buttons.get(index).copied().unwrap_or(false)
    }

    /// Valuator value, `0.0` if out of range.
    pub fn valuator(&self, index: usize) -> f32 {
        self.valuators.get(index).copied().unwrap_or(0.0)
    }

    /// Write a tracker slot and mark it valid. Returns `false` if out of range.
    pub fn set_tracker(&mut self, index: usize, sample: TrackerSample) -> bool {
        match (self.trackers.get_mut(index), self.tracker_valid.get_mut(index)) {
            (Some(slot), Some(valid)) => {
                *slot = sample;
                *valid = true;
                true
            }
            _ => false,
        }
    }

    /// Mark a tracker invalid, keeping its last pose. Returns `false` if out of range.
    pub fn invalidate_tracker(&mut self, index: usize) -> bool {
        match self.tracker_valid.get_mut(index) {
            Some(valid) => {
                *valid = false;
                if let Some(slot) = self.trackers.get_mut(index) {
                    slot.linear_velocity = crate::Vector3::zeros();
                    slot.angular_velocity = crate::Vector3::zeros();
                }
                true
            }
            None => false,
        }
    }

    pub fn set_button(&mut self, index: usize, value: bool) -> bool {
        match self.buttons.get_mut(index) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }

    pub fn set_valuator(&mut self, index: usize, value: f32) -> bool {
        match self.valuators.get_mut(index) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }

    /// Number of pressed buttons.
    pub fn pressed_button_count(&self) -> usize {
        self.buttons.iter().filter(|&&b| b).count()
    }
}
