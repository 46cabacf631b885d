//! Manager counters.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Point-in-time copy of [`ManagerCounters`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ManagerStats {
    /// Tracker samples written.
    pub samples: u64,
    /// Button and valuator writes.
    pub input_writes: u64,
    /// Completed cycles, forced ones included.
    pub cycles: u64,
    /// Cycles completed by the cycle timeout.
    pub forced_cycles: u64,
    /// Valid trackers marked invalid.
    pub disabled_trackers: u64,
    /// Haptic requests routed to devices.
    pub haptic_requests: u64,
}

/// Relaxed atomic counters updated by device threads.
#[derive(Debug, Default)]
pub struct ManagerCounters {
    samples: AtomicU64,
    input_writes: AtomicU64,
    cycles: AtomicU64,
    forced_cycles: AtomicU64,
    disabled_trackers: AtomicU64,
    haptic_requests: AtomicU64,
}

impl ManagerCounters {
    pub fn inc_samples(&self) {
        self.samples.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_input_writes(&self) {
        self.input_writes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_cycles(&self, forced: bool) {
        self.cycles.fetch_add(1, Ordering::Relaxed);
        if forced {
            self.forced_cycles.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn inc_disabled_trackers(&self) {
        self.disabled_trackers.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_haptic_requests(&self) {
        self.haptic_requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> ManagerStats {
        ManagerStats {
            samples: self.samples.load(Ordering::Relaxed),
            input_writes: self.input_writes.load(Ordering::Relaxed),
            cycles: self.cycles.load(Ordering::Relaxed),
            forced_cycles: self.forced_cycles.load(Ordering::Relaxed),
            disabled_trackers: self.disabled_trackers.load(Ordering::Relaxed),
            haptic_requests: self.haptic_requests.load(Ordering::Relaxed),
        }
    }
}
