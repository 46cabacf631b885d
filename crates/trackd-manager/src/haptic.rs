//! Routing of haptic requests to the owning device.

use std::fmt;

/// One haptic pulse request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HapticRequest {
    /// Feature index local to the owning device.
    pub local_index: usize,
    pub duration_ms: u32,
    pub frequency: u32,
    /// 0.0 to 1.0.
    pub amplitude: f32,
}

/// Receives haptic requests for the features a device owns.
///
/// Called from consumer threads; implementations hand the request to the
/// device thread without blocking.
pub trait HapticSink: Send + Sync + fmt::Debug {
    fn haptic_tick(&self, request: HapticRequest);
}
