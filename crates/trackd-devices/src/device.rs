//! Device contract and the polling thread that drives a device.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{debug, error, info, info_span, warn};
use trackd_errors::{DeviceError, DeviceResult};
use trackd_manager::{DeviceId, DeviceManager};

use crate::core::DeviceCore;

/// Pause after a transient step error before polling again.
const ERROR_BACKOFF: Duration = Duration::from_millis(10);

/// A running or stoppable source of tracker, button and valuator data.
///
/// `start` and `stop` are idempotent. Implementations stop themselves when
/// dropped.
pub trait Device: Send + fmt::Debug {
    fn name(&self) -> &str;

    fn id(&self) -> DeviceId;

    /// Enter streaming mode and spawn the polling thread.
    ///
    /// # Errors
    ///
    /// Returns an error if the device rejects streaming mode or the thread
    /// cannot be spawned.
    fn start(&mut self, manager: &Arc<DeviceManager>) -> DeviceResult;

    /// Request cancellation and join the polling thread.
    ///
    /// # Errors
    ///
    /// Returns [`DeviceError::ThreadPanicked`] if the thread panicked.
    fn stop(&mut self) -> DeviceResult;

    fn is_active(&self) -> bool;
}

/// What a polling thread has access to.
#[derive(Debug, Clone, Copy)]
pub struct WorkerContext<'a> {
    pub manager: &'a DeviceManager,
    cancel: &'a AtomicBool,
}

impl<'a> WorkerContext<'a> {
    pub fn new(manager: &'a DeviceManager, cancel: &'a AtomicBool) -> Self {
        Self { manager, cancel }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::Acquire)
    }

    /// Sleep for `duration`, waking early on cancellation.
    pub fn sleep(&self, duration: Duration) {
        const SLICE: Duration = Duration::from_millis(5);
        let mut remaining = duration;
        while !remaining.is_zero() && !self.is_cancelled() {
            let step = remaining.min(SLICE);
            thread::sleep(step);
            remaining = remaining.saturating_sub(step);
        }
    }
}

/// Protocol-specific half of a device, driven by [`ThreadedDevice`].
pub trait DeviceWorker: Send + 'static {
    fn core(&self) -> &DeviceCore;

    fn core_mut(&mut self) -> &mut DeviceCore;

    /// Put the hardware into streaming mode. Runs on the caller of
    /// [`Device::start`].
    ///
    /// # Errors
    ///
    /// Returns an error if the hardware cannot be switched.
    fn begin(&mut self, _ctx: &WorkerContext<'_>) -> DeviceResult {
        Ok(())
    }

    /// One bounded poll of the transport. Must return within roughly one
    /// transport read timeout.
    ///
    /// # Errors
    ///
    /// A disconnect error ends the thread and disables the device's trackers;
    /// other errors are logged and polling continues.
    fn step(&mut self, ctx: &WorkerContext<'_>) -> DeviceResult;

    /// Leave streaming mode. Runs on the polling thread before it exits.
    ///
    /// # Errors
    ///
    /// Returns an error if the hardware cannot be switched back.
    fn end(&mut self, _ctx: &WorkerContext<'_>) -> DeviceResult {
        Ok(())
    }
}

/// [`Device`] running a [`DeviceWorker`] on a dedicated thread named
/// `trackd-<device>`.
///
/// The worker moves into the thread on start and comes back when the thread
/// is joined, so a stopped device can be started again.
pub struct ThreadedDevice<W: DeviceWorker> {
    name: String,
    id: DeviceId,
    worker: Option<W>,
    handle: Option<JoinHandle<W>>,
    cancel: Arc<AtomicBool>,
}

impl<W: DeviceWorker> fmt::Debug for ThreadedDevice<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThreadedDevice")
            .field("name", &self.name)
            .field("id", &self.id)
            .field("active", &self.is_active())
            .finish_non_exhaustive()
    }
}

impl<W: DeviceWorker> ThreadedDevice<W> {
    pub fn new(worker: W) -> Self {
        Self {
            name: worker.core().name().to_string(),
            id: worker.core().id(),
            worker: Some(worker),
            handle: None,
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    /// The worker while the device is stopped.
    pub fn worker(&self) -> Option<&W> {
        self.worker.as_ref()
    }

    fn run(mut worker: W, manager: Arc<DeviceManager>, cancel: Arc<AtomicBool>) -> W {
        let ctx = WorkerContext::new(&manager, &cancel);
        let device = worker.core().name().to_string();
        let id = worker.core().id();
        debug!("Polling thread running");

        while !ctx.is_cancelled() {
            match worker.step(&ctx) {
                Ok(()) => {}
                Err(e) if e.is_disconnect() => {
                    warn!(error = %e, "Device disconnected, disabling its trackers");
                    manager.disable_trackers_of(id);
                    break;
                }
                Err(e) => {
                    debug!(error = %e, severity = %e.severity(), "Transient device error");
                    ctx.sleep(ERROR_BACKOFF);
                }
            }
        }

        if let Err(e) = worker.end(&ctx) {
            warn!(device = %device, error = %e, "Failed to leave streaming mode");
        }
        debug!("Polling thread exiting");
        worker
    }

    /// Take the worker back from a polling thread.
    fn join(&mut self, handle: JoinHandle<W>) -> DeviceResult {
        match handle.join() {
            Ok(worker) => {
                self.worker = Some(worker);
                Ok(())
            }
            Err(_) => {
                error!(device = %self.name, "Polling thread panicked");
                Err(DeviceError::ThreadPanicked(self.name.clone()))
            }
        }
    }
}

impl<W: DeviceWorker> Device for ThreadedDevice<W> {
    fn name(&self) -> &str {
        &self.name
    }

    fn id(&self) -> DeviceId {
        self.id
    }

    fn start(&mut self, manager: &Arc<DeviceManager>) -> DeviceResult {
        // A thread that ended on its own (disconnect) still holds the worker.
        if let Some(handle) = self.handle.take_if(|handle| handle.is_finished()) {
            self.join(handle)?;
            debug!(device = %self.name, "Reclaimed worker from finished polling thread");
        }
        if self.handle.is_some() {
            return Ok(());
        }
        let mut worker = self
            .worker
            .take()
            .ok_or_else(|| DeviceError::ThreadPanicked(self.name.clone()))?;

        self.cancel.store(false, Ordering::Release);
        worker.core_mut().restart();
        let begun = worker.begin(&WorkerContext::new(manager, &self.cancel));
        if let Err(e) = begun {
            self.worker = Some(worker);
            return Err(e);
        }

        let manager = Arc::clone(manager);
        let cancel = Arc::clone(&self.cancel);
        let span = info_span!("device", name = %self.name);
        let handle = thread::Builder::new()
            .name(format!("trackd-{}", self.name))
            .spawn(move || span.in_scope(|| Self::run(worker, manager, cancel)))
            .map_err(|e| DeviceError::ThreadSpawn {
                device: self.name.clone(),
                message: e.to_string(),
            })?;
        self.handle = Some(handle);
        info!(device = %self.name, "Device started");
        Ok(())
    }

    fn stop(&mut self) -> DeviceResult {
        let Some(handle) = self.handle.take() else {
            return Ok(());
        };
        self.cancel.store(true, Ordering::Release);
        self.join(handle)?;
        info!(device = %self.name, "Device stopped");
        Ok(())
    }

    fn is_active(&self) -> bool {
        self.handle
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }
}

impl<W: DeviceWorker> Drop for ThreadedDevice<W> {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            warn!(device = %self.name, error = %e, "Failed to stop device on drop");
        }
    }
}
