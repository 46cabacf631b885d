//! Built-in devices.

pub mod hosted;
pub mod joystick;
pub mod optical;
pub mod simulated;
pub mod station;

pub use hosted::HostedDevice;
pub use joystick::JoystickDevice;
pub use optical::OpticalTracker;
pub use simulated::SimulatedDevice;
pub use station::StationTracker;
