//! Convenience re-exports for common test utilities.

pub use crate::assertions::{assert_pose_near, assert_vec_near};
pub use crate::fixtures::{
    OpticalBodyFixture, StationRecordFixture, joystick_event, optical_frame, status_reply,
};
pub use crate::must::{must, must_some, must_with};

pub type TestResult = Result<(), Box<dyn std::error::Error>>;
