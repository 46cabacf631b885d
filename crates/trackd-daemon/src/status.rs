//! Periodic status output.

use serde::Serialize;
use trackd_manager::{DeviceManager, ManagerStats};

/// One status sample of the manager.
#[derive(Debug, Serialize)]
pub struct StatusReport {
    pub generation: u64,
    pub stats: ManagerStats,
    pub valid_trackers: usize,
    pub num_trackers: usize,
    pub pressed_buttons: usize,
    /// Full state, only in JSON output.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<trackd_types::DeviceState>,
}

impl StatusReport {
    pub fn collect(manager: &DeviceManager, with_state: bool) -> Self {
        let state = manager.snapshot();
        Self {
            generation: state.generation,
            stats: manager.stats(),
            valid_trackers: state.tracker_valid.iter().filter(|&&v| v).count(),
            num_trackers: state.num_trackers(),
            pressed_buttons: state.pressed_button_count(),
            state: with_state.then_some(state),
        }
    }

    pub fn line(&self) -> String {
        format!(
            "generation {} | trackers {}/{} valid | {} buttons pressed | {} samples, {} cycles ({} forced), {} disabled",
            self.generation,
            self.valid_trackers,
            self.num_trackers,
            self.pressed_buttons,
            self.stats.samples,
            self.stats.cycles,
            self.stats.forced_cycles,
            self.stats.disabled_trackers,
        )
    }
}

#[cfg(test)]
mod tests {
    use trackd_manager::DeviceManagerBuilder;
    use trackd_types::{RigidTransform, TrackerSample};

    use super::*;

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    #[test]
    fn test_status_line() -> TestResult {
        let mut builder = DeviceManagerBuilder::new();
        let wand = builder.register_device("wand");
        let tracker = builder.add_tracker(wand, "Wand");
        builder.add_tracker(wand, "Spare");
        let trigger = builder.add_button(wand, "Trigger");
        let manager = builder.build()?;
        manager.set_tracker_state(tracker, TrackerSample::at_rest(RigidTransform::identity(), manager.now()))?;
        manager.set_button_state(trigger, true)?;
        manager.update_state(wand);

        let report = StatusReport::collect(&manager, false);
        insta::assert_snapshot!(
            report.line(),
            @"generation 1 | trackers 1/2 valid | 1 buttons pressed | 1 samples, 1 cycles (0 forced), 0 disabled"
        );
        assert!(report.state.is_none());
        Ok(())
    }

    #[test]
    fn test_json_includes_state_on_request() -> TestResult {
        let mut builder = DeviceManagerBuilder::new();
        let pad = builder.register_device("pad");
        builder.add_valuator(pad, "X");
        let manager = builder.build()?;

        let json = serde_json::to_value(StatusReport::collect(&manager, true))?;
        assert_eq!(json["generation"], 0);
        assert_eq!(json["state"]["valuators"][0], 0.0);
        let brief = serde_json::to_value(StatusReport::collect(&manager, false))?;
        assert!(brief.get("state").is_none());
        Ok(())
    }
}
