//! Index mapping, calibration and publishing shared by all devices.

use std::fmt;

use tracing::{debug, trace};
use trackd_calibration::{Calibrator, ValuatorShaping, calibrator_from_config};
use trackd_config::ConfigSection;
use trackd_errors::{ConfigResult, DeviceResult};
use trackd_manager::{DeviceId, DeviceManager, DeviceManagerBuilder};
use trackd_types::{IndexKind, MonotonicMicros, RigidTransform, TrackerSample};

use crate::velocity::VelocityEstimator;

/// Number of slots a device owns in each namespace.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SlotCounts {
    pub trackers: usize,
    pub buttons: usize,
    pub valuators: usize,
    pub haptic_features: usize,
}

impl SlotCounts {
    pub fn get(&self, kind: IndexKind) -> usize {
        match kind {
            IndexKind::Tracker => self.trackers,
            IndexKind::Button => self.buttons,
            IndexKind::Valuator => self.valuators,
            IndexKind::Haptic => self.haptic_features,
        }
    }

    /// Counts from `numTrackers`, `numButtons`, `numValuators` and
    /// `numHapticFeatures`, each defaulting to `defaults`.
    ///
    /// # Errors
    ///
    /// Returns an error for a malformed count.
    pub fn from_config(section: &ConfigSection, defaults: SlotCounts) -> ConfigResult<Self> {
        Ok(Self {
            trackers: section.get_or(IndexKind::Tracker.count_key(), defaults.trackers)?,
            buttons: section.get_or(IndexKind::Button.count_key(), defaults.buttons)?,
            valuators: section.get_or(IndexKind::Valuator.count_key(), defaults.valuators)?,
            haptic_features: section
                .get_or(IndexKind::Haptic.count_key(), defaults.haptic_features)?,
        })
    }
}

/// Local to global index table of one device. Immutable after construction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexMap {
    trackers: Vec<usize>,
    buttons: Vec<usize>,
    valuators: Vec<usize>,
    haptics: Vec<usize>,
}

impl IndexMap {
    fn slots(&self, kind: IndexKind) -> &[usize] {
        match kind {
            IndexKind::Tracker => &self.trackers,
            IndexKind::Button => &self.buttons,
            IndexKind::Valuator => &self.valuators,
            IndexKind::Haptic => &self.haptics,
        }
    }

    fn slots_mut(&mut self, kind: IndexKind) -> &mut Vec<usize> {
        match kind {
            IndexKind::Tracker => &mut self.trackers,
            IndexKind::Button => &mut self.buttons,
            IndexKind::Valuator => &mut self.valuators,
            IndexKind::Haptic => &mut self.haptics,
        }
    }

    pub fn global(&self, kind: IndexKind, local: usize) -> Option<usize> {
        self.slots(kind).get(local).copied()
    }

    pub fn len(&self, kind: IndexKind) -> usize {
        self.slots(kind).len()
    }

    pub fn counts(&self) -> SlotCounts {
        SlotCounts {
            trackers: self.trackers.len(),
            buttons: self.buttons.len(),
            valuators: self.valuators.len(),
            haptic_features: self.haptics.len(),
        }
    }
}

/// Everything a device thread needs besides its transport and parser.
///
/// Built during startup from the device's configuration section. Allocates
/// the device's global slots in the builder, then maps local indices,
/// calibrates tracker poses, applies post transformations and estimates
/// velocities while publishing.
pub struct DeviceCore {
    name: String,
    id: DeviceId,
    index_map: IndexMap,
    calibrator: Option<Box<dyn Calibrator>>,
    post_transforms: Vec<Option<RigidTransform>>,
    velocity: VelocityEstimator,
}

impl fmt::Debug for DeviceCore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceCore")
            .field("name", &self.name)
            .field("id", &self.id)
            .field("index_map", &self.index_map)
            .field("calibrator", &self.calibrator.as_ref().map(|c| c.kind()))
            .finish_non_exhaustive()
    }
}

impl DeviceCore {
    /// Register `name` with the builder and allocate its slots.
    ///
    /// For every namespace, local slot `i` goes to `<kind>Index<i>` if set,
    /// else to `<kind>IndexBase + i` if a base is set, else to the next free
    /// index. `default_names` supplies slot names where the section has no
    /// `<kind>Names` list.
    ///
    /// # Errors
    ///
    /// Returns an error for malformed keys, index collisions, invalid valuator
    /// shaping or an unknown calibrator.
    pub fn from_config(
        name: &str,
        section: &ConfigSection,
        builder: &mut DeviceManagerBuilder,
        counts: SlotCounts,
        default_names: &dyn Fn(IndexKind, usize) -> String,
    ) -> ConfigResult<Self> {
        let id = builder.register_device(name);
        let mut index_map = IndexMap::default();

        for kind in IndexKind::ALL {
            let base: Option<usize> = section.get(kind.base_key())?;
            let names = section.string_list(kind.names_key())?;
            for local in 0..counts.get(kind) {
                let slot_name = names
                    .get(local)
                    .cloned()
                    .unwrap_or_else(|| default_names(kind, local));
                let explicit: Option<usize> = section.get(&format!("{}{local}", kind.slot_key()))?;
                let global = match explicit.or(base.map(|b| b + local)) {
                    Some(index) => builder.claim(kind, id, index, local, slot_name)?,
                    None => builder.allocate(kind, id, local, slot_name),
                };
                index_map.slots_mut(kind).push(global);
            }
        }

        for (local, &global) in index_map.valuators.iter().enumerate() {
            let shaping = ValuatorShaping::from_config(section, local)?;
            if !shaping.is_identity() {
                builder.set_valuator_shaping(global, shaping)?;
            }
        }

        let post_transforms = (0..counts.trackers)
            .map(|local| section.indexed_transform("trackerPostTransformation", local))
            .collect::<ConfigResult<Vec<_>>>()?;

        debug!(
            device = name,
            trackers = ?index_map.trackers,
            buttons = ?index_map.buttons,
            valuators = ?index_map.valuators,
            "Mapped device indices"
        );

        Ok(Self {
            name: name.to_string(),
            id,
            index_map,
            calibrator: calibrator_from_config(section)?,
            post_transforms,
            velocity: VelocityEstimator::new(counts.trackers),
        })
    }

    /// Default slot names: `<device>/<kind><i>`.
    pub fn generic_names(device: &str) -> impl Fn(IndexKind, usize) -> String + '_ {
        move |kind, local| match kind {
            IndexKind::Haptic => format!("{device}/haptic{local}"),
            _ => format!("{device}/{kind}{local}"),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn id(&self) -> DeviceId {
        self.id
    }

    pub fn index_map(&self) -> &IndexMap {
        &self.index_map
    }

    pub fn num_trackers(&self) -> usize {
        self.index_map.trackers.len()
    }

    /// Forget previous poses so the next sample of every tracker is at rest.
    pub fn restart(&mut self) {
        self.velocity.reset();
    }

    /// Calibrate and post-transform `sample`, keeping its velocities.
    pub fn correct(&self, local: usize, sample: TrackerSample) -> TrackerSample {
        let mut sample = match &self.calibrator {
            Some(calibrator) => calibrator.apply(local, sample),
            None => sample,
        };
        if let Some(Some(post)) = self.post_transforms.get(local) {
            sample.position_orientation = sample.position_orientation * *post;
        }
        sample
    }

    /// Publish a raw pose of local tracker `local`, estimating its velocity.
    ///
    /// Poses of unmapped trackers are dropped.
    ///
    /// # Errors
    ///
    /// Returns the manager's error for an invalid global index.
    pub fn publish_pose(
        &mut self,
        manager: &DeviceManager,
        local: usize,
        pose: RigidTransform,
        time_stamp: MonotonicMicros,
    ) -> DeviceResult {
        let Some(global) = self.index_map.global(IndexKind::Tracker, local) else {
            trace!(device = %self.name, local, "Dropping pose of unmapped tracker");
            return Ok(());
        };
        let corrected = self.correct(local, TrackerSample::at_rest(pose, time_stamp));
        let (linear, angular) =
            self.velocity
                .estimate(local, &corrected.position_orientation, time_stamp);
        manager.set_tracker_state(global, corrected.with_velocity(linear, angular))
    }

    /// Publish a sample that already carries velocities.
    ///
    /// # Errors
    ///
    /// Returns the manager's error for an invalid global index.
    pub fn publish_sample(
        &self,
        manager: &DeviceManager,
        local: usize,
        sample: TrackerSample,
    ) -> DeviceResult {
        match self.index_map.global(IndexKind::Tracker, local) {
            Some(global) => manager.set_tracker_state(global, self.correct(local, sample)),
            None => Ok(()),
        }
    }

    /// # Errors
    ///
    /// Returns the manager's error for an invalid global index.
    pub fn publish_button(&self, manager: &DeviceManager, local: usize, pressed: bool) -> DeviceResult {
        match self.index_map.global(IndexKind::Button, local) {
            Some(global) => manager.set_button_state(global, pressed),
            None => Ok(()),
        }
    }

    /// # Errors
    ///
    /// Returns the manager's error for an invalid global index.
    pub fn publish_valuator(&self, manager: &DeviceManager, local: usize, value: f32) -> DeviceResult {
        match self.index_map.global(IndexKind::Valuator, local) {
            Some(global) => manager.set_valuator_state(global, value),
            None => Ok(()),
        }
    }

    /// Mark local tracker `local` invalid and forget its previous pose.
    ///
    /// # Errors
    ///
    /// Returns the manager's error for an invalid global index.
    pub fn disable_tracker(&mut self, manager: &DeviceManager, local: usize) -> DeviceResult {
        match self.index_map.global(IndexKind::Tracker, local) {
            Some(global) => {
                self.velocity.reset_one(local);
                manager.disable_tracker(global)
            }
            None => Ok(()),
        }
    }

    /// Close this device's logical cycle.
    pub fn update(&self, manager: &DeviceManager) -> bool {
        manager.update_state(self.id)
    }
}

#[cfg(test)]
mod tests {
    use trackd_types::{Vector3, rotation_from_axis_angle};

    use super::*;

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    fn counts(trackers: usize, buttons: usize, valuators: usize) -> SlotCounts {
        SlotCounts {
            trackers,
            buttons,
            valuators,
            haptic_features: 0,
        }
    }

    #[test]
    fn test_base_and_override_mapping() -> TestResult {
        let section = ConfigSection::from_yaml(
            "dev",
            "buttonIndexBase: 4\nbuttonIndex1: 10\ntrackerNames: [Head]\n",
        )?;
        let mut builder = DeviceManagerBuilder::new();
        let core = DeviceCore::from_config(
            "dev",
            &section,
            &mut builder,
            counts(2, 3, 1),
            &DeviceCore::generic_names("dev"),
        )?;
        let map = core.index_map();
        assert_eq!(map.global(IndexKind::Tracker, 0), Some(0));
        assert_eq!(map.global(IndexKind::Tracker, 1), Some(1));
        assert_eq!(map.global(IndexKind::Button, 0), Some(4));
        assert_eq!(map.global(IndexKind::Button, 1), Some(10));
        assert_eq!(map.global(IndexKind::Button, 2), Some(6));
        assert_eq!(map.global(IndexKind::Valuator, 3), None);

        let manager = builder.build()?;
        assert_eq!(manager.tracker_name(0), Some("Head"));
        assert_eq!(manager.tracker_name(1), Some("dev/tracker1"));
        assert_eq!(manager.num_buttons(), 11);
        Ok(())
    }

    #[test]
    fn test_overlapping_devices_collide() -> TestResult {
        let a = ConfigSection::from_yaml("a", "trackerIndexBase: 0\n")?;
        let b = ConfigSection::from_yaml("b", "trackerIndex0: 1\n")?;
        let mut builder = DeviceManagerBuilder::new();
        DeviceCore::from_config("a", &a, &mut builder, counts(2, 0, 0), &DeviceCore::generic_names("a"))?;
        let err = DeviceCore::from_config("b", &b, &mut builder, counts(1, 0, 0), &DeviceCore::generic_names("b"))
            .unwrap_err();
        assert!(err.to_string().contains("already owned by 'a'"));
        Ok(())
    }

    #[test]
    fn test_calibration_then_post_transform() -> TestResult {
        let section = ConfigSection::from_yaml(
            "dev",
            r#"
calibratorType: transform
transformation:
  translation: [0, 0, 1]
trackerPostTransformation0:
  rotation: { axis: [0, 0, 1], angle: 90 }
  translation: [1, 0, 0]
"#,
        )?;
        let mut builder = DeviceManagerBuilder::new();
        let mut core = DeviceCore::from_config(
            "dev",
            &section,
            &mut builder,
            counts(1, 0, 0),
            &DeviceCore::generic_names("dev"),
        )?;
        let manager = builder.build()?;
        core.publish_pose(&manager, 0, RigidTransform::identity(), MonotonicMicros(0))?;

        let state = manager.snapshot();
        let sample = state.tracker(0).ok_or("missing tracker")?;
        // raw at origin, calibrated +1 z, then post offset of 1 m along local x
        assert!((sample.position() - Vector3::new(1.0, 0.0, 1.0)).norm() < 1e-9);
        let expected = rotation_from_axis_angle(Vector3::z(), 90.0);
        assert!(sample.position_orientation.rotation.angle_to(&expected) < 1e-9);
        Ok(())
    }

    #[test]
    fn test_unmapped_locals_are_ignored() -> TestResult {
        let section = ConfigSection::from_yaml("dev", "")?;
        let mut builder = DeviceManagerBuilder::new();
        let mut core = DeviceCore::from_config(
            "dev",
            &section,
            &mut builder,
            counts(1, 1, 0),
            &DeviceCore::generic_names("dev"),
        )?;
        let manager = builder.build()?;
        core.publish_pose(&manager, 5, RigidTransform::identity(), MonotonicMicros(0))?;
        core.publish_button(&manager, 3, true)?;
        core.publish_valuator(&manager, 0, 1.0)?;
        assert_eq!(manager.stats().samples, 0);
        Ok(())
    }
}
