//! Property-based tests for valuator shaping and grid calibration.

use proptest::prelude::*;
use std::io::Write;
use trackd_calibration::{Calibrator, GridCalibrator, ValuatorShaping};
use trackd_types::{MonotonicMicros, Rotation, TrackerSample, Vector3, rigid_transform};

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    #[test]
    fn deadzone_inputs_map_to_zero(
        threshold in 0.0f32..0.95,
        exponent in 0.1f32..5.0,
        frac in 0.0f32..=1.0,
        negative in any::<bool>(),
    ) {
        let shaping = ValuatorShaping::new(threshold, exponent);
        let v = threshold * frac * if negative { -1.0 } else { 1.0 };
        prop_assert_eq!(shaping.apply(v), 0.0);
    }

    #[test]
    fn full_deflection_maps_to_unit(threshold in 0.0f32..0.95, exponent in 0.1f32..5.0) {
        let shaping = ValuatorShaping::new(threshold, exponent);
        prop_assert_eq!(shaping.apply(1.0), 1.0);
        prop_assert_eq!(shaping.apply(-1.0), -1.0);
    }

    #[test]
    fn output_bounded_and_sign_preserving(
        threshold in 0.0f32..0.95,
        exponent in 0.1f32..5.0,
        v in -1.0f32..=1.0,
    ) {
        let out = ValuatorShaping::new(threshold, exponent).apply(v);
        prop_assert!((-1.0..=1.0).contains(&out), "output {} out of range", out);
        prop_assert!(out == 0.0 || out.signum() == v.signum());
    }

    #[test]
    fn monotonic_in_input(
        threshold in 0.0f32..0.95,
        exponent in 0.1f32..5.0,
        a in -1.0f32..=1.0,
        b in -1.0f32..=1.0,
    ) {
        let shaping = ValuatorShaping::new(threshold, exponent);
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(shaping.apply(lo) <= shaping.apply(hi));
    }
}

#[test]
fn grid_calibrator_loads_json() -> Result<(), Box<dyn std::error::Error>> {
    let mut file = tempfile::NamedTempFile::new()?;
    let offsets = vec![[0.0, 0.0, 0.5]; 8];
    write!(
        file,
        "{}",
        serde_json::json!({
            "origin": [-1.0, -1.0, -1.0],
            "cellSize": [2.0, 2.0, 2.0],
            "dims": [2, 2, 2],
            "offsets": offsets,
        })
    )?;
    let calib = GridCalibrator::load(file.path())?;
    let raw = TrackerSample::at_rest(
        rigid_transform(Vector3::new(0.3, -0.2, 0.1), Rotation::identity()),
        MonotonicMicros(0),
    );
    let out = calib.apply(0, raw);
    assert!((out.position() - Vector3::new(0.3, -0.2, 0.6)).norm() < 1e-12);
    Ok(())
}
