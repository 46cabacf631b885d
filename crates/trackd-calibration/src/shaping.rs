//! Valuator deadzone and response exponent.

use serde::{Deserialize, Serialize};
use trackd_config::ConfigSection;
use trackd_errors::ConfigResult;

/// Deadzone + exponent response curve for one valuator.
///
/// For raw `v` in `[-1, 1]`, deadzone `th` and exponent `e`:
/// `|v| <= th` maps to 0, otherwise `sign(v) * ((|v| - th) / (1 - th))^e`.
///
/// # Examples
///
/// ```
/// use trackd_calibration::ValuatorShaping;
///
/// let shaping = ValuatorShaping::new(0.1, 2.0);
/// assert_eq!(shaping.apply(0.05), 0.0);
/// assert_eq!(shaping.apply(-1.0), -1.0);
/// assert!((shaping.apply(0.55) - 0.25).abs() < 1e-5);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValuatorShaping {
    pub threshold: f32,
    pub exponent: f32,
}

impl Default for ValuatorShaping {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl ValuatorShaping {
    /// No deadzone, linear response.
    pub const IDENTITY: ValuatorShaping = ValuatorShaping {
        threshold: 0.0,
        exponent: 1.0,
    };

    pub fn new(threshold: f32, exponent: f32) -> Self {
        Self {
            threshold,
            exponent,
        }
    }

    /// Read `valuatorThreshold<i>` / `valuatorExponent<i>` with shared fallbacks.
    ///
    /// # Errors
    ///
    /// Returns an error if the threshold is outside `[0, 1)` or the exponent
    /// is not positive.
    pub fn from_config(section: &ConfigSection, local_index: usize) -> ConfigResult<Self> {
        let threshold: f32 = section.indexed_or("valuatorThreshold", local_index, 0.0)?;
        let exponent: f32 = section.indexed_or("valuatorExponent", local_index, 1.0)?;
        if !(0.0..1.0).contains(&threshold) {
            return Err(section.invalid(
                &format!("valuatorThreshold{local_index}"),
                format!("{threshold} is outside [0, 1)"),
            ));
        }
        if !(exponent.is_finite() && exponent > 0.0) {
            return Err(section.invalid(
                &format!("valuatorExponent{local_index}"),
                format!("{exponent} must be positive"),
            ));
        }
        Ok(Self::new(threshold, exponent))
    }

    pub fn is_identity(&self) -> bool {
        *self == Self::IDENTITY
    }

    /// Shape one raw value. Input is clamped to `[-1, 1]`; NaN maps to 0.
    pub fn apply(&self, value: f32) -> f32 {
        if value.is_nan() {
            return 0.0;
        }
        let v = value.clamp(-1.0, 1.0);
        let magnitude = v.abs();
        if magnitude <= self.threshold {
            return 0.0;
        }
        let scaled = ((magnitude - self.threshold) / (1.0 - self.threshold)).min(1.0);
        scaled.powf(self.exponent).copysign(v)
    }
}
