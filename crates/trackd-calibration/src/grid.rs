//! Position correction from a regular 3D offset grid.

use std::path::Path;

use serde::{Deserialize, Serialize};
use trackd_errors::{ConfigError, ConfigResult};
use trackd_types::{TrackerSample, Vector3};

use crate::calibrator::Calibrator;

/// Offset table sampled on a regular grid.
///
/// `offsets` holds `dims[0] * dims[1] * dims[2]` vectors with x varying
/// fastest. Positions outside the grid use the nearest boundary cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GridTable {
    pub origin: [f64; 3],
    pub cell_size: [f64; 3],
    pub dims: [usize; 3],
    pub offsets: Vec<[f64; 3]>,
}

impl GridTable {
    /// Check dimensions against the offset count.
    ///
    /// # Errors
    ///
    /// Returns a message describing the first inconsistency.
    pub fn validate(&self) -> Result<(), String> {
        if self.dims.iter().any(|&d| d < 2) {
            return Err(format!("every grid dimension needs at least 2 samples, got {:?}", self.dims));
        }
        if self.cell_size.iter().any(|&c| !(c.is_finite() && c > 0.0)) {
            return Err(format!("cell sizes must be positive, got {:?}", self.cell_size));
        }
        let [nx, ny, nz] = self.dims;
        let expected = nx
            .checked_mul(ny)
            .and_then(|n| n.checked_mul(nz))
            .ok_or_else(|| format!("grid dimensions {:?} are too large", self.dims))?;
        if self.offsets.len() != expected {
            return Err(format!(
                "expected {expected} offsets for dims {:?}, got {}",
                self.dims,
                self.offsets.len()
            ));
        }
        Ok(())
    }

    fn offset(&self, x: usize, y: usize, z: usize) -> Vector3 {
        let index = (z * self.dims[1] + y) * self.dims[0] + x;
        self.offsets
            .get(index)
            .map_or_else(Vector3::zeros, |o| Vector3::from(*o))
    }

    /// Trilinearly interpolated offset at `position`.
    pub fn interpolate(&self, position: &Vector3) -> Vector3 {
        let mut cell = [0usize; 3];
        let mut frac = [0.0f64; 3];
        for axis in 0..3 {
            let max_cell = self.dims[axis].saturating_sub(2);
            let t = (position[axis] - self.origin[axis]) / self.cell_size[axis];
            let clamped = t.clamp(0.0, (max_cell + 1) as f64);
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let base = (clamped.floor() as usize).min(max_cell);
            cell[axis] = base;
            frac[axis] = clamped - base as f64;
        }
        let [x, y, z] = cell;
        let [fx, fy, fz] = frac;
        let lerp = |a: Vector3, b: Vector3, t: f64| a + (b - a) * t;

        let c00 = lerp(self.offset(x, y, z), self.offset(x + 1, y, z), fx);
        let c10 = lerp(self.offset(x, y + 1, z), self.offset(x + 1, y + 1, z), fx);
        let c01 = lerp(self.offset(x, y, z + 1), self.offset(x + 1, y, z + 1), fx);
        let c11 = lerp(self.offset(x, y + 1, z + 1), self.offset(x + 1, y + 1, z + 1), fx);
        lerp(lerp(c00, c10, fy), lerp(c01, c11, fy), fz)
    }
}

/// Adds an interpolated offset to tracker positions; orientation is untouched.
#[derive(Debug, Clone)]
pub struct GridCalibrator {
    table: GridTable,
}

impl GridCalibrator {
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] for an inconsistent table.
    pub fn new(table: GridTable, source: &str) -> ConfigResult<Self> {
        table
            .validate()
            .map_err(|message| ConfigError::invalid_value(source, "grid", message))?;
        Ok(Self { table })
    }

    /// Load a JSON table.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Load`] if the file cannot be read or parsed.
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let source = path.display().to_string();
        let load_err = |message: String| ConfigError::Load {
            path: source.clone(),
            message,
        };
        let text = std::fs::read_to_string(path).map_err(|e| load_err(e.to_string()))?;
        let table: GridTable = serde_json::from_str(&text).map_err(|e| load_err(e.to_string()))?;
        Self::new(table, &source)
    }

    pub fn table(&self) -> &GridTable {
        &self.table
    }
}

impl Calibrator for GridCalibrator {
    fn kind(&self) -> &'static str {
        "grid"
    }

    fn apply(&self, _local_index: usize, mut raw: TrackerSample) -> TrackerSample {
        let position = raw.position();
        raw.position_orientation.translation.vector = position + self.table.interpolate(&position);
        raw
    }
}
