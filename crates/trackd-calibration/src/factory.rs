//! Calibrator construction from device configuration.

use tracing::debug;
use trackd_config::ConfigSection;
use trackd_errors::{ConfigError, ConfigResult};

use crate::calibrator::{Calibrator, IdentityCalibrator, TransformCalibrator};
use crate::grid::{GridCalibrator, GridTable};

/// Build the calibrator named by `calibratorType`, or `None` if unset.
///
/// Settings are read from the subsection named by `calibratorName`, or from
/// the device section itself.
///
/// | type | keys |
/// |---|---|
/// | `identity` | none |
/// | `transform` | `transformation` |
/// | `grid` | `calibrationFile` (JSON) or inline `grid` |
///
/// # Errors
///
/// Returns [`ConfigError::UnknownCalibrator`] for an unknown type, or the
/// error of the calibrator's own settings.
pub fn calibrator_from_config(
    device: &ConfigSection,
) -> ConfigResult<Option<Box<dyn Calibrator>>> {
    let Some(kind) = device.get::<String>("calibratorType")? else {
        return Ok(None);
    };
    let settings = match device.get::<String>("calibratorName")? {
        Some(name) => device.subsection(&name)?,
        None => device.clone(),
    };

    let calibrator: Box<dyn Calibrator> = match kind.as_str() {
        "identity" => Box::new(IdentityCalibrator),
        "transform" => {
            let transform = settings
                .transform("transformation")?
                .ok_or_else(|| ConfigError::missing_key(settings.name(), "transformation"))?;
            Box::new(TransformCalibrator::new(transform))
        }
        "grid" => match settings.get::<String>("calibrationFile")? {
            Some(path) => Box::new(GridCalibrator::load(path)?),
            None => {
                let table: GridTable = settings.require("grid")?;
                Box::new(GridCalibrator::new(table, settings.name())?)
            }
        },
        _ => return Err(ConfigError::UnknownCalibrator(kind)),
    };
    debug!(section = device.name(), kind = calibrator.kind(), "Created calibrator");
    Ok(Some(calibrator))
}
