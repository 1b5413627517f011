//! Temporal contrast calibration.
//!
//! Patches from the same acquisition date share lighting and atmosphere,
//! so one contrast LUT is computed per date group (from the group's
//! first-selected, largest-coverage member) and applied to every member.
//! Calibrating per date keeps color consistent across patches from the
//! same pass while still adapting to distinct conditions across dates.

mod calibrator;
mod grouping;
mod lut;

pub use calibrator::{CalibrationOutcome, TemporalContrastCalibrator};
pub use grouping::{acquisition_day, group_by_day, DateGroups};
pub use lut::{EnhanceError, ImageLutEngine, LutEngine};
