//! Per-date LUT computation and application over selected patches.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{info, warn};

use super::grouping::group_by_day;
use super::lut::{EnhanceError, LutEngine};
use crate::catalog::Scene;
use crate::raster::RasterEngine;

/// Result of calibrating a set of patches.
#[derive(Debug, Default)]
pub struct CalibrationOutcome {
    /// Scene id → enhanced raster path.
    pub enhanced: HashMap<String, PathBuf>,

    /// Scene ids skipped because no acquisition date could be extracted.
    pub skipped: Vec<String>,
}

/// Applies one contrast LUT per acquisition-date group.
pub struct TemporalContrastCalibrator {
    lut: Arc<dyn LutEngine>,
    engine: Arc<dyn RasterEngine>,
    pct_low: f64,
    pct_high: f64,
    gamma: f64,
}

impl TemporalContrastCalibrator {
    /// Create a calibrator with the given percentile clip and gamma.
    pub fn new(
        lut: Arc<dyn LutEngine>,
        engine: Arc<dyn RasterEngine>,
        pct_low: f64,
        pct_high: f64,
        gamma: f64,
    ) -> Self {
        Self {
            lut,
            engine,
            pct_low,
            pct_high,
            gamma,
        }
    }

    /// Calibrate the given patches, in selection order.
    ///
    /// `patches` pairs each selected scene with its extracted high-res
    /// raster. One LUT is computed per acquisition date from the group's
    /// first member (the largest-coverage pick of that date) and applied
    /// to every member, producing `{scene_id}_enhanced.tif` files in the
    /// scratch dir.
    pub fn calibrate(
        &self,
        patches: &[(&Scene, PathBuf)],
        dir: &Path,
    ) -> Result<CalibrationOutcome, EnhanceError> {
        let high_res: HashMap<&str, &PathBuf> = patches
            .iter()
            .map(|(scene, path)| (scene.id.as_str(), path))
            .collect();

        let groups = group_by_day(
            patches
                .iter()
                .map(|(scene, _)| (scene.id.as_str(), Some(scene.datetime))),
        );
        for id in &groups.skipped {
            warn!(scene = %id, "No extractable acquisition date; scene skipped from calibration");
        }

        let mut outcome = CalibrationOutcome {
            skipped: groups.skipped.clone(),
            ..Default::default()
        };

        for (day, members) in &groups.groups {
            let reference = high_res[members[0].as_str()];
            let lut_path = dir.join(format!("{}_contrast.lut", day));
            self.lut.compute_lut(
                reference,
                &lut_path,
                self.pct_low,
                self.pct_high,
                self.gamma,
            )?;

            for id in members {
                let input = high_res[id.as_str()];
                let dest = dir.join(format!("{}_enhanced.tif", id));
                self.engine.enhance(&lut_path, input, &dest)?;
                outcome.enhanced.insert(id.clone(), dest);
            }

            info!(
                day = %day,
                members = members.len(),
                reference = %members[0],
                "Date group calibrated"
            );
        }

        Ok(outcome)
    }
}
