//! Useful-area detection over low-resolution previews.
//!
//! For each discovered scene, a reduced-resolution preview is classified
//! into a **footprint** mask (pixels where all sampled bands are strictly
//! positive, i.e. valid data) and a **usable** mask (footprint pixels minus
//! near-saturated ones where every band exceeds the brightness threshold).
//! Both masks are polygonized, converted to hex cells and intersected with
//! the AOI universe; a scene is accepted when its usable/footprint ratio
//! inside the AOI exceeds the acceptance threshold.
//!
//! Detection is a pure function of the preview raster and the AOI
//! universe: re-running it over the same inputs yields the same verdict.

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info};

use crate::grid::{GridError, HexCell, HexGridIndex};
use crate::raster::{RasterEngine, RasterError};
use crate::territory::GeoJson;

/// Errors that can occur during useful-area detection.
#[derive(Debug, Error)]
pub enum DetectorError {
    /// A raster engine call failed (fatal for the territory).
    #[error(transparent)]
    Raster(#[from] RasterError),

    /// Hex-grid conversion failed.
    #[error(transparent)]
    Grid(#[from] GridError),
}

/// Per-scene classification result.
///
/// Hex sets are already intersected with the AOI universe; cells outside
/// the AOI never count toward coverage or the acceptance ratio.
#[derive(Debug, Clone)]
pub struct UsefulAreaReport {
    /// Valid-data cells inside the AOI.
    pub footprint: HashSet<HexCell>,

    /// Usable (non-saturated valid-data) cells inside the AOI.
    pub usable: HashSet<HexCell>,

    /// Whether the scene passes the acceptance criterion.
    pub accepted: bool,
}

impl UsefulAreaReport {
    /// Build a report, computing acceptance from the given threshold.
    ///
    /// A scene with an empty footprint intersection does not overlap the
    /// AOI at hex resolution and is always rejected; the ratio is never
    /// evaluated, so there is no division by zero.
    pub fn new(
        footprint: HashSet<HexCell>,
        usable: HashSet<HexCell>,
        acceptance_threshold: f64,
    ) -> Self {
        let accepted = !footprint.is_empty()
            && usable.len() as f64 / footprint.len() as f64 > acceptance_threshold;
        Self {
            footprint,
            usable,
            accepted,
        }
    }

    /// Usable/footprint ratio, zero when the footprint is empty.
    pub fn ratio(&self) -> f64 {
        if self.footprint.is_empty() {
            0.0
        } else {
            self.usable.len() as f64 / self.footprint.len() as f64
        }
    }
}

/// Classifies scene previews into footprint/usable hex sets.
pub struct UsefulAreaDetector {
    engine: Arc<dyn RasterEngine>,
    grid: Arc<dyn HexGridIndex>,
    grid_resolution: u8,
    saturation_threshold: u8,
    acceptance_threshold: f64,
}

impl UsefulAreaDetector {
    /// Create a detector.
    pub fn new(
        engine: Arc<dyn RasterEngine>,
        grid: Arc<dyn HexGridIndex>,
        grid_resolution: u8,
        saturation_threshold: u8,
        acceptance_threshold: f64,
    ) -> Self {
        Self {
            engine,
            grid,
            grid_resolution,
            saturation_threshold,
            acceptance_threshold,
        }
    }

    /// Classify one scene preview against the AOI hex universe.
    ///
    /// Mask rasters and hex-set GeoJSON are written next to the preview in
    /// the territory scratch directory, named by scene id and stage suffix.
    pub fn detect(
        &self,
        scene_id: &str,
        preview: &Path,
        aoi: &HashSet<HexCell>,
        dir: &Path,
    ) -> Result<UsefulAreaReport, DetectorError> {
        let footprint_raster = dir.join(format!("{}_footprint.tif", scene_id));
        let footprint_geojson = dir.join(format!("{}_footprint.geojson", scene_id));
        let usable_raster = dir.join(format!("{}_usable.tif", scene_id));
        let usable_geojson = dir.join(format!("{}_usable.geojson", scene_id));

        // Valid data: every sampled band strictly positive.
        self.engine.band_expression(
            preview,
            "logical_and(A>0,B>0,C>0)",
            0.0,
            &footprint_raster,
        )?;

        // Usable: valid data minus overexposed pixels (all bands above the
        // saturation threshold).
        let t = self.saturation_threshold;
        let usable_expr = format!(
            "(logical_and(A>0,B>0,C>0)*1 - logical_and(A>{t},B>{t},C>{t})*1)==1",
            t = t
        );
        self.engine
            .band_expression(preview, &usable_expr, 0.0, &usable_raster)?;

        let footprint_features = self.engine.polygonize(&footprint_raster, &footprint_geojson)?;
        let usable_features = self.engine.polygonize(&usable_raster, &usable_geojson)?;

        let footprint: HashSet<HexCell> = self
            .feature_cells(&footprint_features)?
            .intersection(aoi)
            .copied()
            .collect();
        let usable: HashSet<HexCell> = self
            .feature_cells(&usable_features)?
            .intersection(aoi)
            .copied()
            .collect();

        // Replace the raw polygon output with the hex-set geometry, the
        // diagnostic artifact later inspection expects.
        self.write_cells_geojson(&footprint_geojson, &footprint);
        self.write_cells_geojson(&usable_geojson, &usable);

        let report = UsefulAreaReport::new(footprint, usable, self.acceptance_threshold);
        info!(
            scene = scene_id,
            footprint = report.footprint.len(),
            usable = report.usable.len(),
            ratio = report.ratio(),
            accepted = report.accepted,
            "Useful-area detection complete"
        );
        Ok(report)
    }

    /// Union of hex cells across every feature of a FeatureCollection.
    fn feature_cells(&self, collection: &GeoJson) -> Result<HashSet<HexCell>, DetectorError> {
        let mut cells = HashSet::new();
        let features = collection["features"].as_array().cloned().unwrap_or_default();
        for feature in &features {
            let geometry = &feature["geometry"];
            if geometry.is_null() {
                continue;
            }
            cells.extend(self.grid.to_cells(geometry, self.grid_resolution)?);
        }
        debug!(
            features = features.len(),
            cells = cells.len(),
            "Converted polygonized features to hex cells"
        );
        Ok(cells)
    }

    fn write_cells_geojson(&self, path: &Path, cells: &HashSet<HexCell>) {
        let geometry = self.grid.to_geometry(cells);
        if let Err(e) = std::fs::write(path, geometry.to_string()) {
            debug!(path = %path.display(), error = %e, "Failed to write hex-set geojson");
        }
    }
}
