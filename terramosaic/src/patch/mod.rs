//! High-resolution patch extraction.
//!
//! For each selected scene, the patch downloader computes the bounding box
//! of the hex cells the scene was assigned, scales pixel dimensions with
//! the same pixel density as the territory's canvas mapping, and asks the
//! raster engine to extract exactly that window with smooth resampling.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use crate::catalog::Scene;
use crate::grid::{cells_bounding_box, GridError, HexCell, HexGridIndex};
use crate::raster::{RasterEngine, RasterError, Resampling};
use crate::territory::Territory;

/// Working SRS for all extraction and compositing.
pub const WORKING_SRS: &str = "EPSG:4326";

/// Errors that can occur during patch download.
#[derive(Debug, Error)]
pub enum PatchError {
    /// The scene does not carry the required source asset.
    #[error("scene {scene} has no '{asset}' asset")]
    AssetMissing { scene: String, asset: String },

    /// The assigned hex set was empty (selection invariant violation).
    #[error(transparent)]
    Grid(#[from] GridError),

    /// Extraction failed (fatal for the territory).
    #[error(transparent)]
    Raster(#[from] RasterError),
}

/// Extracts selected scenes at canvas pixel density.
pub struct PatchDownloader {
    engine: Arc<dyn RasterEngine>,
    grid: Arc<dyn HexGridIndex>,
    source_asset: String,
}

impl PatchDownloader {
    /// Create a downloader pulling the named source asset of each scene.
    pub fn new(
        engine: Arc<dyn RasterEngine>,
        grid: Arc<dyn HexGridIndex>,
        source_asset: impl Into<String>,
    ) -> Self {
        Self {
            engine,
            grid,
            source_asset: source_asset.into(),
        }
    }

    /// Extract one scene's assigned area at full resolution.
    ///
    /// Returns the path of the extracted raster
    /// (`{scene_id}_high_res.tif` in the scratch dir).
    pub fn download(
        &self,
        scene: &Scene,
        assigned: &HashSet<HexCell>,
        territory: &Territory,
        dir: &Path,
    ) -> Result<PathBuf, PatchError> {
        let source = scene
            .asset_url(&self.source_asset)
            .ok_or_else(|| PatchError::AssetMissing {
                scene: scene.id.clone(),
                asset: self.source_asset.clone(),
            })?;

        let bbox = cells_bounding_box(self.grid.as_ref(), assigned)?;
        let (width_px, height_px) = territory.scaled_pixels(&bbox);

        let dest = dir.join(format!("{}_high_res.tif", scene.id));
        self.engine.warp_to_bbox(
            source,
            &dest,
            &bbox,
            width_px,
            height_px,
            Resampling::Bilinear,
            WORKING_SRS,
        )?;

        info!(
            scene = %scene.id,
            width_px,
            height_px,
            "High-resolution patch extracted"
        );
        Ok(dest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::territory::{BoundingBox, GeoJson};
    use chrono::{TimeZone, Utc};
    use std::collections::HashMap;
    use std::sync::Mutex;

    struct UnitSquareGrid;

    impl HexGridIndex for UnitSquareGrid {
        fn to_cells(
            &self,
            _geometry: &GeoJson,
            _resolution: u8,
        ) -> Result<HashSet<HexCell>, GridError> {
            Ok(HashSet::new())
        }

        fn to_geometry(&self, _cells: &HashSet<HexCell>) -> GeoJson {
            serde_json::json!(null)
        }

        fn cell_bbox(&self, cell: HexCell) -> BoundingBox {
            let x = cell.0 as f64;
            BoundingBox::new(x, 0.0, x + 1.0, 1.0)
        }
    }

    /// Records warp calls instead of invoking a toolchain.
    #[derive(Default)]
    struct RecordingEngine {
        warps: Mutex<Vec<(String, BoundingBox, u32, u32)>>,
    }

    impl RasterEngine for RecordingEngine {
        fn warp_to_resolution(
            &self,
            _source: &str,
            _dest: &Path,
            _x_res: f64,
            _y_res: f64,
            _resampling: Resampling,
            _target_srs: &str,
        ) -> Result<(), RasterError> {
            Ok(())
        }

        fn warp_to_bbox(
            &self,
            source: &str,
            _dest: &Path,
            bbox: &BoundingBox,
            width_px: u32,
            height_px: u32,
            resampling: Resampling,
            target_srs: &str,
        ) -> Result<(), RasterError> {
            assert_eq!(resampling, Resampling::Bilinear);
            assert_eq!(target_srs, WORKING_SRS);
            self.warps
                .lock()
                .unwrap()
                .push((source.to_string(), *bbox, width_px, height_px));
            Ok(())
        }

        fn band_expression(
            &self,
            _input: &Path,
            _expression: &str,
            _nodata: f64,
            _dest: &Path,
        ) -> Result<(), RasterError> {
            Ok(())
        }

        fn polygonize(&self, _raster: &Path, _dest: &Path) -> Result<GeoJson, RasterError> {
            Ok(serde_json::json!({ "features": [] }))
        }

        fn merge(&self, _inputs: &[PathBuf], _dest: &Path) -> Result<(), RasterError> {
            Ok(())
        }

        fn enhance(
            &self,
            _lut_config: &Path,
            _input: &Path,
            _dest: &Path,
        ) -> Result<(), RasterError> {
            Ok(())
        }
    }

    fn scene_with_asset(asset: Option<(&str, &str)>) -> Scene {
        let mut assets = HashMap::new();
        if let Some((name, url)) = asset {
            assets.insert(name.to_string(), url.to_string());
        }
        Scene {
            id: "S2_20240105_A".to_string(),
            datetime: Utc.with_ymd_and_hms(2024, 1, 5, 0, 0, 0).unwrap(),
            cloud_cover: None,
            assets,
        }
    }

    fn territory() -> Territory {
        Territory::new(
            "t1",
            serde_json::json!(null),
            BoundingBox::new(0.0, 0.0, 10.0, 1.0),
            1000,
            100,
        )
    }

    #[test]
    fn test_download_scales_pixels_by_canvas_density() {
        let engine = Arc::new(RecordingEngine::default());
        let downloader = PatchDownloader::new(engine.clone(), Arc::new(UnitSquareGrid), "tci");

        // Cells 2..4 give a bbox 2 units wide out of a 10-unit canvas bbox.
        let assigned: HashSet<HexCell> = [HexCell(2), HexCell(3)].into_iter().collect();
        let scene = scene_with_asset(Some(("tci", "https://x/a.tif")));
        let dir = std::env::temp_dir();

        let dest = downloader
            .download(&scene, &assigned, &territory(), &dir)
            .unwrap();

        assert!(dest.ends_with("S2_20240105_A_high_res.tif"));
        let warps = engine.warps.lock().unwrap();
        let (source, bbox, w, h) = warps[0].clone();
        assert_eq!(source, "https://x/a.tif");
        assert_eq!(bbox.min_x, 2.0);
        assert_eq!(bbox.max_x, 4.0);
        assert_eq!((w, h), (200, 100));
    }

    #[test]
    fn test_download_missing_asset() {
        let downloader = PatchDownloader::new(
            Arc::new(RecordingEngine::default()),
            Arc::new(UnitSquareGrid),
            "tci",
        );
        let assigned: HashSet<HexCell> = [HexCell(1)].into_iter().collect();
        let scene = scene_with_asset(None);

        let result = downloader.download(&scene, &assigned, &territory(), &std::env::temp_dir());
        assert!(matches!(result, Err(PatchError::AssetMissing { .. })));
    }

    #[test]
    fn test_download_empty_assignment() {
        let downloader = PatchDownloader::new(
            Arc::new(RecordingEngine::default()),
            Arc::new(UnitSquareGrid),
            "tci",
        );
        let scene = scene_with_asset(Some(("tci", "https://x/a.tif")));

        let result =
            downloader.download(&scene, &HashSet::new(), &territory(), &std::env::temp_dir());
        assert!(matches!(result, Err(PatchError::Grid(_))));
    }
}
