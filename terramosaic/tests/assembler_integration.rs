//! Integration tests for the mosaic assembler.
//!
//! These tests drive the complete pipeline against mock collaborators:
//! - catalog search → useful-area detection → coverage selection
//! - patch extraction at territory pixel density
//! - per-date contrast calibration and layer-ordered compositing
//! - publication to the object store
//!
//! Run with: `cargo test --test assembler_integration`

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::{NaiveDate, TimeZone, Utc};
use tempfile::TempDir;

use terramosaic::assembler::{JobOutcome, MosaicAssembler, Stage};
use terramosaic::catalog::{CatalogError, Scene, SceneCatalogClient, SceneQuery};
use terramosaic::config::AssemblerConfig;
use terramosaic::enhance::{EnhanceError, LutEngine};
use terramosaic::grid::{GridError, HexCell};
use terramosaic::raster::{RasterEngine, RasterError, Resampling};
use terramosaic::storage::{ObjectStore, StorageError};
use terramosaic::territory::{BoundingBox, GeoJson, Territory};

// ============================================================================
// Helper Functions
// ============================================================================

fn cells(range: std::ops::Range<u64>) -> Vec<u64> {
    range.collect()
}

fn make_scene(id: &str, y: i32, m: u32, d: u32, preview_url: &str) -> Scene {
    Scene {
        id: id.to_string(),
        datetime: Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap(),
        cloud_cover: None,
        assets: HashMap::from([("tci".to_string(), preview_url.to_string())]),
    }
}

/// A territory whose optimum bbox spans 40 unit cells along x, rendered
/// on a 4000 × 100 pixel canvas (100 px per cell).
fn make_territory() -> Territory {
    Territory::new(
        "ter-demo",
        serde_json::json!({
            "type": "Polygon",
            "coordinates": [[[0.0, 0.0], [40.0, 0.0], [40.0, 1.0], [0.0, 1.0], [0.0, 0.0]]]
        }),
        BoundingBox::new(0.0, 0.0, 40.0, 1.0),
        4000,
        100,
    )
}

// ============================================================================
// Mock Collaborators
// ============================================================================

/// Grid whose cell `n` is the unit square `[n, n+1] × [0, 1]`.
///
/// Real polygon geometries map to the full 40-cell universe; the special
/// `MockCells` geometries produced by [`MockEngine::polygonize`] map to
/// their listed cells.
struct MockGrid;

impl terramosaic::grid::HexGridIndex for MockGrid {
    fn to_cells(
        &self,
        geometry: &GeoJson,
        _resolution: u8,
    ) -> Result<HashSet<HexCell>, GridError> {
        if geometry["type"] == "MockCells" {
            let listed = geometry["cells"].as_array().cloned().unwrap_or_default();
            return Ok(listed
                .iter()
                .filter_map(|v| v.as_u64())
                .map(HexCell)
                .collect());
        }
        Ok((0..40).map(HexCell).collect())
    }

    fn to_geometry(&self, cells: &HashSet<HexCell>) -> GeoJson {
        let mut listed: Vec<u64> = cells.iter().map(|c| c.0).collect();
        listed.sort_unstable();
        serde_json::json!({ "type": "MockCells", "cells": listed })
    }

    fn cell_bbox(&self, cell: HexCell) -> BoundingBox {
        BoundingBox::new(cell.0 as f64, 0.0, cell.0 as f64 + 1.0, 1.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
enum EngineCall {
    WarpToResolution { source: String, dest: PathBuf },
    WarpToBbox {
        dest: PathBuf,
        bbox: BoundingBox,
        width_px: u32,
        height_px: u32,
        resampling: Resampling,
    },
    Merge { inputs: Vec<PathBuf>, dest: PathBuf },
    Enhance { input: PathBuf, dest: PathBuf },
}

/// Raster engine that fabricates outputs and records every call.
///
/// `polygonize` answers from a per-mask cell table keyed by the mask
/// file stem (e.g. `scene-a_usable`).
struct MockEngine {
    masks: HashMap<String, Vec<u64>>,
    calls: Mutex<Vec<EngineCall>>,
}

impl MockEngine {
    fn new(masks: HashMap<String, Vec<u64>>) -> Self {
        Self {
            masks,
            calls: Mutex::new(Vec::new()),
        }
    }

    fn calls(&self) -> Vec<EngineCall> {
        self.calls.lock().unwrap().clone()
    }

    fn touch(path: &Path) -> Result<(), RasterError> {
        std::fs::write(path, b"mock").map_err(|e| RasterError::OutputUnreadable {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }
}

impl RasterEngine for MockEngine {
    fn warp_to_resolution(
        &self,
        source: &str,
        dest: &Path,
        _x_res: f64,
        _y_res: f64,
        _resampling: Resampling,
        _target_srs: &str,
    ) -> Result<(), RasterError> {
        self.calls.lock().unwrap().push(EngineCall::WarpToResolution {
            source: source.to_string(),
            dest: dest.to_path_buf(),
        });
        Self::touch(dest)
    }

    fn warp_to_bbox(
        &self,
        _source: &str,
        dest: &Path,
        bbox: &BoundingBox,
        width_px: u32,
        height_px: u32,
        resampling: Resampling,
        _target_srs: &str,
    ) -> Result<(), RasterError> {
        self.calls.lock().unwrap().push(EngineCall::WarpToBbox {
            dest: dest.to_path_buf(),
            bbox: *bbox,
            width_px,
            height_px,
            resampling,
        });
        Self::touch(dest)
    }

    fn band_expression(
        &self,
        _input: &Path,
        _expression: &str,
        _nodata: f64,
        dest: &Path,
    ) -> Result<(), RasterError> {
        Self::touch(dest)
    }

    fn polygonize(&self, raster: &Path, dest: &Path) -> Result<GeoJson, RasterError> {
        let stem = raster
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default();
        let cells = self.masks.get(stem).cloned().unwrap_or_default();
        Self::touch(dest)?;
        Ok(serde_json::json!({
            "type": "FeatureCollection",
            "features": [
                { "geometry": { "type": "MockCells", "cells": cells } }
            ]
        }))
    }

    fn merge(&self, inputs: &[PathBuf], dest: &Path) -> Result<(), RasterError> {
        self.calls.lock().unwrap().push(EngineCall::Merge {
            inputs: inputs.to_vec(),
            dest: dest.to_path_buf(),
        });
        Self::touch(dest)
    }

    fn enhance(&self, _lut_config: &Path, input: &Path, dest: &Path) -> Result<(), RasterError> {
        self.calls.lock().unwrap().push(EngineCall::Enhance {
            input: input.to_path_buf(),
            dest: dest.to_path_buf(),
        });
        Self::touch(dest)
    }
}

struct MockCatalog {
    scenes: Vec<Scene>,
    queries: Mutex<Vec<SceneQuery>>,
}

impl MockCatalog {
    fn new(scenes: Vec<Scene>) -> Self {
        Self {
            scenes,
            queries: Mutex::new(Vec::new()),
        }
    }
}

impl SceneCatalogClient for MockCatalog {
    fn search(&self, query: &SceneQuery) -> Result<Vec<Scene>, CatalogError> {
        self.queries.lock().unwrap().push(query.clone());
        Ok(self.scenes.clone())
    }
}

struct MockLut {
    computed: Mutex<Vec<(PathBuf, PathBuf)>>,
}

impl MockLut {
    fn new() -> Self {
        Self {
            computed: Mutex::new(Vec::new()),
        }
    }
}

impl LutEngine for MockLut {
    fn compute_lut(
        &self,
        reference: &Path,
        dest: &Path,
        _pct_low: f64,
        _pct_high: f64,
        _gamma: f64,
    ) -> Result<(), EnhanceError> {
        self.computed
            .lock()
            .unwrap()
            .push((reference.to_path_buf(), dest.to_path_buf()));
        std::fs::write(dest, b"lut").map_err(|source| EnhanceError::ConfigWrite {
            path: dest.to_path_buf(),
            source,
        })
    }
}

struct MockStore {
    uploads: Mutex<Vec<(PathBuf, String, String)>>,
}

impl MockStore {
    fn new() -> Self {
        Self {
            uploads: Mutex::new(Vec::new()),
        }
    }
}

impl ObjectStore for MockStore {
    fn upload(&self, local_path: &Path, bucket: &str, key: &str) -> Result<(), StorageError> {
        assert!(
            local_path.exists(),
            "uploaded file {} must exist",
            local_path.display()
        );
        self.uploads.lock().unwrap().push((
            local_path.to_path_buf(),
            bucket.to_string(),
            key.to_string(),
        ));
        Ok(())
    }
}

// ============================================================================
// Integration Tests
// ============================================================================

/// Full pipeline over a 40-cell territory and three scenes.
///
/// Scene ratios are ~0.95, 0.80 and 0.92: the middle scene fails the
/// strict 0.90 acceptance. Greedy selection picks scene-a (38 new
/// footprint cells) then scene-c (the last 2), the two layers are
/// calibrated in separate date groups, composited with the first pick
/// on top, and the mosaic is uploaded.
#[test]
fn test_three_scene_pipeline_publishes_mosaic() {
    let work = TempDir::new().unwrap();

    // Catalog order is datetime-descending, as the real client returns.
    let scenes = vec![
        make_scene("scene-a", 2024, 3, 12, "https://img.example/a/tci.tif"),
        make_scene("scene-b", 2024, 3, 5, "https://img.example/b/tci.tif"),
        make_scene("scene-c", 2024, 2, 28, "https://img.example/c/tci.tif"),
    ];

    let masks = HashMap::from([
        // scene-a: 38-cell footprint, 36 usable (ratio ~0.947, accepted).
        ("scene-a_footprint".to_string(), cells(0..38)),
        ("scene-a_usable".to_string(), cells(0..36)),
        // scene-b: 40-cell footprint, 32 usable (ratio 0.80, rejected).
        ("scene-b_footprint".to_string(), cells(0..40)),
        ("scene-b_usable".to_string(), cells(0..32)),
        // scene-c: 25-cell footprint, 23 usable (ratio 0.92, accepted).
        ("scene-c_footprint".to_string(), cells(15..40)),
        ("scene-c_usable".to_string(), cells(17..40)),
    ]);

    let catalog = Arc::new(MockCatalog::new(scenes));
    let engine = Arc::new(MockEngine::new(masks));
    let lut = Arc::new(MockLut::new());
    let store = Arc::new(MockStore::new());

    let config = AssemblerConfig::default()
        .with_working_dir(work.path())
        .with_bucket("mosaics");
    let assembler = MosaicAssembler::new(
        config,
        Arc::clone(&catalog) as Arc<dyn SceneCatalogClient>,
        Arc::clone(&engine) as Arc<dyn RasterEngine>,
        Arc::new(MockGrid),
        Arc::clone(&lut) as Arc<dyn LutEngine>,
        Arc::clone(&store) as Arc<dyn ObjectStore>,
    );

    let territory = make_territory();
    let job = assembler.run(
        &territory,
        NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
        NaiveDate::from_ymd_opt(2024, 3, 31).unwrap(),
    );

    // Outcome: published to the expected key.
    match &job.outcome {
        Some(JobOutcome::Published {
            bucket,
            key,
            mosaic_path,
        }) => {
            assert_eq!(bucket, "mosaics");
            assert_eq!(key, "territories/mosaic_ter-demo.tif");
            assert!(mosaic_path.exists(), "mosaic file should exist");
        }
        other => panic!("expected Published outcome, got {:?}", other),
    }

    // Query carried the interval, collection and the AOI polygon itself
    // (not the print bbox).
    let queries = catalog.queries.lock().unwrap();
    assert_eq!(queries.len(), 1);
    assert_eq!(queries[0].datetime_interval(), "2024-02-01/2024-03-31");
    assert_eq!(queries[0].collections, vec!["S2-16D-2".to_string()]);
    assert_eq!(queries[0].intersects, territory.geometry);
    drop(queries);

    // Scoreboard: acceptance and selection. scene-a is credited its full
    // 38-cell footprint although only 36 cells are usable; acceptance
    // certifies the whole footprint.
    let a = &job.scenes["scene-a"];
    assert!(a.accepted);
    assert_eq!(a.footprint_cells, 38);
    assert_eq!(a.usable_cells, 36);
    assert_eq!(a.selection_index, Some(0));
    assert_eq!(a.assigned_cells, 38);

    let b = &job.scenes["scene-b"];
    assert!(!b.accepted, "80% usable must fail the strict 0.90 bar");
    assert_eq!(b.selection_index, None);

    let c = &job.scenes["scene-c"];
    assert!(c.accepted);
    assert_eq!(c.selection_index, Some(1));
    assert_eq!(c.assigned_cells, 2, "only the two residual cells");

    // Patch extraction: scene-a spans its 38 assigned cells at 100 px
    // per cell; scene-c only the residual pair.
    let calls = engine.calls();
    let bbox_calls: Vec<_> = calls
        .iter()
        .filter_map(|c| match c {
            EngineCall::WarpToBbox {
                dest,
                bbox,
                width_px,
                height_px,
                resampling,
            } => Some((dest.clone(), *bbox, *width_px, *height_px, *resampling)),
            _ => None,
        })
        .collect();
    assert_eq!(bbox_calls.len(), 2);

    let (dest, bbox, width, height, resampling) = &bbox_calls[0];
    assert!(dest.ends_with("scene-a_high_res.tif"));
    assert_eq!(*bbox, BoundingBox::new(0.0, 0.0, 38.0, 1.0));
    assert_eq!((*width, *height), (3800, 100));
    assert_eq!(*resampling, Resampling::Bilinear);

    let (dest, bbox, width, height, _) = &bbox_calls[1];
    assert!(dest.ends_with("scene-c_high_res.tif"));
    assert_eq!(*bbox, BoundingBox::new(38.0, 0.0, 40.0, 1.0));
    assert_eq!((*width, *height), (200, 100));

    // Calibration: one LUT per acquisition date, referenced from each
    // group's high-res patch.
    let computed = lut.computed.lock().unwrap();
    assert_eq!(computed.len(), 2);
    let lut_names: Vec<String> = computed
        .iter()
        .map(|(_, dest)| dest.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert!(lut_names.contains(&"20240312_contrast.lut".to_string()));
    assert!(lut_names.contains(&"20240228_contrast.lut".to_string()));
    drop(computed);

    // Compositing: merge inputs run last-selected first, so scene-a
    // (the first pick) overrides overlaps.
    let merge = calls
        .iter()
        .find_map(|c| match c {
            EngineCall::Merge { inputs, dest } => Some((inputs.clone(), dest.clone())),
            _ => None,
        })
        .expect("merge should have been called");
    let merge_names: Vec<String> = merge
        .0
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(
        merge_names,
        vec![
            "scene-c_enhanced.tif".to_string(),
            "scene-a_enhanced.tif".to_string()
        ]
    );
    assert!(merge.1.ends_with("mosaic_ter-demo.tif"));

    // Publication: exactly one upload of the merged mosaic.
    let uploads = store.uploads.lock().unwrap();
    assert_eq!(uploads.len(), 1);
    assert_eq!(uploads[0].1, "mosaics");
    assert_eq!(uploads[0].2, "territories/mosaic_ter-demo.tif");
}

/// When no scene clears the acceptance bar, the job fails in detection
/// and nothing downstream runs.
#[test]
fn test_all_scenes_rejected_fails_in_detection() {
    let work = TempDir::new().unwrap();

    let scenes = vec![make_scene(
        "scene-x",
        2024,
        3,
        1,
        "https://img.example/x/tci.tif",
    )];
    let masks = HashMap::from([
        ("scene-x_footprint".to_string(), cells(0..40)),
        ("scene-x_usable".to_string(), cells(0..20)),
    ]);

    let engine = Arc::new(MockEngine::new(masks));
    let store = Arc::new(MockStore::new());
    let assembler = MosaicAssembler::new(
        AssemblerConfig::default().with_working_dir(work.path()),
        Arc::new(MockCatalog::new(scenes)),
        Arc::clone(&engine) as Arc<dyn RasterEngine>,
        Arc::new(MockGrid),
        Arc::new(MockLut::new()),
        Arc::clone(&store) as Arc<dyn ObjectStore>,
    );

    let job = assembler.run(
        &make_territory(),
        NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
        NaiveDate::from_ymd_opt(2024, 3, 31).unwrap(),
    );

    match &job.outcome {
        Some(JobOutcome::Failed { stage, error }) => {
            assert_eq!(*stage, Stage::DetectingUsefulArea);
            assert!(error.contains("evaluated"), "unexpected error: {}", error);
        }
        other => panic!("expected Failed outcome, got {:?}", other),
    }
    assert!(store.uploads.lock().unwrap().is_empty());
    assert!(!engine
        .calls()
        .iter()
        .any(|c| matches!(c, EngineCall::Merge { .. })));
}

/// A scene missing the preview asset is excluded with a warning while
/// the rest of the pipeline proceeds.
#[test]
fn test_scene_without_preview_asset_is_excluded() {
    let work = TempDir::new().unwrap();

    let mut no_asset = make_scene("scene-bare", 2024, 3, 10, "unused");
    no_asset.assets.clear();
    let scenes = vec![
        no_asset,
        make_scene("scene-full", 2024, 3, 1, "https://img.example/f/tci.tif"),
    ];
    let masks = HashMap::from([
        ("scene-full_footprint".to_string(), cells(0..40)),
        ("scene-full_usable".to_string(), cells(0..40)),
    ]);

    let engine = Arc::new(MockEngine::new(masks));
    let assembler = MosaicAssembler::new(
        AssemblerConfig::default().with_working_dir(work.path()),
        Arc::new(MockCatalog::new(scenes)),
        Arc::clone(&engine) as Arc<dyn RasterEngine>,
        Arc::new(MockGrid),
        Arc::new(MockLut::new()),
        Arc::new(MockStore::new()),
    );

    let job = assembler.run(
        &make_territory(),
        NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
        NaiveDate::from_ymd_opt(2024, 3, 31).unwrap(),
    );

    assert!(matches!(job.outcome, Some(JobOutcome::Published { .. })));
    assert!(!job.scenes["scene-bare"].accepted);
    assert!(job.scenes["scene-full"].accepted);
    assert_eq!(job.scenes["scene-full"].selection_index, Some(0));

    // Only the covering scene was previewed.
    let previewed: Vec<_> = engine
        .calls()
        .iter()
        .filter_map(|c| match c {
            EngineCall::WarpToResolution { source, .. } => Some(source.clone()),
            _ => None,
        })
        .collect();
    assert_eq!(previewed, vec!["https://img.example/f/tci.tif".to_string()]);
}
