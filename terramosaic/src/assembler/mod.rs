//! Mosaic assembly orchestration.
//!
//! [`MosaicAssembler`] drives the whole pipeline for one territory:
//! catalog search, useful-area detection over low-res previews, greedy
//! coverage selection on the hex grid, high-res patch extraction,
//! per-date contrast calibration, compositing and publication.
//!
//! `run` never panics; every failure lands in the returned
//! [`MosaicJob`] as a [`JobOutcome::Failed`] tagged with the stage that
//! broke. A scene lacking the preview asset is demoted with a warning
//! instead of failing the job; tool failures are fatal.

mod error;

pub use error::AssemblerError;

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use tracing::{error, info, warn};

use crate::catalog::{Scene, SceneCatalogClient, SceneQuery};
use crate::config::AssemblerConfig;
use crate::coverage;
use crate::detector::UsefulAreaDetector;
use crate::enhance::{LutEngine, TemporalContrastCalibrator};
use crate::grid::{HexCell, HexGridIndex};
use crate::patch::{PatchDownloader, WORKING_SRS};
use crate::raster::{RasterEngine, Resampling};
use crate::storage::ObjectStore;
use crate::territory::Territory;
use crate::workdir::WorkDir;

/// Pipeline stage a job is in (or failed at).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Searching,
    DetectingUsefulArea,
    SelectingCoverage,
    DownloadingPatches,
    Calibrating,
    Compositing,
    Publishing,
    Published,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Searching => "searching",
            Stage::DetectingUsefulArea => "detecting-useful-area",
            Stage::SelectingCoverage => "selecting-coverage",
            Stage::DownloadingPatches => "downloading-patches",
            Stage::Calibrating => "calibrating",
            Stage::Compositing => "compositing",
            Stage::Publishing => "publishing",
            Stage::Published => "published",
        };
        write!(f, "{}", name)
    }
}

/// Per-scene progress scoreboard entry.
#[derive(Debug, Clone, Default)]
pub struct SceneState {
    /// Low-res preview path, once warped.
    pub preview: Option<PathBuf>,

    /// Footprint cell count inside the AOI.
    pub footprint_cells: usize,

    /// Usable cell count inside the AOI.
    pub usable_cells: usize,

    /// Whether the scene passed the acceptance criterion.
    pub accepted: bool,

    /// Position in the selection order, if picked.
    pub selection_index: Option<usize>,

    /// Cells this scene was assigned by the selection.
    pub assigned_cells: usize,

    /// High-res patch path, once extracted.
    pub high_res: Option<PathBuf>,

    /// Calibrated raster path, once enhanced.
    pub enhanced: Option<PathBuf>,
}

/// Terminal result of a mosaic job.
#[derive(Debug, Clone)]
pub enum JobOutcome {
    /// The mosaic was assembled and uploaded.
    Published {
        bucket: String,
        key: String,
        mosaic_path: PathBuf,
    },
    /// The pipeline failed at `stage`.
    Failed { stage: Stage, error: String },
}

/// Record of one assembly run.
#[derive(Debug)]
pub struct MosaicJob {
    /// Territory the job ran for.
    pub territory_id: String,

    /// When the job started.
    pub started_at: DateTime<Utc>,

    /// When the job finished (success or failure).
    pub finished_at: Option<DateTime<Utc>>,

    /// Per-scene progress, keyed by scene id.
    pub scenes: BTreeMap<String, SceneState>,

    /// Terminal outcome. `None` only while the job is still running.
    pub outcome: Option<JobOutcome>,
}

impl MosaicJob {
    fn new(territory_id: &str) -> Self {
        Self {
            territory_id: territory_id.to_string(),
            started_at: Utc::now(),
            finished_at: None,
            scenes: BTreeMap::new(),
            outcome: None,
        }
    }

    /// Scene ids that passed acceptance.
    pub fn accepted_scenes(&self) -> Vec<&str> {
        self.scenes
            .iter()
            .filter(|(_, state)| state.accepted)
            .map(|(id, _)| id.as_str())
            .collect()
    }
}

/// Orchestrates one territory's mosaic from search to publication.
pub struct MosaicAssembler {
    config: AssemblerConfig,
    catalog: Arc<dyn SceneCatalogClient>,
    engine: Arc<dyn RasterEngine>,
    grid: Arc<dyn HexGridIndex>,
    lut: Arc<dyn LutEngine>,
    store: Arc<dyn ObjectStore>,
}

impl MosaicAssembler {
    /// Create an assembler from its collaborators.
    pub fn new(
        config: AssemblerConfig,
        catalog: Arc<dyn SceneCatalogClient>,
        engine: Arc<dyn RasterEngine>,
        grid: Arc<dyn HexGridIndex>,
        lut: Arc<dyn LutEngine>,
        store: Arc<dyn ObjectStore>,
    ) -> Self {
        Self {
            config,
            catalog,
            engine,
            grid,
            lut,
            store,
        }
    }

    /// Assemble and publish a mosaic for one territory over an
    /// acquisition interval.
    ///
    /// Always returns a [`MosaicJob`]; inspect its `outcome` for the
    /// published location or the failing stage.
    pub fn run(&self, territory: &Territory, start: NaiveDate, end: NaiveDate) -> MosaicJob {
        let mut job = MosaicJob::new(&territory.id);
        info!(
            territory = %territory.id,
            start = %start,
            end = %end,
            "Mosaic job started"
        );

        match self.run_pipeline(territory, start, end, &mut job) {
            Ok(outcome) => {
                if let JobOutcome::Published { bucket, key, .. } = &outcome {
                    info!(
                        territory = %territory.id,
                        bucket = %bucket,
                        key = %key,
                        "Mosaic published"
                    );
                }
                job.outcome = Some(outcome);
            }
            Err((stage, err)) => {
                error!(
                    territory = %territory.id,
                    stage = %stage,
                    error = %err,
                    "Mosaic job failed"
                );
                job.outcome = Some(JobOutcome::Failed {
                    stage,
                    error: err.to_string(),
                });
            }
        }

        job.finished_at = Some(Utc::now());
        job
    }

    fn run_pipeline(
        &self,
        territory: &Territory,
        start: NaiveDate,
        end: NaiveDate,
        job: &mut MosaicJob,
    ) -> Result<JobOutcome, (Stage, AssemblerError)> {
        let fail = |stage: Stage| move |e: AssemblerError| (stage, e);

        // --- Searching ---------------------------------------------------

        let work = WorkDir::create(&self.config.working_dir)
            .map_err(|e| (Stage::Searching, AssemblerError::Io(e)))?;
        let dir = work
            .territory_dir(&territory.id)
            .map_err(|e| (Stage::Searching, AssemblerError::Io(e)))?;

        let query = SceneQuery::new(
            self.config.collection.as_str(),
            territory.geometry.clone(),
            start,
            end,
        )
        .with_limit(self.config.search_limit);

        // A failed search degrades to an empty result; the job then fails
        // with NoScenes rather than a transport error.
        let scenes = match self.catalog.search(&query) {
            Ok(scenes) => scenes,
            Err(e) => {
                warn!(error = %e, "Catalog search failed; treating as zero scenes");
                Vec::new()
            }
        };
        if scenes.is_empty() {
            return Err((
                Stage::Searching,
                AssemblerError::NoScenes {
                    territory: territory.id.clone(),
                    interval: query.datetime_interval(),
                },
            ));
        }
        info!(scenes = scenes.len(), "Catalog search complete");

        let by_id: HashMap<&str, &Scene> =
            scenes.iter().map(|s| (s.id.as_str(), s)).collect();

        // --- Detecting useful area ---------------------------------------

        // The coverage universe comes from the print-optimized bbox, not
        // the raw AOI polygon: the mosaic has to fill the whole canvas.
        let universe = self
            .grid
            .to_cells(&territory.bbox_polygon(), self.config.grid_resolution)
            .map_err(AssemblerError::from)
            .map_err(fail(Stage::DetectingUsefulArea))?;

        let detector = UsefulAreaDetector::new(
            Arc::clone(&self.engine),
            Arc::clone(&self.grid),
            self.config.grid_resolution,
            self.config.saturation_threshold,
            self.config.acceptance_threshold,
        );

        let res = self.config.preview_resolution_deg;
        let mut candidates: BTreeMap<String, HashSet<HexCell>> = BTreeMap::new();

        for scene in &scenes {
            let state = job.scenes.entry(scene.id.clone()).or_default();

            let Some(url) = scene.asset_url(&self.config.preview_asset) else {
                warn!(
                    scene = %scene.id,
                    asset = %self.config.preview_asset,
                    "Scene has no preview asset; excluded"
                );
                continue;
            };

            let preview = dir.join(format!("{}_low_res.tif", scene.id));
            self.engine
                .warp_to_resolution(url, &preview, res, res, Resampling::Max, WORKING_SRS)
                .map_err(AssemblerError::from)
                .map_err(fail(Stage::DetectingUsefulArea))?;
            state.preview = Some(preview.clone());

            let report = detector
                .detect(&scene.id, &preview, &universe, &dir)
                .map_err(AssemblerError::from)
                .map_err(fail(Stage::DetectingUsefulArea))?;

            state.footprint_cells = report.footprint.len();
            state.usable_cells = report.usable.len();
            state.accepted = report.accepted;
            info!(
                scene = %scene.id,
                footprint = report.footprint.len(),
                usable = report.usable.len(),
                ratio = report.ratio(),
                accepted = report.accepted,
                "Scene evaluated"
            );

            // An accepted scene competes with its full footprint: passing
            // the ratio bar certifies the whole valid-data area as usable
            // enough, so selection credits every footprint cell.
            if report.accepted {
                candidates.insert(scene.id.clone(), report.footprint);
            }
        }

        if candidates.is_empty() {
            return Err((
                Stage::DetectingUsefulArea,
                AssemblerError::NoAcceptedScenes {
                    territory: territory.id.clone(),
                    evaluated: scenes.len(),
                },
            ));
        }

        // --- Selecting coverage ------------------------------------------

        let selection = coverage::select(&universe, &candidates)
            .map_err(AssemblerError::from)
            .map_err(fail(Stage::SelectingCoverage))?;

        for (index, id) in selection.order.iter().enumerate() {
            if let Some(state) = job.scenes.get_mut(id) {
                state.selection_index = Some(index);
                state.assigned_cells = selection.assignments[id].len();
            }
        }
        info!(
            selected = selection.order.len(),
            covered = selection.covered_count(),
            universe = universe.len(),
            "Coverage selected"
        );

        // --- Downloading patches -----------------------------------------

        let downloader = PatchDownloader::new(
            Arc::clone(&self.engine),
            Arc::clone(&self.grid),
            self.config.preview_asset.clone(),
        );

        let mut patches: Vec<(&Scene, PathBuf)> = Vec::with_capacity(selection.order.len());
        for id in &selection.order {
            let scene = by_id[id.as_str()];
            let path = downloader
                .download(scene, &selection.assignments[id], territory, &dir)
                .map_err(AssemblerError::from)
                .map_err(fail(Stage::DownloadingPatches))?;
            if let Some(state) = job.scenes.get_mut(id) {
                state.high_res = Some(path.clone());
            }
            patches.push((scene, path));
        }

        // --- Calibrating -------------------------------------------------

        let calibrator = TemporalContrastCalibrator::new(
            Arc::clone(&self.lut),
            Arc::clone(&self.engine),
            self.config.percentile_low,
            self.config.percentile_high,
            self.config.gamma,
        );
        let calibration = calibrator
            .calibrate(&patches, &dir)
            .map_err(AssemblerError::from)
            .map_err(fail(Stage::Calibrating))?;

        for (id, path) in &calibration.enhanced {
            if let Some(state) = job.scenes.get_mut(id) {
                state.enhanced = Some(path.clone());
            }
        }

        // --- Compositing -------------------------------------------------

        // Merge inputs run from last-selected to first-selected; the merge
        // lets later inputs override, so the largest-gain scenes win the
        // overlaps.
        let mut layers: Vec<PathBuf> = Vec::with_capacity(selection.order.len());
        for id in selection.order.iter().rev() {
            match calibration.enhanced.get(id) {
                Some(path) => layers.push(path.clone()),
                None => {
                    warn!(scene = %id, "Scene dropped before compositing");
                }
            }
        }
        if layers.is_empty() {
            return Err((
                Stage::Compositing,
                AssemblerError::EmptyComposite {
                    territory: territory.id.clone(),
                },
            ));
        }

        let mosaic_path = dir.join(format!("mosaic_{}.tif", territory.id));
        self.engine
            .merge(&layers, &mosaic_path)
            .map_err(AssemblerError::from)
            .map_err(fail(Stage::Compositing))?;
        info!(
            layers = layers.len(),
            mosaic = %mosaic_path.display(),
            "Mosaic composited"
        );

        // --- Publishing --------------------------------------------------

        let key = format!("territories/mosaic_{}.tif", territory.id);
        self.store
            .upload(&mosaic_path, &self.config.bucket, &key)
            .map_err(AssemblerError::from)
            .map_err(fail(Stage::Publishing))?;

        Ok(JobOutcome::Published {
            bucket: self.config.bucket.clone(),
            key,
            mosaic_path,
        })
    }
}
