//! Assembler configuration.
//!
//! [`AssemblerConfig`] is the injected configuration struct the pipeline
//! runs from: catalog endpoint, grid resolution, acceptance threshold,
//! contrast parameters and the scratch/storage locations. Defaults match
//! the historical deployment; every field has a `with_*` builder.
//!
//! [`ConfigFile`] persists user settings in an INI file under the platform
//! config directory and backs the CLI's `config get/set/list` commands.

mod file;

pub use file::{config_file_path, ConfigFile, ConfigFileError, ConfigKey};

use std::path::PathBuf;
use std::time::Duration;

use crate::grid::DEFAULT_GRID_RESOLUTION;

/// Ground resolution of low-res previews, in degrees per pixel
/// (roughly 500 m at the equator).
pub const DEFAULT_PREVIEW_RESOLUTION_DEG: f64 = 500.0 / 112_000.0;

/// Configuration for a [`MosaicAssembler`](crate::assembler::MosaicAssembler).
#[derive(Debug, Clone)]
pub struct AssemblerConfig {
    /// STAC catalog base URL.
    pub catalog_url: String,

    /// Collection searched for scenes.
    pub collection: String,

    /// Asset name of the visual (true-color) product used for previews
    /// and patches.
    pub preview_asset: String,

    /// Maximum scenes returned per search.
    pub search_limit: usize,

    /// Hex grid resolution for coverage accounting.
    pub grid_resolution: u8,

    /// Usable/footprint ratio a scene must exceed to be accepted.
    pub acceptance_threshold: f64,

    /// Brightness above which all bands together count as overexposed.
    pub saturation_threshold: u8,

    /// Low percentile of the contrast clip.
    pub percentile_low: f64,

    /// High percentile of the contrast clip.
    pub percentile_high: f64,

    /// Gamma adjustment applied with the contrast stretch.
    pub gamma: f64,

    /// Ground resolution of the low-res previews, degrees per pixel.
    pub preview_resolution_deg: f64,

    /// Scratch root for intermediate artifacts.
    pub working_dir: PathBuf,

    /// Bucket published mosaics are uploaded to.
    pub bucket: String,

    /// Optional timeout applied to each external raster-tool call.
    /// `None` (the default) lets every call run to completion.
    pub external_timeout: Option<Duration>,
}

impl Default for AssemblerConfig {
    fn default() -> Self {
        Self {
            catalog_url: "https://data.inpe.br/bdc/stac/v1".to_string(),
            collection: "S2-16D-2".to_string(),
            preview_asset: "tci".to_string(),
            search_limit: 1000,
            grid_resolution: DEFAULT_GRID_RESOLUTION,
            acceptance_threshold: 0.90,
            saturation_threshold: 125,
            percentile_low: 1.0,
            percentile_high: 99.0,
            gamma: 2.0,
            preview_resolution_deg: DEFAULT_PREVIEW_RESOLUTION_DEG,
            working_dir: std::env::temp_dir().join("terramosaic"),
            bucket: "mosaics".to_string(),
            external_timeout: None,
        }
    }
}

impl AssemblerConfig {
    /// Set the catalog base URL.
    pub fn with_catalog_url(mut self, url: impl Into<String>) -> Self {
        self.catalog_url = url.into();
        self
    }

    /// Set the collection to search.
    pub fn with_collection(mut self, collection: impl Into<String>) -> Self {
        self.collection = collection.into();
        self
    }

    /// Set the scratch root.
    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = dir.into();
        self
    }

    /// Set the publish bucket.
    pub fn with_bucket(mut self, bucket: impl Into<String>) -> Self {
        self.bucket = bucket.into();
        self
    }

    /// Set the acceptance threshold.
    pub fn with_acceptance_threshold(mut self, threshold: f64) -> Self {
        self.acceptance_threshold = threshold;
        self
    }

    /// Set the per-call external tool timeout.
    pub fn with_external_timeout(mut self, timeout: Duration) -> Self {
        self.external_timeout = Some(timeout);
        self
    }

    /// Build an assembler config from a loaded config file, falling back
    /// to defaults for unset values.
    pub fn from_config_file(file: &ConfigFile) -> Self {
        let defaults = Self::default();
        Self {
            catalog_url: file
                .catalog
                .url
                .clone()
                .unwrap_or(defaults.catalog_url),
            collection: file
                .catalog
                .collection
                .clone()
                .unwrap_or(defaults.collection),
            preview_asset: file
                .catalog
                .preview_asset
                .clone()
                .unwrap_or(defaults.preview_asset),
            grid_resolution: file
                .mosaic
                .grid_resolution
                .unwrap_or(defaults.grid_resolution),
            acceptance_threshold: file
                .mosaic
                .acceptance_threshold
                .unwrap_or(defaults.acceptance_threshold),
            saturation_threshold: file
                .mosaic
                .saturation_threshold
                .unwrap_or(defaults.saturation_threshold),
            percentile_low: file.mosaic.percentile_low.unwrap_or(defaults.percentile_low),
            percentile_high: file
                .mosaic
                .percentile_high
                .unwrap_or(defaults.percentile_high),
            gamma: file.mosaic.gamma.unwrap_or(defaults.gamma),
            working_dir: file
                .pipeline
                .working_dir
                .clone()
                .unwrap_or(defaults.working_dir),
            bucket: file.storage.bucket.clone().unwrap_or(defaults.bucket),
            external_timeout: file
                .pipeline
                .external_timeout_secs
                .map(Duration::from_secs),
            ..defaults
        }
    }
}
