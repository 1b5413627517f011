//! Raster engine trait and error types.

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::territory::{BoundingBox, GeoJson};

/// Resampling policy for warp operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resampling {
    /// Nearest neighbour.
    Nearest,
    /// Smooth interpolation, used for high-resolution patch extraction.
    Bilinear,
    /// Maximum value, used when shrinking previews so thin valid-data
    /// slivers survive the downsample.
    Max,
}

impl Resampling {
    /// Name the external toolchain expects.
    pub fn as_str(&self) -> &'static str {
        match self {
            Resampling::Nearest => "near",
            Resampling::Bilinear => "bilinear",
            Resampling::Max => "max",
        }
    }
}

/// Errors from raster engine invocations.
#[derive(Debug, Error)]
pub enum RasterError {
    /// The external tool could not be started.
    #[error("failed to start {tool}: {source}")]
    Spawn {
        tool: String,
        #[source]
        source: std::io::Error,
    },

    /// The external tool exited unsuccessfully.
    #[error("{tool} failed ({status}): {stderr}")]
    ToolFailed {
        tool: String,
        status: String,
        stderr: String,
    },

    /// The external tool exceeded the configured timeout.
    #[error("{tool} timed out after {timeout_secs}s")]
    Timeout { tool: String, timeout_secs: u64 },

    /// A tool output file could not be read or parsed.
    #[error("unreadable output {path}: {reason}")]
    OutputUnreadable { path: PathBuf, reason: String },
}

/// Warp/mask/polygonize/merge/enhance operations over raster files.
///
/// Each call blocks until the underlying tool completes (the pipeline is
/// synchronous per territory) and returns a fatal error on failure.
pub trait RasterEngine: Send + Sync {
    /// Warp `source` to `dest` at a fixed ground resolution (degrees per
    /// pixel in the target SRS). Used for low-resolution previews.
    fn warp_to_resolution(
        &self,
        source: &str,
        dest: &Path,
        x_res: f64,
        y_res: f64,
        resampling: Resampling,
        target_srs: &str,
    ) -> Result<(), RasterError>;

    /// Warp `source` to `dest`, clipped to `bbox` and resized to exactly
    /// `width_px` × `height_px`. Used for high-resolution patch
    /// extraction.
    #[allow(clippy::too_many_arguments)]
    fn warp_to_bbox(
        &self,
        source: &str,
        dest: &Path,
        bbox: &BoundingBox,
        width_px: u32,
        height_px: u32,
        resampling: Resampling,
        target_srs: &str,
    ) -> Result<(), RasterError>;

    /// Evaluate a band expression over the first three bands of `input`
    /// (bound to `A`, `B`, `C`) and write the result to `dest` with the
    /// given nodata value.
    fn band_expression(
        &self,
        input: &Path,
        expression: &str,
        nodata: f64,
        dest: &Path,
    ) -> Result<(), RasterError>;

    /// Polygonize the non-nodata area of `raster` (masked by itself) into
    /// a GeoJSON FeatureCollection written to `dest` and returned parsed.
    fn polygonize(&self, raster: &Path, dest: &Path) -> Result<GeoJson, RasterError>;

    /// Merge rasters into a single composite at `dest`. Inputs are painted
    /// in order: later entries override earlier ones where they overlap.
    fn merge(&self, inputs: &[PathBuf], dest: &Path) -> Result<(), RasterError>;

    /// Apply a contrast LUT configuration to `input`, writing `dest`.
    fn enhance(&self, lut_config: &Path, input: &Path, dest: &Path) -> Result<(), RasterError>;
}
