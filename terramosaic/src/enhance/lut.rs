//! Contrast LUT computation.
//!
//! A LUT configuration is computed from one reference raster per date
//! group: per-band percentile cut points (1st/99th by default) plus a
//! gamma adjustment, written as a per-band config file the raster
//! engine's enhance operation consumes.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

use crate::raster::RasterError;

/// Errors from LUT computation and application.
#[derive(Debug, Error)]
pub enum EnhanceError {
    /// The reference raster could not be decoded.
    #[error("failed to read reference raster {path}: {reason}")]
    ReferenceUnreadable { path: PathBuf, reason: String },

    /// The LUT config file could not be written.
    #[error("failed to write LUT config {path}: {source}")]
    ConfigWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Applying the LUT through the raster engine failed.
    #[error(transparent)]
    Raster(#[from] RasterError),
}

/// Computes a contrast LUT configuration from a reference raster.
pub trait LutEngine: Send + Sync {
    /// Compute cut points from `reference` and write the LUT config to
    /// `dest`.
    fn compute_lut(
        &self,
        reference: &Path,
        dest: &Path,
        pct_low: f64,
        pct_high: f64,
        gamma: f64,
    ) -> Result<(), EnhanceError>;
}

/// LUT engine that decodes the reference with the `image` crate and takes
/// per-channel percentile cut points over non-zero (valid data) pixels.
pub struct ImageLutEngine;

impl ImageLutEngine {
    /// Percentile cut point over a 256-bin histogram.
    ///
    /// Returns the smallest value whose cumulative count reaches the given
    /// percentile of the total.
    fn percentile_cut(histogram: &[u64; 256], total: u64, percentile: f64) -> u8 {
        if total == 0 {
            return 0;
        }
        let target = (total as f64 * percentile / 100.0).ceil() as u64;
        let mut cumulative = 0u64;
        for (value, count) in histogram.iter().enumerate() {
            cumulative += count;
            if cumulative >= target {
                return value as u8;
            }
        }
        255
    }
}

impl LutEngine for ImageLutEngine {
    fn compute_lut(
        &self,
        reference: &Path,
        dest: &Path,
        pct_low: f64,
        pct_high: f64,
        gamma: f64,
    ) -> Result<(), EnhanceError> {
        let img = image::open(reference).map_err(|e| EnhanceError::ReferenceUnreadable {
            path: reference.to_path_buf(),
            reason: e.to_string(),
        })?;
        let rgb = img.to_rgb8();

        // Per-channel histograms over valid (non-zero) pixels; zero is the
        // nodata value throughout the pipeline.
        let mut histograms = [[0u64; 256]; 3];
        let mut totals = [0u64; 3];
        for pixel in rgb.pixels() {
            for (channel, &value) in pixel.0.iter().enumerate() {
                if value > 0 {
                    histograms[channel][value as usize] += 1;
                    totals[channel] += 1;
                }
            }
        }

        let mut config = String::new();
        for channel in 0..3 {
            let src_min = Self::percentile_cut(&histograms[channel], totals[channel], pct_low);
            let src_max = Self::percentile_cut(&histograms[channel], totals[channel], pct_high);
            // Guard degenerate ranges so the stretch stays invertible.
            let src_max = src_max.max(src_min.saturating_add(1));
            config.push_str(&format!(
                "{} gamma={} {} {} 0 255\n",
                channel + 1,
                gamma,
                src_min,
                src_max
            ));
        }

        std::fs::write(dest, &config).map_err(|source| EnhanceError::ConfigWrite {
            path: dest.to_path_buf(),
            source,
        })?;

        debug!(
            reference = %reference.display(),
            dest = %dest.display(),
            "LUT config written"
        );
        Ok(())
    }
}
