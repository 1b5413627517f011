//! Raster toolchain abstraction.
//!
//! Every pixel-level operation (warp, band math, polygonize, merge,
//! enhance) is delegated to an external raster-processing toolchain behind
//! the [`RasterEngine`] trait. The concrete [`GdalRasterEngine`] shells out
//! to the GDAL command-line utilities with argument-vector invocations.
//!
//! A failed engine call is fatal for the territory being assembled; the
//! error carries the tool name, exit status and captured stderr for
//! diagnosis.

mod gdal;
mod types;

pub use gdal::GdalRasterEngine;
pub use types::{RasterEngine, RasterError, Resampling};
