//! Assembler error type.

use std::fmt;

use crate::coverage::CoverageError;
use crate::detector::DetectorError;
use crate::enhance::EnhanceError;
use crate::grid::GridError;
use crate::patch::PatchError;
use crate::raster::RasterError;
use crate::storage::StorageError;

/// Errors that can fail a mosaic job.
#[derive(Debug)]
pub enum AssemblerError {
    /// The catalog returned no scenes for the territory and interval.
    NoScenes {
        territory: String,
        interval: String,
    },
    /// Scenes were found but none passed the acceptance criterion.
    NoAcceptedScenes {
        territory: String,
        evaluated: usize,
    },
    /// Greedy selection ran out of scenes with cells still uncovered.
    CoverageExhausted {
        covered: usize,
        missing: usize,
    },
    /// Every selected scene dropped out before compositing.
    EmptyComposite {
        territory: String,
    },
    /// Hex grid failure.
    Grid(GridError),
    /// Useful-area detection failure.
    Detector(DetectorError),
    /// Patch extraction failure.
    Patch(PatchError),
    /// Contrast calibration failure.
    Enhance(EnhanceError),
    /// Raster tool failure.
    Raster(RasterError),
    /// Upload failure.
    Storage(StorageError),
    /// Scratch directory I/O failure.
    Io(std::io::Error),
}

impl fmt::Display for AssemblerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssemblerError::NoScenes {
                territory,
                interval,
            } => write!(
                f,
                "No scenes found for territory {} in interval {}",
                territory, interval
            ),
            AssemblerError::NoAcceptedScenes {
                territory,
                evaluated,
            } => write!(
                f,
                "None of {} evaluated scenes accepted for territory {}",
                evaluated, territory
            ),
            AssemblerError::CoverageExhausted { covered, missing } => write!(
                f,
                "Scene pool exhausted with {} cells covered and {} still uncovered",
                covered, missing
            ),
            AssemblerError::EmptyComposite { territory } => write!(
                f,
                "No calibrated layers left to composite for territory {}",
                territory
            ),
            AssemblerError::Grid(e) => write!(f, "Grid error: {}", e),
            AssemblerError::Detector(e) => write!(f, "Detection error: {}", e),
            AssemblerError::Patch(e) => write!(f, "Patch extraction error: {}", e),
            AssemblerError::Enhance(e) => write!(f, "Calibration error: {}", e),
            AssemblerError::Raster(e) => write!(f, "Raster tool error: {}", e),
            AssemblerError::Storage(e) => write!(f, "Storage error: {}", e),
            AssemblerError::Io(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl std::error::Error for AssemblerError {}

impl From<GridError> for AssemblerError {
    fn from(e: GridError) -> Self {
        AssemblerError::Grid(e)
    }
}

impl From<DetectorError> for AssemblerError {
    fn from(e: DetectorError) -> Self {
        AssemblerError::Detector(e)
    }
}

impl From<PatchError> for AssemblerError {
    fn from(e: PatchError) -> Self {
        AssemblerError::Patch(e)
    }
}

impl From<EnhanceError> for AssemblerError {
    fn from(e: EnhanceError) -> Self {
        AssemblerError::Enhance(e)
    }
}

impl From<RasterError> for AssemblerError {
    fn from(e: RasterError) -> Self {
        AssemblerError::Raster(e)
    }
}

impl From<StorageError> for AssemblerError {
    fn from(e: StorageError) -> Self {
        AssemblerError::Storage(e)
    }
}

impl From<std::io::Error> for AssemblerError {
    fn from(e: std::io::Error) -> Self {
        AssemblerError::Io(e)
    }
}

impl From<CoverageError> for AssemblerError {
    fn from(e: CoverageError) -> Self {
        match e {
            CoverageError::Exhausted(selection) => AssemblerError::CoverageExhausted {
                covered: selection.covered_count(),
                missing: selection.uncovered.len(),
            },
        }
    }
}
