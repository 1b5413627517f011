//! Hexagonal grid index abstraction.
//!
//! Coverage accounting discretizes geometry into fixed-resolution grid
//! cells. Geometry-to-cell conversion sits behind the [`HexGridIndex`]
//! trait, which keeps the pipeline testable with synthetic grids and open
//! to an external hex-grid library; [`SquareGridIndex`] is the shipped
//! implementation.
//!
//! All hex sets produced through this seam are deduplicated and unordered;
//! callers intersect them against the AOI universe before counting coverage.

mod square;

pub use square::SquareGridIndex;

use std::collections::HashSet;
use std::fmt;

use thiserror::Error;

use crate::territory::{BoundingBox, GeoJson};

/// Default grid resolution used throughout the pipeline.
pub const DEFAULT_GRID_RESOLUTION: u8 = 8;

/// Opaque identifier for a single hexagonal grid cell.
///
/// The inner value is the external grid library's 64-bit cell index. The
/// pipeline never interprets it beyond equality and hashing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HexCell(pub u64);

impl fmt::Display for HexCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:x}", self.0)
    }
}

/// Errors from hex-grid conversions.
#[derive(Debug, Error)]
pub enum GridError {
    /// The geometry could not be converted to cells.
    #[error("failed to convert geometry to hex cells: {0}")]
    Conversion(String),

    /// An operation was attempted over an empty cell set.
    #[error("hex cell set is empty")]
    EmptyCellSet,
}

/// Geometry ⇄ hex-cell-set conversion seam.
///
/// Implementations wrap the external hex-grid library. Must be thread-safe
/// so the assembler can be shared across territory runs.
pub trait HexGridIndex: Send + Sync {
    /// Convert a GeoJSON geometry into the set of cells covering it at the
    /// given resolution.
    fn to_cells(&self, geometry: &GeoJson, resolution: u8) -> Result<HashSet<HexCell>, GridError>;

    /// Convert a cell set back into a GeoJSON geometry (multi-polygon).
    fn to_geometry(&self, cells: &HashSet<HexCell>) -> GeoJson;

    /// Bounding box of a single cell in the working coordinate system.
    fn cell_bbox(&self, cell: HexCell) -> BoundingBox;
}

/// Bounding box of a set of hex cells: the union of every cell's bbox.
///
/// Errors on an empty set; a patch extraction over an empty assignment is a
/// pipeline invariant violation upstream.
pub fn cells_bounding_box(
    grid: &dyn HexGridIndex,
    cells: &HashSet<HexCell>,
) -> Result<BoundingBox, GridError> {
    let mut iter = cells.iter();
    let first = iter.next().ok_or(GridError::EmptyCellSet)?;
    let mut bbox = grid.cell_bbox(*first);
    for cell in iter {
        bbox = bbox.union(&grid.cell_bbox(*cell));
    }
    Ok(bbox)
}
