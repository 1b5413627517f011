//! Territory (AOI) input record.
//!
//! A territory is the immutable description of the area a mosaic is built
//! for: an identifier, the AOI polygon, the print-optimized bounding box and
//! the target canvas size in pixels. The paper-size / DPI arithmetic that
//! produces the optimum bbox and canvas dimensions happens in an external
//! geometry calculator; this module only consumes its output.

use serde::{Deserialize, Serialize};

/// GeoJSON value as exchanged with the catalog, the hex grid and the raster
/// toolchain. Kept as loose JSON; the pipeline never edits coordinates.
pub type GeoJson = serde_json::Value;

/// Axis-aligned bounding box in the working coordinate system
/// (`[min_x, min_y, max_x, max_y]` order on the wire).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl BoundingBox {
    /// Create a bounding box from corner coordinates.
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    /// Width in coordinate units.
    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    /// Height in coordinate units.
    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    /// Smallest box containing both boxes.
    pub fn union(&self, other: &BoundingBox) -> BoundingBox {
        BoundingBox {
            min_x: self.min_x.min(other.min_x),
            min_y: self.min_y.min(other.min_y),
            max_x: self.max_x.max(other.max_x),
            max_y: self.max_y.max(other.max_y),
        }
    }

    /// Closed GeoJSON polygon ring for this box.
    pub fn to_polygon(&self) -> GeoJson {
        serde_json::json!({
            "type": "Polygon",
            "coordinates": [[
                [self.min_x, self.min_y],
                [self.min_x, self.max_y],
                [self.max_x, self.max_y],
                [self.max_x, self.min_y],
                [self.min_x, self.min_y],
            ]]
        })
    }
}

/// Immutable AOI record driving one mosaic run.
#[derive(Debug, Clone)]
pub struct Territory {
    /// Unique territory identifier; keys the scratch directory and the
    /// published object.
    pub id: String,

    /// AOI polygon geometry (GeoJSON), used for the catalog search.
    pub geometry: GeoJson,

    /// Print-optimized bounding box covering the AOI with margins, as
    /// produced by the external geometry calculator.
    pub bbox_optimum: BoundingBox,

    /// Target canvas width in pixels.
    pub canvas_width_px: u32,

    /// Target canvas height in pixels.
    pub canvas_height_px: u32,
}

impl Territory {
    /// Create a territory record.
    pub fn new(
        id: impl Into<String>,
        geometry: GeoJson,
        bbox_optimum: BoundingBox,
        canvas_width_px: u32,
        canvas_height_px: u32,
    ) -> Self {
        Self {
            id: id.into(),
            geometry,
            bbox_optimum,
            canvas_width_px,
            canvas_height_px,
        }
    }

    /// The optimum bbox as a GeoJSON polygon (hex universe source geometry).
    pub fn bbox_polygon(&self) -> GeoJson {
        self.bbox_optimum.to_polygon()
    }

    /// Pixel dimensions for a sub-bbox extracted at the same pixel density
    /// as the full canvas.
    ///
    /// A patch covering half the optimum bbox width renders at half the
    /// canvas width, keeping every patch at a uniform ground resolution.
    /// Results are rounded and clamped to at least one pixel.
    pub fn scaled_pixels(&self, patch_bbox: &BoundingBox) -> (u32, u32) {
        let width_ratio = patch_bbox.width() / self.bbox_optimum.width();
        let height_ratio = patch_bbox.height() / self.bbox_optimum.height();

        let width_px = (self.canvas_width_px as f64 * width_ratio).round() as u32;
        let height_px = (self.canvas_height_px as f64 * height_ratio).round() as u32;

        (width_px.max(1), height_px.max(1))
    }
}
