//! Quantized square-cell grid index.
//!
//! The shipping [`HexGridIndex`](super::HexGridIndex) implementation:
//! axis-aligned square cells on a fixed lat/lon lattice. At resolution
//! `r` the cell edge is `1 / 2^r` degrees, so resolution 8 gives cells
//! of roughly 430 m at the equator, comparable to the hex resolution
//! the coverage accounting was tuned for.
//!
//! Cell membership is decided by even-odd containment of the cell
//! center; polygon vertices additionally pin their containing cells so
//! thin slivers are never lost entirely.

use std::collections::HashSet;

use crate::territory::{BoundingBox, GeoJson};

use super::{GridError, HexCell};

/// Lattice offset keeping packed indices non-negative. Each axis index
/// occupies 28 bits, so the offset must itself fit the field: 2^27
/// centers the range and covers [-180, 180] × [-90, 90] up to
/// resolution 19 (180 × 2^19 < 2^27).
const INDEX_OFFSET: i64 = 1 << 27;

/// Square-cell grid index on a fixed lat/lon lattice.
#[derive(Debug, Clone, Copy, Default)]
pub struct SquareGridIndex;

impl SquareGridIndex {
    pub fn new() -> Self {
        Self
    }

    fn edge(resolution: u8) -> f64 {
        1.0 / f64::from(1u32 << resolution.min(31))
    }

    fn cell_at(x: f64, y: f64, resolution: u8) -> HexCell {
        let edge = Self::edge(resolution);
        let ix = (x / edge).floor() as i64 + INDEX_OFFSET;
        let iy = (y / edge).floor() as i64 + INDEX_OFFSET;
        // Layout: resolution in the top byte, then 28 bits per axis.
        let packed = (u64::from(resolution) << 56)
            | ((ix as u64 & 0x0FFF_FFFF) << 28)
            | (iy as u64 & 0x0FFF_FFFF);
        HexCell(packed)
    }

    fn unpack(cell: HexCell) -> (u8, i64, i64) {
        let resolution = (cell.0 >> 56) as u8;
        let ix = ((cell.0 >> 28) & 0x0FFF_FFFF) as i64 - INDEX_OFFSET;
        let iy = (cell.0 & 0x0FFF_FFFF) as i64 - INDEX_OFFSET;
        (resolution, ix, iy)
    }

    /// Exterior rings of a Polygon or MultiPolygon geometry.
    fn rings(geometry: &GeoJson) -> Result<Vec<Vec<(f64, f64)>>, GridError> {
        let parse_ring = |ring: &GeoJson| -> Vec<(f64, f64)> {
            ring.as_array()
                .map(|points| {
                    points
                        .iter()
                        .filter_map(|p| {
                            let x = p.get(0).and_then(GeoJson::as_f64)?;
                            let y = p.get(1).and_then(GeoJson::as_f64)?;
                            Some((x, y))
                        })
                        .collect()
                })
                .unwrap_or_default()
        };

        let coordinates = &geometry["coordinates"];
        let rings = match geometry["type"].as_str() {
            Some("Polygon") => coordinates
                .as_array()
                .map(|rings| rings.iter().take(1).map(parse_ring).collect())
                .unwrap_or_default(),
            Some("MultiPolygon") => coordinates
                .as_array()
                .map(|polygons| {
                    polygons
                        .iter()
                        .filter_map(|polygon| polygon.get(0))
                        .map(parse_ring)
                        .collect()
                })
                .unwrap_or_default(),
            other => {
                return Err(GridError::Conversion(format!(
                    "unsupported geometry type {:?}",
                    other
                )))
            }
        };
        Ok(rings)
    }

    /// Even-odd containment test.
    fn contains(ring: &[(f64, f64)], x: f64, y: f64) -> bool {
        let mut inside = false;
        let n = ring.len();
        if n < 3 {
            return false;
        }
        let mut j = n - 1;
        for i in 0..n {
            let (xi, yi) = ring[i];
            let (xj, yj) = ring[j];
            if (yi > y) != (yj > y) && x < (xj - xi) * (y - yi) / (yj - yi) + xi {
                inside = !inside;
            }
            j = i;
        }
        inside
    }
}

impl super::HexGridIndex for SquareGridIndex {
    fn to_cells(&self, geometry: &GeoJson, resolution: u8) -> Result<HashSet<HexCell>, GridError> {
        let rings = Self::rings(geometry)?;
        let edge = Self::edge(resolution);
        let mut cells = HashSet::new();

        for ring in &rings {
            if ring.is_empty() {
                continue;
            }

            // Vertices pin their cells even when no center falls inside.
            for &(x, y) in ring {
                cells.insert(Self::cell_at(x, y, resolution));
            }

            let min_x = ring.iter().map(|p| p.0).fold(f64::INFINITY, f64::min);
            let max_x = ring.iter().map(|p| p.0).fold(f64::NEG_INFINITY, f64::max);
            let min_y = ring.iter().map(|p| p.1).fold(f64::INFINITY, f64::min);
            let max_y = ring.iter().map(|p| p.1).fold(f64::NEG_INFINITY, f64::max);

            let first_ix = (min_x / edge).floor() as i64;
            let last_ix = (max_x / edge).floor() as i64;
            let first_iy = (min_y / edge).floor() as i64;
            let last_iy = (max_y / edge).floor() as i64;

            for ix in first_ix..=last_ix {
                for iy in first_iy..=last_iy {
                    let cx = (ix as f64 + 0.5) * edge;
                    let cy = (iy as f64 + 0.5) * edge;
                    if Self::contains(ring, cx, cy) {
                        cells.insert(Self::cell_at(cx, cy, resolution));
                    }
                }
            }
        }

        Ok(cells)
    }

    fn to_geometry(&self, cells: &HashSet<HexCell>) -> GeoJson {
        let mut boxes: Vec<BoundingBox> = cells.iter().map(|c| self.cell_bbox(*c)).collect();
        boxes.sort_by(|a, b| {
            a.min_x
                .partial_cmp(&b.min_x)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(
                    a.min_y
                        .partial_cmp(&b.min_y)
                        .unwrap_or(std::cmp::Ordering::Equal),
                )
        });
        let polygons: Vec<GeoJson> = boxes
            .iter()
            .map(|b| b.to_polygon()["coordinates"].clone())
            .collect();
        serde_json::json!({ "type": "MultiPolygon", "coordinates": polygons })
    }

    fn cell_bbox(&self, cell: HexCell) -> BoundingBox {
        let (resolution, ix, iy) = Self::unpack(cell);
        let edge = Self::edge(resolution);
        BoundingBox::new(
            ix as f64 * edge,
            iy as f64 * edge,
            (ix + 1) as f64 * edge,
            (iy + 1) as f64 * edge,
        )
    }
}
