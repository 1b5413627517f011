//! TerraMosaic - Cloud-free satellite mosaic assembly
//!
//! This library assembles published mosaics for territories from a STAC
//! scene catalog: it detects each scene's useful (valid, non-saturated)
//! area on a hex grid, greedily selects a minimal covering subset,
//! extracts high-resolution patches, calibrates contrast per acquisition
//! date and composites the layers into a single GeoTIFF.
//!
//! External collaborators sit behind traits: [`catalog::SceneCatalogClient`]
//! for the catalog, [`raster::RasterEngine`] for the raster toolchain,
//! [`grid::HexGridIndex`] for hex indexing and [`storage::ObjectStore`]
//! for publication. [`assembler::MosaicAssembler`] wires them together.

pub mod assembler;
pub mod catalog;
pub mod config;
pub mod coverage;
pub mod detector;
pub mod enhance;
pub mod grid;
pub mod patch;
pub mod raster;
pub mod storage;
pub mod territory;
pub mod workdir;
