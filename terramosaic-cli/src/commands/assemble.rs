//! Mosaic assembly CLI command.
//!
//! Resolves settings as CLI flags > config file > defaults, wires the
//! concrete collaborators (STAC catalog over HTTP, GDAL subprocess
//! engine, square grid index, image-based LUT engine, local or HTTP
//! object store) and runs one territory job.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::NaiveDate;
use clap::Args;

use terramosaic::assembler::{JobOutcome, MosaicAssembler};
use terramosaic::catalog::{ReqwestClient, StacCatalogClient};
use terramosaic::config::{AssemblerConfig, ConfigFile};
use terramosaic::enhance::ImageLutEngine;
use terramosaic::grid::SquareGridIndex;
use terramosaic::raster::GdalRasterEngine;
use terramosaic::storage::{HttpObjectStore, LocalObjectStore, ObjectStore};
use terramosaic::territory::{BoundingBox, GeoJson, Territory};

use crate::error::CliError;

/// Arguments for `terramosaic assemble`.
#[derive(Debug, Args)]
pub struct AssembleArgs {
    /// Territory identifier (used for scratch dirs and the published key)
    #[arg(long)]
    pub territory: String,

    /// Path to a GeoJSON file with the territory geometry
    #[arg(long)]
    pub geometry: PathBuf,

    /// Optimum bounding box as min_x,min_y,max_x,max_y (degrees)
    #[arg(long)]
    pub bbox: String,

    /// Full-canvas width in pixels
    #[arg(long)]
    pub width: u32,

    /// Full-canvas height in pixels
    #[arg(long)]
    pub height: u32,

    /// Acquisition interval start (YYYY-MM-DD)
    #[arg(long)]
    pub start: NaiveDate,

    /// Acquisition interval end (YYYY-MM-DD)
    #[arg(long)]
    pub end: NaiveDate,

    /// Override the configured catalog collection
    #[arg(long)]
    pub collection: Option<String>,

    /// Override the configured catalog URL
    #[arg(long)]
    pub catalog_url: Option<String>,

    /// HTTP object store endpoint; uploads go to {endpoint}/{bucket}/{key}
    #[arg(long)]
    pub store_endpoint: Option<String>,

    /// Local object store root, used when no endpoint is given
    #[arg(long, default_value = "published")]
    pub store_root: PathBuf,
}

/// Run the assemble command.
pub fn run(args: AssembleArgs) -> Result<(), CliError> {
    let config_file = ConfigFile::load().unwrap_or_default();
    let mut config = AssemblerConfig::from_config_file(&config_file);
    if let Some(url) = args.catalog_url {
        config.catalog_url = url;
    }
    if let Some(collection) = args.collection {
        config.collection = collection;
    }

    let geometry = load_geometry(&args.geometry)?;
    let bbox = parse_bbox(&args.bbox)?;
    let territory = Territory::new(
        args.territory.clone(),
        geometry,
        bbox,
        args.width,
        args.height,
    );

    let http = Arc::new(
        ReqwestClient::new().map_err(|e| CliError::Config(e.to_string()))?,
    );
    let catalog = Arc::new(StacCatalogClient::new(config.catalog_url.clone(), http));

    let mut engine = GdalRasterEngine::new();
    if let Some(timeout) = config.external_timeout {
        engine = engine.with_timeout(timeout);
    }

    let store: Arc<dyn ObjectStore> = match args.store_endpoint {
        Some(endpoint) => Arc::new(
            HttpObjectStore::new(endpoint).map_err(|e| CliError::Config(e.to_string()))?,
        ),
        None => Arc::new(LocalObjectStore::new(args.store_root)),
    };

    let assembler = MosaicAssembler::new(
        config,
        catalog,
        Arc::new(engine),
        Arc::new(SquareGridIndex::new()),
        Arc::new(ImageLutEngine),
        store,
    );

    println!(
        "Assembling mosaic for territory {} ({} to {})...",
        args.territory, args.start, args.end
    );

    let job = assembler.run(&territory, args.start, args.end);

    let accepted = job.accepted_scenes().len();
    println!(
        "Scenes evaluated: {} ({} accepted)",
        job.scenes.len(),
        accepted
    );

    match job.outcome {
        Some(JobOutcome::Published { bucket, key, .. }) => {
            println!("Published: {}/{}", bucket, key);
            Ok(())
        }
        Some(JobOutcome::Failed { stage, error }) => Err(CliError::Assembly {
            stage: stage.to_string(),
            error,
        }),
        None => Err(CliError::Assembly {
            stage: "unknown".to_string(),
            error: "job produced no outcome".to_string(),
        }),
    }
}

/// Load a GeoJSON geometry from a file.
///
/// Accepts a bare geometry or a Feature wrapping one.
fn load_geometry(path: &PathBuf) -> Result<GeoJson, CliError> {
    let raw = std::fs::read_to_string(path).map_err(|e| {
        CliError::InvalidArgument(format!("cannot read {}: {}", path.display(), e))
    })?;
    let value: GeoJson = serde_json::from_str(&raw).map_err(|e| {
        CliError::InvalidArgument(format!("{} is not valid GeoJSON: {}", path.display(), e))
    })?;

    if value["type"] == "Feature" {
        return Ok(value["geometry"].clone());
    }
    Ok(value)
}

/// Parse `min_x,min_y,max_x,max_y`.
fn parse_bbox(raw: &str) -> Result<BoundingBox, CliError> {
    let parts: Vec<f64> = raw
        .split(',')
        .map(|p| p.trim().parse::<f64>())
        .collect::<Result<_, _>>()
        .map_err(|e| CliError::InvalidArgument(format!("bad bbox '{}': {}", raw, e)))?;
    if parts.len() != 4 {
        return Err(CliError::InvalidArgument(format!(
            "bbox '{}' must have exactly 4 comma-separated numbers",
            raw
        )));
    }
    if parts[0] >= parts[2] || parts[1] >= parts[3] {
        return Err(CliError::InvalidArgument(format!(
            "bbox '{}' is degenerate (min must be less than max)",
            raw
        )));
    }
    Ok(BoundingBox::new(parts[0], parts[1], parts[2], parts[3]))
}
