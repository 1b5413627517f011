//! Scene and query types for catalog search.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use thiserror::Error;

use crate::territory::GeoJson;

/// Errors that can occur during catalog search.
///
/// Search errors are non-fatal for the pipeline: the assembler logs them
/// and degrades to an empty scene list.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// The catalog endpoint could not be reached.
    #[error("catalog unreachable: {0}")]
    Unreachable(String),

    /// The catalog rejected the query.
    #[error("catalog rejected query: {0}")]
    QueryRejected(String),

    /// The response body could not be parsed as a STAC item collection.
    #[error("failed to parse catalog response: {0}")]
    ParseFailed(String),
}

/// A satellite scene as discovered in the catalog.
///
/// Immutable after discovery; all derived per-scene state lives in the
/// assembler's scoreboard.
#[derive(Debug, Clone)]
pub struct Scene {
    /// Catalog item id, unique within a collection.
    pub id: String,

    /// Acquisition datetime.
    pub datetime: DateTime<Utc>,

    /// Reported cloud-cover percentage, when the collection provides one.
    pub cloud_cover: Option<f64>,

    /// Asset name → retrievable URL.
    pub assets: HashMap<String, String>,
}

impl Scene {
    /// URL of a named asset, if the scene carries it.
    pub fn asset_url(&self, name: &str) -> Option<&str> {
        self.assets.get(name).map(String::as_str)
    }

    /// Acquisition date as `YYYYMMDD`, from the catalog datetime.
    pub fn acquisition_date(&self) -> String {
        self.datetime.format("%Y%m%d").to_string()
    }
}

/// Parameters of a catalog search.
#[derive(Debug, Clone)]
pub struct SceneQuery {
    /// Collections to search.
    pub collections: Vec<String>,

    /// AOI geometry the scenes must intersect.
    pub intersects: GeoJson,

    /// Start of the acquisition window (inclusive).
    pub start: NaiveDate,

    /// End of the acquisition window (inclusive).
    pub end: NaiveDate,

    /// Maximum number of items to return.
    pub limit: usize,
}

impl SceneQuery {
    /// Create a query over a single collection.
    pub fn new(
        collection: impl Into<String>,
        intersects: GeoJson,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Self {
        Self {
            collections: vec![collection.into()],
            intersects,
            start,
            end,
            limit: 1000,
        }
    }

    /// Set the maximum number of items.
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    /// Datetime interval in the `start/end` form catalogs expect.
    pub fn datetime_interval(&self) -> String {
        format!(
            "{}/{}",
            self.start.format("%Y-%m-%d"),
            self.end.format("%Y-%m-%d")
        )
    }
}

/// Time/geometry-filtered scene search.
///
/// Implementations must return scenes sorted by acquisition datetime
/// descending (most recent first).
pub trait SceneCatalogClient: Send + Sync {
    /// Search for scenes matching the query.
    fn search(&self, query: &SceneQuery) -> Result<Vec<Scene>, CatalogError>;
}
