//! STAC catalog client.
//!
//! Implements [`SceneCatalogClient`] against a STAC API `POST /search`
//! endpoint. Only the item fields the pipeline uses are extracted: id,
//! acquisition datetime, cloud cover and the asset href map. Items that
//! lack an id or datetime are skipped with a warning rather than failing
//! the whole search.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{debug, warn};

use super::http::HttpClient;
use super::types::{CatalogError, Scene, SceneCatalogClient, SceneQuery};

/// STAC item collection, reduced to the fields the pipeline consumes.
#[derive(Debug, Deserialize)]
struct ItemCollection {
    #[serde(default)]
    features: Vec<Item>,
}

#[derive(Debug, Deserialize)]
struct Item {
    id: Option<String>,
    #[serde(default)]
    properties: ItemProperties,
    #[serde(default)]
    assets: HashMap<String, ItemAsset>,
}

#[derive(Debug, Default, Deserialize)]
struct ItemProperties {
    datetime: Option<String>,
    #[serde(rename = "eo:cloud_cover")]
    cloud_cover: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct ItemAsset {
    href: String,
}

/// Catalog client for a STAC API endpoint.
pub struct StacCatalogClient {
    base_url: String,
    http: Arc<dyn HttpClient>,
}

impl StacCatalogClient {
    /// Create a client for the given STAC API base URL.
    ///
    /// The base URL is the catalog root (e.g. `https://.../stac/v1`);
    /// `/search` is appended per request.
    pub fn new(base_url: impl Into<String>, http: Arc<dyn HttpClient>) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self { base_url, http }
    }

    fn search_body(query: &SceneQuery) -> serde_json::Value {
        serde_json::json!({
            "collections": query.collections,
            "intersects": query.intersects,
            "datetime": query.datetime_interval(),
            "limit": query.limit,
        })
    }

    fn parse_item(item: Item) -> Option<Scene> {
        let id = match item.id {
            Some(id) => id,
            None => {
                warn!("Skipping catalog item without id");
                return None;
            }
        };

        let datetime = match item.properties.datetime.as_deref() {
            Some(raw) => match DateTime::parse_from_rfc3339(raw) {
                Ok(dt) => dt.with_timezone(&Utc),
                Err(e) => {
                    warn!(scene = %id, error = %e, "Skipping item with unparseable datetime");
                    return None;
                }
            },
            None => {
                warn!(scene = %id, "Skipping item without acquisition datetime");
                return None;
            }
        };

        let assets = item
            .assets
            .into_iter()
            .map(|(name, asset)| (name, asset.href))
            .collect();

        Some(Scene {
            id,
            datetime,
            cloud_cover: item.properties.cloud_cover,
            assets,
        })
    }
}

impl SceneCatalogClient for StacCatalogClient {
    fn search(&self, query: &SceneQuery) -> Result<Vec<Scene>, CatalogError> {
        let url = format!("{}/search", self.base_url);
        let body = Self::search_body(query);

        debug!(url = %url, interval = %query.datetime_interval(), "Searching catalog");
        let response = self.http.post_json(&url, &body)?;

        let collection: ItemCollection = serde_json::from_str(&response)
            .map_err(|e| CatalogError::ParseFailed(e.to_string()))?;

        let mut scenes: Vec<Scene> = collection
            .features
            .into_iter()
            .filter_map(Self::parse_item)
            .collect();

        // Most recent acquisition first.
        scenes.sort_by(|a, b| b.datetime.cmp(&a.datetime));

        debug!(count = scenes.len(), "Catalog search complete");
        Ok(scenes)
    }
}
