//! Scene catalog abstraction.
//!
//! This module provides the types and traits for discovering satellite
//! scenes through a STAC catalog, plus the concrete [`StacCatalogClient`]
//! implementation.
//!
//! The catalog is an external collaborator: the pipeline only relies on
//! time/geometry-filtered search returning scenes sorted by acquisition
//! datetime descending.

mod http;
mod stac;
mod types;

pub use http::{HttpClient, ReqwestClient};
pub use stac::StacCatalogClient;
pub use types::{CatalogError, Scene, SceneCatalogClient, SceneQuery};

#[cfg(test)]
pub use http::tests::MockHttpClient;
