//! Durable object storage for published mosaics.
//!
//! The assembler publishes each finished mosaic under a key derived from
//! the territory id. Storage is an external collaborator behind the
//! [`ObjectStore`] trait; two implementations are provided: an HTTP PUT
//! store for bucket gateways and a filesystem store for local runs and
//! tests.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::info;

/// Errors that can occur during upload.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The local artifact could not be read.
    #[error("failed to read {path}: {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The store rejected or never received the upload.
    #[error("upload to {bucket}/{key} failed: {reason}")]
    UploadFailed {
        bucket: String,
        key: String,
        reason: String,
    },
}

/// Uploads local artifacts to durable storage.
///
/// Stateless per call; safe to share across concurrent territory runs.
pub trait ObjectStore: Send + Sync {
    /// Upload `local_path` to `bucket` under `key`.
    fn upload(&self, local_path: &Path, bucket: &str, key: &str) -> Result<(), StorageError>;
}

/// Object store writing into a local directory tree (`root/bucket/key`).
///
/// Used for development runs and tests; the layout mirrors the bucket/key
/// structure of the real store.
pub struct LocalObjectStore {
    root: PathBuf,
}

impl LocalObjectStore {
    /// Create a store rooted at the given directory.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl ObjectStore for LocalObjectStore {
    fn upload(&self, local_path: &Path, bucket: &str, key: &str) -> Result<(), StorageError> {
        let dest = self.root.join(bucket).join(key);
        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent).map_err(|e| StorageError::UploadFailed {
                bucket: bucket.to_string(),
                key: key.to_string(),
                reason: e.to_string(),
            })?;
        }
        std::fs::copy(local_path, &dest).map_err(|source| StorageError::ReadFailed {
            path: local_path.to_path_buf(),
            source,
        })?;

        info!(bucket = bucket, key = key, dest = %dest.display(), "Mosaic stored locally");
        Ok(())
    }
}

/// Object store PUTing to an HTTP bucket gateway
/// (`{endpoint}/{bucket}/{key}`).
pub struct HttpObjectStore {
    client: reqwest::blocking::Client,
    endpoint: String,
}

impl HttpObjectStore {
    /// Create a store for the given gateway endpoint.
    pub fn new(endpoint: impl Into<String>) -> Result<Self, StorageError> {
        let client = reqwest::blocking::Client::builder()
            .build()
            .map_err(|e| StorageError::UploadFailed {
                bucket: String::new(),
                key: String::new(),
                reason: format!("failed to create HTTP client: {}", e),
            })?;
        let mut endpoint = endpoint.into();
        while endpoint.ends_with('/') {
            endpoint.pop();
        }
        Ok(Self { client, endpoint })
    }
}

impl ObjectStore for HttpObjectStore {
    fn upload(&self, local_path: &Path, bucket: &str, key: &str) -> Result<(), StorageError> {
        let body = std::fs::read(local_path).map_err(|source| StorageError::ReadFailed {
            path: local_path.to_path_buf(),
            source,
        })?;

        let url = format!("{}/{}/{}", self.endpoint, bucket, key);
        let response = self
            .client
            .put(&url)
            .body(body)
            .send()
            .map_err(|e| StorageError::UploadFailed {
                bucket: bucket.to_string(),
                key: key.to_string(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(StorageError::UploadFailed {
                bucket: bucket.to_string(),
                key: key.to_string(),
                reason: format!("HTTP {}", status),
            });
        }

        info!(bucket = bucket, key = key, "Mosaic uploaded");
        Ok(())
    }
}
