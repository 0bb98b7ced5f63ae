//! Blob store on the local filesystem.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::blob::BlobStore;
use crate::config::settings::UploadConfig;
use crate::error::{AppError, AppResult};

/// Stores each blob as `{uuid}{extension}` in one directory.
#[derive(Debug, Clone)]
pub struct LocalBlobStore {
    directory: PathBuf,
    url_prefix: String,
}

fn io_error(operation: &str, e: std::io::Error) -> AppError {
    AppError::Internal {
        source: anyhow::anyhow!("{}: {}", operation, e),
    }
}

impl LocalBlobStore {
    pub fn new(directory: impl Into<PathBuf>, url_prefix: impl Into<String>) -> Self {
        Self {
            directory: directory.into(),
            url_prefix: url_prefix.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn from_config(config: &UploadConfig) -> Self {
        Self::new(&config.directory, config.url_prefix.as_str())
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Resolve an id to a path, refusing anything that could leave the directory.
    fn path_for(&self, blob_id: &str) -> AppResult<PathBuf> {
        let is_plain_name = !blob_id.is_empty()
            && blob_id != "."
            && blob_id != ".."
            && !blob_id.contains(['/', '\\']);
        if !is_plain_name {
            return Err(AppError::BadRequest {
                message: format!("Invalid blob id '{}'", blob_id),
            });
        }
        Ok(self.directory.join(blob_id))
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn save(&self, bytes: &[u8], extension: &str) -> AppResult<String> {
        tokio::fs::create_dir_all(&self.directory)
            .await
            .map_err(|e| io_error("create upload directory", e))?;

        let blob_id = format!("{}{}", uuid::Uuid::new_v4(), extension.to_lowercase());
        let path = self.path_for(&blob_id)?;
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| io_error("write blob", e))?;

        tracing::debug!(blob_id = %blob_id, size = bytes.len(), "Blob stored");
        Ok(blob_id)
    }

    async fn delete(&self, blob_id: &str) -> AppResult<bool> {
        let path = self.path_for(blob_id)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(io_error("delete blob", e)),
        }
    }

    fn url_for(&self, blob_id: &str) -> String {
        format!("{}/{}", self.url_prefix, blob_id)
    }
}
