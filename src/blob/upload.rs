//! Uploaded file capability and image validation.

use std::path::Path;

use async_trait::async_trait;

use crate::config::settings::UploadConfig;
use crate::error::{AppError, AppResult};

/// An uploaded file as received from a client.
#[async_trait]
pub trait UploadedFile: Send + Sync {
    async fn read_all_bytes(&self) -> std::io::Result<Vec<u8>>;

    fn declared_content_type(&self) -> &str;

    fn declared_filename(&self) -> &str;
}

/// An upload already held in memory.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    filename: String,
    content_type: String,
    bytes: Vec<u8>,
}

impl ImageUpload {
    pub fn new(
        filename: impl Into<String>,
        content_type: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Self {
        Self {
            filename: filename.into(),
            content_type: content_type.into(),
            bytes,
        }
    }
}

#[async_trait]
impl UploadedFile for ImageUpload {
    async fn read_all_bytes(&self) -> std::io::Result<Vec<u8>> {
        Ok(self.bytes.clone())
    }

    fn declared_content_type(&self) -> &str {
        &self.content_type
    }

    fn declared_filename(&self) -> &str {
        &self.filename
    }
}

fn invalid(reason: impl Into<String>) -> AppError {
    AppError::Validation {
        field: "file".to_string(),
        reason: reason.into(),
    }
}

/// Acceptance rules for image uploads.
#[derive(Debug, Clone)]
pub struct UploadPolicy {
    max_file_size: usize,
    allowed_extensions: Vec<String>,
}

impl UploadPolicy {
    pub fn new(max_file_size: usize, allowed_extensions: Vec<String>) -> Self {
        Self {
            max_file_size,
            allowed_extensions: allowed_extensions
                .into_iter()
                .map(|ext| ext.to_lowercase())
                .collect(),
        }
    }

    pub fn from_config(config: &UploadConfig) -> Self {
        Self::new(config.max_file_size, config.allowed_extensions.clone())
    }

    /// Lowercase extension with its dot, if the filename has an allowed one.
    fn extension_of(&self, filename: &str) -> Option<String> {
        let ext = Path::new(filename).extension()?.to_str()?;
        let ext = format!(".{}", ext.to_lowercase());
        self.allowed_extensions.contains(&ext).then_some(ext)
    }

    /// Check the declared metadata, then read and size-check the bytes.
    ///
    /// Returns the bytes and the normalized extension.
    pub async fn accept(&self, file: &dyn UploadedFile) -> AppResult<(Vec<u8>, String)> {
        if !file.declared_content_type().starts_with("image/") {
            return Err(invalid("Invalid file type. Only image files are allowed."));
        }
        let extension = self
            .extension_of(file.declared_filename())
            .ok_or_else(|| invalid("Invalid file type. Only image files are allowed."))?;

        let bytes = file.read_all_bytes().await.map_err(|e| AppError::BadRequest {
            message: format!("Failed to read upload: {}", e),
        })?;
        if bytes.len() > self.max_file_size {
            return Err(invalid(format!(
                "File size too large. Maximum size is {} bytes.",
                self.max_file_size
            )));
        }

        Ok((bytes, extension))
    }
}
