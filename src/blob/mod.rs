//! Image blob persistence.
//!
//! Blobs are opaque ids handed out by a `BlobStore`; posts keep only the id.

mod local;
mod upload;

use async_trait::async_trait;

pub use local::LocalBlobStore;
pub use upload::{ImageUpload, UploadPolicy, UploadedFile};

use crate::error::AppResult;

/// Storage for uploaded image bytes.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Persist bytes and return a fresh opaque id ending in `extension`.
    async fn save(&self, bytes: &[u8], extension: &str) -> AppResult<String>;

    /// Remove a blob. Returns false when it did not exist.
    async fn delete(&self, blob_id: &str) -> AppResult<bool>;

    /// Public URL under which the blob is served.
    fn url_for(&self, blob_id: &str) -> String;
}
