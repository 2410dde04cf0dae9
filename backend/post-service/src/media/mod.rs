/// Media store adapter
///
/// Posts keep only a `MediaRef`; the bytes live in the external image host.
use crate::error::{AppError, Result};
use crate::models::MediaRef;
use async_trait::async_trait;

pub mod cloudinary;

pub use cloudinary::CloudinaryMediaStore;

/// Raw media received from a client
#[derive(Debug, Clone)]
pub struct MediaUpload {
    pub bytes: Vec<u8>,
    pub file_name: Option<String>,
    pub content_type: Option<String>,
}

#[async_trait]
pub trait MediaStore: Send + Sync {
    /// Store `upload` under `folder`. Fails with `AppError::UploadError`.
    async fn upload(&self, upload: MediaUpload, folder: &str) -> Result<MediaRef>;

    /// Remove a stored asset by its store id
    async fn destroy(&self, public_id: &str) -> Result<()>;
}

/// Used when no media store is configured: uploads fail, destroys succeed.
pub struct DisabledMediaStore;

#[async_trait]
impl MediaStore for DisabledMediaStore {
    async fn upload(&self, _upload: MediaUpload, _folder: &str) -> Result<MediaRef> {
        Err(AppError::UploadError(
            "media uploads are not configured".to_string(),
        ))
    }

    async fn destroy(&self, public_id: &str) -> Result<()> {
        tracing::debug!(%public_id, "media store disabled, skipping destroy");
        Ok(())
    }
}
