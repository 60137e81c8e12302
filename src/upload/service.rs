//! Upload orchestration.
//!
//! An upload is a two-step saga with no cross-store transaction:
//!
//! 1. allocate the next key and write the object (committed first)
//! 2. insert the metadata row
//!
//! If step 2 fails, the object already written becomes an orphan. Orphans
//! are logged and tolerated, never treated as corruption; metadata rows are
//! only ever created after their object exists, so the invariant "every
//! recorded filename has an object" holds.

use std::sync::Arc;

use bytes::Bytes;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::ApiError;
use crate::store::{ImageRecord, MetadataStore, ObjectStore};

use super::allocator::KeyAllocator;

// =============================================================================
// Types
// =============================================================================

/// Result of a completed upload.
#[derive(Debug, Clone)]
pub struct UploadOutcome {
    /// Publicly constructible retrieval URL
    pub url: String,

    /// The metadata row that was recorded
    pub record: ImageRecord,
}

/// Extract the file extension from an upload's filename hint.
///
/// Takes everything after the last dot. Rejects hints without a usable
/// extension up front so the allocator never sees one.
fn extension_from_hint(filename_hint: &str) -> Result<&str, ApiError> {
    let ext = filename_hint.rsplit('.').next().unwrap_or("");
    if ext.is_empty() || ext == filename_hint || !ext.bytes().all(|b| b.is_ascii_alphanumeric()) {
        return Err(ApiError::Validation(format!(
            "filename must carry an extension, got {:?}",
            filename_hint
        )));
    }
    Ok(ext)
}

// =============================================================================
// Upload Service
// =============================================================================

/// Handles the allocate-write-record sequence for uploads.
pub struct UploadService {
    allocator: KeyAllocator,
    objects: Arc<dyn ObjectStore>,
    metadata: Arc<dyn MetadataStore>,
    bucket: String,
    region: String,
}

impl UploadService {
    /// Create an upload service over the given stores.
    ///
    /// `bucket` and `region` are only used to build the public retrieval URL.
    pub fn new(
        objects: Arc<dyn ObjectStore>,
        metadata: Arc<dyn MetadataStore>,
        bucket: impl Into<String>,
        region: impl Into<String>,
    ) -> Self {
        Self {
            allocator: KeyAllocator::new(objects.clone()),
            objects,
            metadata,
            bucket: bucket.into(),
            region: region.into(),
        }
    }

    /// Store an uploaded file for `user_id` and record its metadata.
    pub async fn upload(
        &self,
        user_id: Uuid,
        bytes: Bytes,
        content_type: &str,
        filename_hint: &str,
    ) -> Result<UploadOutcome, ApiError> {
        if bytes.is_empty() {
            return Err(ApiError::Validation("uploaded file is empty".to_string()));
        }
        let extension = extension_from_hint(filename_hint)?;

        let allocated = self.allocator.allocate_next(user_id, extension).await?;

        // Object write commits first; the metadata insert below is the
        // second, unguarded step of the saga.
        self.objects
            .put(&allocated.key, bytes, content_type)
            .await?;

        let record = match self
            .metadata
            .insert_image(ImageRecord::new(user_id, &allocated.filename))
            .await
        {
            Ok(record) => record,
            Err(e) => {
                // The object stays behind as a recoverable orphan.
                warn!(
                    key = %allocated.key,
                    error = %e,
                    "metadata insert failed after object write; object orphaned"
                );
                return Err(e.into());
            }
        };

        info!(user_id = %user_id, key = %allocated.key, "image uploaded");

        Ok(UploadOutcome {
            url: self.public_url(&allocated.key),
            record,
        })
    }

    /// Build the public retrieval URL for an object key.
    fn public_url(&self, key: &str) -> String {
        format!("https://{}.s3.{}.amazonaws.com/{}", self.bucket, self.region, key)
    }
}

// =============================================================================
// Tests
// =============================================================================
