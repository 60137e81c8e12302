//! Object store abstraction.
//!
//! The service treats object storage as a flat key-value blob store with
//! list-by-prefix. Keys are namespaced per user (`images/{user_id}/...`);
//! the store itself knows nothing about users or ordering.

use std::collections::BTreeMap;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::RwLock;

use crate::error::StoreError;

// =============================================================================
// Types
// =============================================================================

/// A stored blob plus its content-type tag.
#[derive(Debug, Clone)]
pub struct StoredObject {
    /// Raw object bytes
    pub bytes: Bytes,

    /// Content type recorded at upload time (e.g. "image/png")
    pub content_type: String,
}

// =============================================================================
// ObjectStore Trait
// =============================================================================

/// Trait for namespaced blob storage with list-by-prefix.
///
/// This abstraction lets the upload and read paths work against S3 in
/// production and an in-memory map in tests.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Write an object. Overwrites silently if the key already exists.
    async fn put(&self, key: &str, bytes: Bytes, content_type: &str) -> Result<(), StoreError>;

    /// Fetch an object and its content type.
    ///
    /// Returns `StoreError::NotFound` if the key does not exist.
    async fn get(&self, key: &str) -> Result<StoredObject, StoreError>;

    /// List all keys under the given prefix.
    ///
    /// Order is unspecified; callers must not rely on it.
    async fn list_keys(&self, prefix: &str) -> Result<Vec<String>, StoreError>;
}

// =============================================================================
// In-Memory Implementation
// =============================================================================

/// In-memory `ObjectStore` used by tests and local development.
#[derive(Default)]
pub struct MemoryObjectStore {
    objects: RwLock<BTreeMap<String, StoredObject>>,
}

impl MemoryObjectStore {
    /// Create an empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored objects.
    pub async fn len(&self) -> usize {
        self.objects.read().await.len()
    }

    /// Whether the store is empty.
    pub async fn is_empty(&self) -> bool {
        self.objects.read().await.is_empty()
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn put(&self, key: &str, bytes: Bytes, content_type: &str) -> Result<(), StoreError> {
        let mut objects = self.objects.write().await;
        objects.insert(
            key.to_string(),
            StoredObject {
                bytes,
                content_type: content_type.to_string(),
            },
        );
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<StoredObject, StoreError> {
        let objects = self.objects.read().await;
        objects
            .get(key)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(key.to_string()))
    }

    async fn list_keys(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        let objects = self.objects.read().await;
        Ok(objects
            .range(prefix.to_string()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, _)| k.clone())
            .collect())
    }
}

// =============================================================================
// Tests
// =============================================================================
