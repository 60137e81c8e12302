//! Metadata store: user and image records.
//!
//! The relational persistence layer is an external collaborator; the service
//! only needs equality lookups, a uniqueness check, and one ordered query.
//! [`MetadataStore`] captures exactly that surface. The in-memory
//! implementation below is authoritative for tests and single-instance
//! deployments; a SQL-backed implementation slots in behind the same trait.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::StoreError;

// =============================================================================
// Records
// =============================================================================

/// A registered user.
#[derive(Debug, Clone)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    /// Unique across all users.
    pub email: String,
    /// Argon2 hash; never serialized to clients.
    pub password_hash: String,
    /// Bumped by the revoke-all-sessions operation. Tokens carrying an older
    /// value are rejected, which is the sole revocation mechanism.
    pub token_version: i32,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Create a new user record with a fresh id and token_version 0.
    pub fn new(username: impl Into<String>, email: impl Into<String>, password_hash: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            username: username.into(),
            email: email.into(),
            password_hash,
            token_version: 0,
            created_at: Utc::now(),
        }
    }
}

/// Metadata row for one stored image.
///
/// `filename` is the stem of the object key (`{sequence}.{ext}`) and is the
/// source of truth once written; the sequence embedded in the object key is
/// derived, never authoritative.
#[derive(Debug, Clone)]
pub struct ImageRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    /// Unique per user (compound constraint on (user_id, filename)).
    pub filename: String,
    pub created_at: DateTime<Utc>,
}

impl ImageRecord {
    /// Create a new image record with a fresh id.
    pub fn new(user_id: Uuid, filename: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            filename: filename.into(),
            created_at: Utc::now(),
        }
    }
}

// =============================================================================
// MetadataStore Trait
// =============================================================================

/// Persistence surface for user and image records.
#[async_trait]
pub trait MetadataStore: Send + Sync {
    /// Insert a user. Fails with `StoreError::Conflict` on a duplicate email.
    async fn insert_user(&self, user: User) -> Result<User, StoreError>;

    /// Look up a user by username (login path).
    async fn user_by_username(&self, username: &str) -> Result<Option<User>, StoreError>;

    /// Look up a user by id (token validation path).
    async fn user_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError>;

    /// Increment the user's token_version, invalidating every previously
    /// issued token. Returns the new version.
    async fn bump_token_version(&self, id: Uuid) -> Result<i32, StoreError>;

    /// Insert an image record. Fails with `StoreError::Conflict` if the
    /// (user_id, filename) pair already exists.
    async fn insert_image(&self, image: ImageRecord) -> Result<ImageRecord, StoreError>;

    /// Resolve a zero-based index into the user's images ordered ascending
    /// by creation time, ties broken by record id for a stable order.
    ///
    /// Returns `None` when the index is out of range. This index is a
    /// metadata-store ordering concept, distinct from the numeric sequence
    /// embedded in object keys.
    async fn image_at_index(&self, user_id: Uuid, index: usize)
        -> Result<Option<ImageRecord>, StoreError>;

    /// Number of images recorded for the user.
    async fn image_count(&self, user_id: Uuid) -> Result<usize, StoreError>;
}

// =============================================================================
// In-Memory Implementation
// =============================================================================

#[derive(Default)]
struct MemoryInner {
    users: HashMap<Uuid, User>,
    images: Vec<ImageRecord>,
}

/// In-memory `MetadataStore` used by tests and single-instance deployments.
#[derive(Default)]
pub struct MemoryMetadataStore {
    inner: RwLock<MemoryInner>,
}

impl MemoryMetadataStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MetadataStore for MemoryMetadataStore {
    async fn insert_user(&self, user: User) -> Result<User, StoreError> {
        let mut inner = self.inner.write().await;

        if inner.users.values().any(|u| u.email == user.email) {
            return Err(StoreError::Conflict {
                field: "email",
                message: format!("email {} already registered", user.email),
            });
        }

        inner.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn user_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner.users.values().find(|u| u.username == username).cloned())
    }

    async fn user_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner.users.get(&id).cloned())
    }

    async fn bump_token_version(&self, id: Uuid) -> Result<i32, StoreError> {
        let mut inner = self.inner.write().await;
        let user = inner
            .users
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(format!("user {}", id)))?;
        user.token_version += 1;
        Ok(user.token_version)
    }

    async fn insert_image(&self, image: ImageRecord) -> Result<ImageRecord, StoreError> {
        let mut inner = self.inner.write().await;

        let duplicate = inner
            .images
            .iter()
            .any(|i| i.user_id == image.user_id && i.filename == image.filename);
        if duplicate {
            return Err(StoreError::Conflict {
                field: "filename",
                message: format!(
                    "filename {} already recorded for user {}",
                    image.filename, image.user_id
                ),
            });
        }

        inner.images.push(image.clone());
        Ok(image)
    }

    async fn image_at_index(
        &self,
        user_id: Uuid,
        index: usize,
    ) -> Result<Option<ImageRecord>, StoreError> {
        let inner = self.inner.read().await;

        let mut images: Vec<&ImageRecord> = inner
            .images
            .iter()
            .filter(|i| i.user_id == user_id)
            .collect();
        // Stable order: created_at ascending, record id as tiebreaker so
        // images created in the same instant still resolve deterministically.
        images.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));

        Ok(images.get(index).map(|i| (*i).clone()))
    }

    async fn image_count(&self, user_id: Uuid) -> Result<usize, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner.images.iter().filter(|i| i.user_id == user_id).count())
    }
}

// =============================================================================
// Tests
// =============================================================================
