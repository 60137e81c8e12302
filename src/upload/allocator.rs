//! Per-user sequential object-key allocation.
//!
//! Keys have the shape `images/{user_id}/{sequence}.{ext}`. The next
//! sequence for a user is computed as max-plus-one over a live listing of
//! the user's prefix; keys whose stem is not purely numeric are ignored, so
//! unexpected entries in the namespace cannot break allocation.
//!
//! Two properties of this scheme are deliberate and preserved from the
//! original design (see DESIGN.md):
//!
//! - it is not safe under concurrent uploads by the same user: two callers
//!   can both observe the same maximum and allocate colliding keys. No lock
//!   is taken across the list+compute+write sequence.
//! - it is O(number of existing objects) per upload, since every allocation
//!   lists the full prefix.
//!
//! Gaps are never back-filled: for existing sequences {1, 3, 4} the next
//! allocation is 5, not 2.

use std::sync::Arc;

use uuid::Uuid;

use crate::error::StoreError;
use crate::store::ObjectStore;

// =============================================================================
// Types
// =============================================================================

/// Result of a key allocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllocatedKey {
    /// Fully qualified object key (`images/{user_id}/{sequence}.{ext}`)
    pub key: String,

    /// Key stem recorded in the metadata row (`{sequence}.{ext}`)
    pub filename: String,

    /// The allocated sequence number
    pub sequence: u64,
}

/// The object-key namespace for one user.
pub fn user_prefix(user_id: Uuid) -> String {
    format!("images/{}/", user_id)
}

/// Parse the numeric stem out of a key under `prefix`.
///
/// Matches digits immediately before the file extension; anything else
/// (nested keys, non-numeric stems, missing extension) returns None.
fn parse_sequence(key: &str, prefix: &str) -> Option<u64> {
    let rest = key.strip_prefix(prefix)?;
    let (stem, ext) = rest.split_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    if !stem.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    stem.parse().ok()
}

// =============================================================================
// Key Allocator
// =============================================================================

/// Allocates monotonically increasing per-user object keys.
pub struct KeyAllocator {
    store: Arc<dyn ObjectStore>,
}

impl KeyAllocator {
    /// Create an allocator over the given object store.
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self { store }
    }

    /// Compute the next object key for a user's upload.
    ///
    /// Lists the user's prefix, takes the maximum numeric stem (0 when the
    /// prefix is empty or holds no numeric keys), and returns max + 1
    /// formatted with the requested extension.
    pub async fn allocate_next(
        &self,
        user_id: Uuid,
        extension: &str,
    ) -> Result<AllocatedKey, StoreError> {
        let prefix = user_prefix(user_id);
        let keys = self.store.list_keys(&prefix).await?;

        let max_sequence = keys
            .iter()
            .filter_map(|key| parse_sequence(key, &prefix))
            .max()
            .unwrap_or(0);

        let sequence = max_sequence + 1;
        let filename = format!("{}.{}", sequence, extension);
        let key = format!("{}{}", prefix, filename);

        Ok(AllocatedKey {
            key,
            filename,
            sequence,
        })
    }
}

// =============================================================================
// Tests
// =============================================================================
