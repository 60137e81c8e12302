//! Upload path: sequential key allocation and the two-step write.
//!
//! - [`allocator`] - computes the next per-user sequence number from a live
//!   listing of the user's object prefix
//! - [`service`] - orchestrates object write then metadata insert (no
//!   cross-store transaction; a failed metadata insert leaves a logged
//!   orphan object)

pub mod allocator;
pub mod service;

pub use allocator::{user_prefix, AllocatedKey, KeyAllocator};
pub use service::{UploadOutcome, UploadService};
