//! # imgvault
//!
//! A multi-tenant image hosting service over S3-compatible object storage.
//!
//! Users register, authenticate with signed bearer tokens, upload images
//! into a per-user namespace, and retrieve them verbatim or after on-demand
//! pixel transformations (resize, crop, rotate, filters, format change).
//!
//! ## Features
//!
//! - **Bearer tokens with bulk revocation**: HMAC-SHA256 signed stateless
//!   tokens carrying a version counter; bumping the stored counter revokes
//!   every outstanding token for a user at once
//! - **Sliding-window rate limiting**: per-client admission control ahead of
//!   routing, atomic under concurrency
//! - **Sequential key allocation**: per-user object keys numbered from a
//!   live listing of the user's prefix
//! - **Declarative transforms**: deterministic resize/crop/rotate/filter
//!   pipeline with format selection at encode time
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`auth`] - password hashing and bearer token signing/validation
//! - [`store`] - object and metadata storage behind traits (S3 + in-memory)
//! - [`limit`] - sliding-window rate limiter and its middleware
//! - [`upload`] - key allocation and the upload write sequence
//! - [`transform`] - the image transform pipeline and encoders
//! - [`server`] - Axum-based HTTP server, routes and handlers
//! - [`config`] - CLI and configuration types

pub mod auth;
pub mod config;
pub mod error;
pub mod limit;
pub mod server;
pub mod store;
pub mod transform;
pub mod upload;

// Re-export commonly used types
pub use auth::{hash_password, verify_password, Claims, TokenError, TokenService};
pub use config::Config;
pub use error::{ApiError, StoreError, TransformError};
pub use limit::{client_key, rate_limit_middleware, Admission, RateLimiter};
pub use server::{create_router, AppState, RouterConfig};
pub use store::{
    create_s3_client, ImageRecord, MemoryMetadataStore, MemoryObjectStore, MetadataStore,
    ObjectStore, S3ObjectStore, StoredObject, User,
};
pub use transform::{
    apply_and_encode, CropSpec, FilterSpec, OutputFormat, ResizeSpec, TransformRequest,
};
pub use upload::{AllocatedKey, KeyAllocator, UploadOutcome, UploadService};
