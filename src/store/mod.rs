//! Storage backends.
//!
//! Two independent resources, each behind a trait so the service logic and
//! tests can run against in-memory implementations:
//!
//! - [`ObjectStore`] - a namespaced blob store with list-by-prefix
//!   (S3 in production, [`MemoryObjectStore`] in tests)
//! - [`MetadataStore`] - user and image records with simple
//!   equality/ordering queries ([`MemoryMetadataStore`] ships; a SQL-backed
//!   implementation plugs in behind the same trait)
//!
//! There is no transaction across the two stores. Callers write the object
//! first and the metadata row second; a metadata failure leaves an orphan
//! object, which is logged and tolerated.

pub mod metadata;
pub mod object;
pub mod s3;

pub use metadata::{ImageRecord, MemoryMetadataStore, MetadataStore, User};
pub use object::{MemoryObjectStore, ObjectStore, StoredObject};
pub use s3::{create_s3_client, S3ObjectStore};
