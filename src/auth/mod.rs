//! Authentication building blocks.
//!
//! - [`password`] - Argon2 password hashing and verification
//! - [`token`] - HMAC-SHA256 signed bearer tokens with a version claim
//!
//! The HTTP-facing bearer extraction (and the token-version re-check against
//! the metadata store) lives in `server::auth`.

pub mod password;
pub mod token;

pub use password::{hash_password, verify_password};
pub use token::{Claims, TokenError, TokenService};
