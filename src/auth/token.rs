//! Signed bearer tokens.
//!
//! Tokens are stateless and tamper-evident:
//!
//! ```text
//! token = hex(json(claims)) + "." + hex(HMAC-SHA256(secret, hex(json(claims))))
//! ```
//!
//! Claims carry the user id, the user's token_version at issue time, and an
//! absolute expiry instant. Validation fails closed: any malformed structure,
//! signature mismatch (constant-time comparison), or past expiry rejects the
//! token.
//!
//! Revocation is server-side despite the stateless token: after signature
//! validation the caller re-fetches the user's current token_version and
//! rejects any token carrying an older value. Bumping the counter therefore
//! invalidates every outstanding token for that user at once, with no
//! blacklist.

use std::time::Duration;

use chrono::Utc;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use uuid::Uuid;

/// HMAC-SHA256 type alias
type HmacSha256 = Hmac<Sha256>;

// =============================================================================
// Types
// =============================================================================

/// Claims embedded in a bearer token.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    /// User id
    pub sub: Uuid,

    /// User's token_version at issue time
    pub ver: i32,

    /// Absolute expiry (Unix epoch seconds)
    pub exp: i64,
}

/// Token validation error types.
///
/// Every variant surfaces to the client as the same generic authentication
/// failure; the distinction exists for server-side logging only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    /// Token structure could not be parsed
    Malformed,

    /// Signature does not match the payload
    InvalidSignature,

    /// Token expiry is in the past
    Expired,

    /// Token's version claim is older than the user's current token_version
    StaleVersion,

    /// The user in the token no longer exists
    UserNotFound,
}

impl std::fmt::Display for TokenError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TokenError::Malformed => write!(f, "malformed token"),
            TokenError::InvalidSignature => write!(f, "invalid token signature"),
            TokenError::Expired => write!(f, "token expired"),
            TokenError::StaleVersion => write!(f, "token version is stale"),
            TokenError::UserNotFound => write!(f, "token user not found"),
        }
    }
}

// =============================================================================
// Token Service
// =============================================================================

/// Issues and validates signed bearer tokens.
#[derive(Clone)]
pub struct TokenService {
    /// Secret key for HMAC computation
    secret_key: Vec<u8>,
}

impl TokenService {
    /// Create a new token service with the given secret key.
    ///
    /// The key should be at least 32 bytes for security.
    pub fn new(secret_key: impl AsRef<[u8]>) -> Self {
        Self {
            secret_key: secret_key.as_ref().to_vec(),
        }
    }

    /// Issue a token for the given user, valid for `ttl`.
    pub fn issue(&self, user_id: Uuid, token_version: i32, ttl: Duration) -> String {
        let exp = Utc::now().timestamp() + ttl.as_secs() as i64;
        self.issue_with_expiry(user_id, token_version, exp)
    }

    /// Issue a token with a specific expiry timestamp (Unix epoch seconds).
    ///
    /// Useful for tests that need already-expired tokens.
    pub fn issue_with_expiry(&self, user_id: Uuid, token_version: i32, exp: i64) -> String {
        let claims = Claims {
            sub: user_id,
            ver: token_version,
            exp,
        };
        // Claims is a flat struct of always-serializable fields
        let payload = hex::encode(serde_json::to_vec(&claims).expect("claims serialize"));
        let signature = self.compute_signature(&payload);
        format!("{}.{}", payload, signature)
    }

    /// Validate a token's structure, signature, and expiry.
    ///
    /// This covers every check that can be made without the metadata store.
    /// The caller must still compare `Claims::ver` against the user's
    /// current token_version (see `server::auth`).
    pub fn validate(&self, token: &str) -> Result<Claims, TokenError> {
        let (payload, signature) = token.split_once('.').ok_or(TokenError::Malformed)?;

        let provided_sig = hex::decode(signature).map_err(|_| TokenError::Malformed)?;
        let expected_sig =
            hex::decode(self.compute_signature(payload)).map_err(|_| TokenError::Malformed)?;

        // Constant-time comparison; checked before the payload is trusted
        if !bool::from(provided_sig.ct_eq(&expected_sig)) {
            return Err(TokenError::InvalidSignature);
        }

        let claims_bytes = hex::decode(payload).map_err(|_| TokenError::Malformed)?;
        let claims: Claims =
            serde_json::from_slice(&claims_bytes).map_err(|_| TokenError::Malformed)?;

        if claims.exp < Utc::now().timestamp() {
            return Err(TokenError::Expired);
        }

        Ok(claims)
    }

    /// Compute the HMAC-SHA256 signature over the hex payload.
    fn compute_signature(&self, payload: &str) -> String {
        let mut mac =
            HmacSha256::new_from_slice(&self.secret_key).expect("HMAC can take key of any size");
        mac.update(payload.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }
}

// =============================================================================
// Tests
// =============================================================================
