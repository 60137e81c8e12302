//! Bearer token authentication for the HTTP surface.
//!
//! Protected routes sit behind [`bearer_auth_middleware`], which runs the
//! full validation chain for the `Authorization: Bearer <token>` header:
//!
//! 1. structural and signature checks ([`TokenService::validate`])
//! 2. expiry check (also inside `validate`)
//! 3. a live lookup of the token's user in the metadata store
//! 4. a token_version comparison against the user's current counter
//!
//! Step 4 is what makes revocation work with stateless tokens: bumping the
//! stored counter strands every token issued under the old value. The lookup
//! in step 3 always hits the store so a bump takes effect on the very next
//! request.
//!
//! Every failure collapses to the same generic 401; the specific cause is
//! logged server-side and never returned to the client.

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts},
    middleware::Next,
    response::Response,
};
use tracing::{debug, warn};

use crate::auth::token::TokenError;
use crate::error::ApiError;
use crate::store::User;

use super::handlers::AppState;

// =============================================================================
// Current User Extractor
// =============================================================================

/// The authenticated user, inserted into request extensions by
/// [`bearer_auth_middleware`].
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        // Only present when the middleware ran and accepted the token
        parts
            .extensions
            .get::<User>()
            .cloned()
            .map(CurrentUser)
            .ok_or(ApiError::Auth)
    }
}

// =============================================================================
// Axum Middleware
// =============================================================================

/// Extract the token from the `Authorization` header.
fn bearer_token(request: &Request) -> Option<&str> {
    request
        .headers()
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

/// Axum middleware guarding protected routes.
///
/// On success the resolved [`User`] is inserted into request extensions for
/// the [`CurrentUser`] extractor. On any failure the request is rejected
/// with the generic authentication error.
pub async fn bearer_auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = match bearer_token(&request) {
        Some(token) => token,
        None => {
            debug!("authentication failed: missing or malformed Authorization header");
            return Err(ApiError::Auth);
        }
    };

    let claims = match state.tokens.validate(token) {
        Ok(claims) => claims,
        Err(e) => {
            log_token_error(&e);
            return Err(ApiError::Auth);
        }
    };

    // Live lookup so a token_version bump takes effect immediately
    let user = match state.metadata.user_by_id(claims.sub).await? {
        Some(user) => user,
        None => {
            log_token_error(&TokenError::UserNotFound);
            return Err(ApiError::Auth);
        }
    };

    if claims.ver != user.token_version {
        log_token_error(&TokenError::StaleVersion);
        return Err(ApiError::Auth);
    }

    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

/// Log a token failure with its specific cause.
///
/// An invalid signature could indicate an attack, so log at warn level.
/// Expired and stale tokens are common and expected, log at debug.
fn log_token_error(error: &TokenError) {
    match error {
        TokenError::InvalidSignature => {
            warn!("authentication failed: {}", error);
        }
        _ => {
            debug!("authentication failed: {}", error);
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
