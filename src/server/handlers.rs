//! HTTP request handlers for the image hosting API.
//!
//! # Endpoints
//!
//! - `POST /register` - Create a user account (public)
//! - `POST /token` - Exchange credentials for a bearer token (public)
//! - `GET /login` - Refresh the bearer token (protected)
//! - `POST /logout-all` - Revoke every outstanding token (protected)
//! - `POST /uploadfile` - Upload an image (protected)
//! - `GET /images/{index}` - Fetch an image by index (protected)
//! - `POST /images/{index}/transform` - Fetch a transformed image (protected)
//! - `GET /health` - Health check (public)

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Multipart, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Form, Json,
};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::auth::password::{hash_password, verify_password};
use crate::auth::token::TokenService;
use crate::error::ApiError;
use crate::store::{MetadataStore, ObjectStore, StoredObject, User};
use crate::transform::{apply_and_encode, TransformRequest};
use crate::upload::{user_prefix, UploadService};

use super::auth::CurrentUser;

// =============================================================================
// Application State
// =============================================================================

/// Shared application state passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Bearer token issuing and validation
    pub tokens: TokenService,

    /// User and image records
    pub metadata: Arc<dyn MetadataStore>,

    /// Image object storage
    pub objects: Arc<dyn ObjectStore>,

    /// Upload orchestration (key allocation, object write, metadata insert)
    pub uploads: Arc<UploadService>,

    /// Lifetime of issued bearer tokens
    pub token_ttl: Duration,
}

impl AppState {
    /// Create the application state over the given collaborators.
    pub fn new(
        tokens: TokenService,
        metadata: Arc<dyn MetadataStore>,
        objects: Arc<dyn ObjectStore>,
        uploads: Arc<UploadService>,
        token_ttl: Duration,
    ) -> Self {
        Self {
            tokens,
            metadata,
            objects,
            uploads,
            token_ttl,
        }
    }
}

// =============================================================================
// Request / Response Types
// =============================================================================

/// Body of a registration request.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

/// Credentials posted to the token endpoint (form-encoded).
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

/// Public view of a user record. Never carries the password hash.
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            created_at: user.created_at,
        }
    }
}

/// A freshly issued bearer token.
#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
}

impl TokenResponse {
    fn bearer(access_token: String) -> Self {
        Self {
            access_token,
            token_type: "bearer".to_string(),
        }
    }
}

/// Response to a completed upload.
#[derive(Debug, Serialize)]
pub struct UploadResponse {
    /// Public retrieval URL of the stored object
    pub url: String,

    /// Recorded filename (`{sequence}.{ext}`)
    pub filename: String,
}

/// Response after revoking all sessions.
#[derive(Debug, Serialize)]
pub struct LogoutResponse {
    pub revoked: bool,
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Service status
    pub status: String,

    /// Service version
    pub version: String,
}

/// JSON error response returned for all error conditions.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error type identifier (e.g., "not_found", "invalid_request")
    pub error: String,

    /// Human-readable error message
    pub message: String,

    /// HTTP status code (included for convenience)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
}

impl ErrorResponse {
    /// Create a new error response with status code.
    pub fn with_status(
        error: impl Into<String>,
        message: impl Into<String>,
        status: StatusCode,
    ) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            status: Some(status.as_u16()),
        }
    }
}

// =============================================================================
// Error Mapping
// =============================================================================

/// Convert ApiError to an HTTP response.
///
/// This implementation logs errors appropriately based on their severity:
/// - 5xx errors are logged at ERROR level (server errors)
/// - 404 and 429 are logged at DEBUG level (common and expected)
/// - other 4xx errors are logged at WARN level
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_type) = match &self {
            ApiError::Auth => (StatusCode::UNAUTHORIZED, "authentication_failed"),
            ApiError::Conflict { .. } => (StatusCode::BAD_REQUEST, "conflict"),
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            ApiError::RateLimited => (StatusCode::TOO_MANY_REQUESTS, "rate_limited"),
            ApiError::Storage(_) => (StatusCode::INTERNAL_SERVER_ERROR, "storage_error"),
            ApiError::Validation(_) => (StatusCode::BAD_REQUEST, "invalid_request"),
        };
        let message = self.to_string();

        if status.is_server_error() {
            error!(
                error_type = error_type,
                status = status.as_u16(),
                "Server error: {}",
                message
            );
        } else if status == StatusCode::NOT_FOUND || status == StatusCode::TOO_MANY_REQUESTS {
            debug!(
                error_type = error_type,
                status = status.as_u16(),
                "Client error: {}",
                message
            );
        } else {
            warn!(
                error_type = error_type,
                status = status.as_u16(),
                "Client error: {}",
                message
            );
        }

        let error_response = ErrorResponse::with_status(error_type, message, status);

        if status == StatusCode::UNAUTHORIZED {
            // Challenge header per RFC 6750
            (
                status,
                [(header::WWW_AUTHENTICATE, "Bearer")],
                Json(error_response),
            )
                .into_response()
        } else {
            (status, Json(error_response)).into_response()
        }
    }
}

// =============================================================================
// Account Handlers
// =============================================================================

/// Handle registration requests.
///
/// # Endpoint
///
/// `POST /register`
///
/// # Response
///
/// - `200 OK`: the created user (without the password hash)
/// - `400 Bad Request`: empty fields, or the email is already registered
pub async fn register_handler(
    State(state): State<AppState>,
    Json(body): Json<RegisterRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    if body.username.is_empty() || body.email.is_empty() || body.password.is_empty() {
        return Err(ApiError::Validation(
            "username, email and password are required".to_string(),
        ));
    }

    let password_hash = hash_password(&body.password)?;
    let user = state
        .metadata
        .insert_user(User::new(body.username, body.email, password_hash))
        .await?;

    info!(user_id = %user.id, username = %user.username, "user registered");

    Ok(Json(user.into()))
}

/// Handle credential login.
///
/// # Endpoint
///
/// `POST /token` (form-encoded `username` and `password`)
///
/// # Response
///
/// - `200 OK`: a bearer token bound to the user's current token_version
/// - `401 Unauthorized`: unknown username or wrong password, indistinguishably
pub async fn login_handler(
    State(state): State<AppState>,
    Form(form): Form<LoginForm>,
) -> Result<Json<TokenResponse>, ApiError> {
    let user = state.metadata.user_by_username(&form.username).await?;

    // Run the password check even against a missing user? The hash is not
    // available, so an early return it is. The response is identical either
    // way; only timing differs.
    let user = match user {
        Some(user) => user,
        None => {
            debug!(username = %form.username, "login failed: unknown username");
            return Err(ApiError::Auth);
        }
    };

    if !verify_password(&form.password, &user.password_hash) {
        debug!(user_id = %user.id, "login failed: wrong password");
        return Err(ApiError::Auth);
    }

    let token = state
        .tokens
        .issue(user.id, user.token_version, state.token_ttl);

    info!(user_id = %user.id, "login succeeded");

    Ok(Json(TokenResponse::bearer(token)))
}

/// Handle token refresh for an already-authenticated user.
///
/// # Endpoint
///
/// `GET /login` (protected)
///
/// The middleware has already re-validated the token against the current
/// token_version, so the fresh token is issued under the same version.
pub async fn refresh_handler(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Json<TokenResponse> {
    let token = state
        .tokens
        .issue(user.id, user.token_version, state.token_ttl);
    Json(TokenResponse::bearer(token))
}

/// Revoke every outstanding token for the authenticated user.
///
/// # Endpoint
///
/// `POST /logout-all` (protected)
///
/// Bumps the user's token_version; every token issued before this call
/// (including the one authenticating it) is rejected from now on.
pub async fn logout_all_handler(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<LogoutResponse>, ApiError> {
    let version = state.metadata.bump_token_version(user.id).await?;
    info!(user_id = %user.id, token_version = version, "all sessions revoked");
    Ok(Json(LogoutResponse { revoked: true }))
}

// =============================================================================
// Image Handlers
// =============================================================================

/// Handle image uploads.
///
/// # Endpoint
///
/// `POST /uploadfile` (protected, multipart)
///
/// Reads the `file` part of the multipart body. The part must carry a
/// filename with an extension; the stored name is allocated server-side and
/// only the extension survives from the client's filename.
///
/// # Response
///
/// - `200 OK`: `{"url": ..., "filename": ...}`
/// - `400 Bad Request`: missing file part, empty file, or unusable filename
pub async fn upload_handler(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::Validation(format!("malformed multipart body: {}", e)))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let filename = field
            .file_name()
            .map(str::to_string)
            .ok_or_else(|| ApiError::Validation("file part carries no filename".to_string()))?;
        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::Validation(format!("failed to read file part: {}", e)))?;

        let outcome = state
            .uploads
            .upload(user.id, bytes, &content_type, &filename)
            .await?;

        return Ok(Json(UploadResponse {
            url: outcome.url,
            filename: outcome.record.filename,
        }));
    }

    Err(ApiError::Validation(
        "multipart body carries no file part".to_string(),
    ))
}

/// Handle image retrieval by index.
///
/// # Endpoint
///
/// `GET /images/{index}` (protected)
///
/// The index is zero-based over the user's images ordered by creation
/// time. It addresses only the caller's own images, so one user can never
/// reach another's objects through this route.
///
/// # Response
///
/// - `200 OK`: the stored bytes, verbatim, under the stored content type
/// - `404 Not Found`: negative or out-of-range index, or missing object
pub async fn get_image_handler(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(index): Path<i64>,
) -> Result<Response, ApiError> {
    let stored = resolve_image(&state, &user, index).await?;

    Ok(([(header::CONTENT_TYPE, stored.content_type)], stored.bytes).into_response())
}

/// Handle transformed image retrieval.
///
/// # Endpoint
///
/// `POST /images/{index}/transform` (protected, JSON body)
///
/// Resolves the image like `GET /images/{index}`, applies the requested
/// transforms, and returns the re-encoded result. The stored object is
/// never modified.
///
/// # Response
///
/// - `200 OK`: transformed bytes under the output format's content type
/// - `400 Bad Request`: invalid transform spec or undecodable source
/// - `404 Not Found`: negative or out-of-range index, or missing object
pub async fn transform_handler(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(index): Path<i64>,
    Json(request): Json<TransformRequest>,
) -> Result<Response, ApiError> {
    let stored = resolve_image(&state, &user, index).await?;

    // Pixel work is CPU-bound; keep it off the async workers
    let source = stored.bytes.clone();
    let (encoded, format) = tokio::task::spawn_blocking(move || {
        apply_and_encode(&source, &request)
    })
    .await
    .map_err(|e| {
        error!("transform task panicked: {}", e);
        ApiError::Storage("image transform failed".to_string())
    })??;

    Ok((
        [(header::CONTENT_TYPE, format.content_type())],
        Bytes::from(encoded),
    )
        .into_response())
}

/// Resolve an index to the stored object, enforcing ownership.
async fn resolve_image(
    state: &AppState,
    user: &User,
    index: i64,
) -> Result<StoredObject, ApiError> {
    if index < 0 {
        return Err(ApiError::NotFound("Image not found".to_string()));
    }

    let record = state
        .metadata
        .image_at_index(user.id, index as usize)
        .await?
        .ok_or_else(|| ApiError::NotFound("Image not found".to_string()))?;

    let key = format!("{}{}", user_prefix(user.id), record.filename);
    let stored = state.objects.get(&key).await.map_err(|e| {
        // A recorded image whose object is gone is a data integrity problem,
        // not a routine 404
        warn!(key = %key, error = %e, "metadata row present but object fetch failed");
        ApiError::from(e)
    })?;

    Ok(stored)
}

// =============================================================================
// Health Handler
// =============================================================================

/// Handle health check requests.
///
/// # Endpoint
///
/// `GET /health`
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// =============================================================================
// Tests
// =============================================================================
