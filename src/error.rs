use thiserror::Error;

/// Errors from the object storage and metadata backends.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// Error from S3 or S3-compatible storage
    #[error("S3 error: {0}")]
    S3(String),

    /// Network or connection error
    #[error("Connection error: {0}")]
    Connection(String),

    /// Object or record not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Uniqueness constraint violated
    #[error("Conflict on {field}: {message}")]
    Conflict { field: &'static str, message: String },
}

/// Errors from the transform pipeline.
#[derive(Debug, Clone, Error)]
pub enum TransformError {
    /// Request failed validation before reaching the pipeline
    #[error("Invalid transform request: {0}")]
    InvalidRequest(String),

    /// Source bytes could not be decoded as an image
    #[error("Failed to decode image: {0}")]
    Decode(String),

    /// Result could not be encoded in the output format
    #[error("Failed to encode image: {0}")]
    Encode(String),

    /// Requested output format is not supported
    #[error("Unsupported output format: {0}")]
    UnsupportedFormat(String),
}

/// Top-level error taxonomy surfaced at the HTTP boundary.
///
/// Every component-level error is mapped into one of these variants before
/// leaving a handler. The mapping to status codes lives in
/// `server::handlers` so this type stays transport-agnostic.
#[derive(Debug, Clone, Error)]
pub enum ApiError {
    /// Any authentication failure. Deliberately carries no detail about
    /// which sub-check failed; the specific cause is logged server-side.
    #[error("Authentication failed.")]
    Auth,

    /// A uniqueness constraint was violated (duplicate email, duplicate
    /// per-user filename). Names the conflicting field.
    #[error("{field} already registered")]
    Conflict { field: &'static str },

    /// Index out of range, or the underlying object is missing.
    #[error("{0}")]
    NotFound(String),

    /// Client exceeded the request rate limit.
    #[error("Too many requests")]
    RateLimited,

    /// Storage transport failure. The message is safe to return to the
    /// caller; full detail is logged before constructing this variant.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Malformed request payload (bad transform spec, missing file, ...).
    #[error("{0}")]
    Validation(String),
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(what) => ApiError::NotFound(what),
            StoreError::Conflict { field, .. } => ApiError::Conflict { field },
            StoreError::S3(msg) | StoreError::Connection(msg) => {
                // Redact transport detail; full message is logged here only.
                tracing::error!("storage backend error: {}", msg);
                ApiError::Storage("object storage request failed".to_string())
            }
        }
    }
}

impl From<TransformError> for ApiError {
    fn from(err: TransformError) -> Self {
        match err {
            TransformError::InvalidRequest(msg) | TransformError::UnsupportedFormat(msg) => {
                ApiError::Validation(msg)
            }
            TransformError::Decode(msg) => {
                ApiError::Validation(format!("stored object is not a decodable image: {}", msg))
            }
            TransformError::Encode(msg) => {
                tracing::error!("image encode failed: {}", msg);
                ApiError::Storage("image encoding failed".to_string())
            }
        }
    }
}
