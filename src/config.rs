//! Configuration management for imgvault.
//!
//! All options can be supplied as command-line arguments or environment
//! variables with the `IMGV_` prefix:
//!
//! - `IMGV_HOST` - Server bind address (default: 0.0.0.0)
//! - `IMGV_PORT` - Server port (default: 3000)
//! - `IMGV_S3_BUCKET` - S3 bucket name (required)
//! - `IMGV_S3_ENDPOINT` - Custom S3 endpoint for S3-compatible services
//! - `IMGV_S3_REGION` - AWS region (default: us-east-1)
//! - `IMGV_TOKEN_SECRET` - HMAC secret for bearer tokens (required)
//! - `IMGV_TOKEN_TTL_SECS` - Token lifetime in seconds (default: 1200)
//! - `IMGV_RATE_LIMIT_MAX_CALLS` - Requests allowed per window (default: 5)
//! - `IMGV_RATE_LIMIT_PERIOD_SECS` - Rate limit window in seconds (default: 60)
//!
//! There are no defaults for the bucket or the token secret; the server
//! refuses to start without them.

use std::time::Duration;

use clap::Parser;

// =============================================================================
// Default Values
// =============================================================================

/// Default server host.
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Default server port.
pub const DEFAULT_PORT: u16 = 3000;

/// Default AWS region.
pub const DEFAULT_REGION: &str = "us-east-1";

/// Default bearer token lifetime (20 minutes).
pub const DEFAULT_TOKEN_TTL_SECS: u64 = 1200;

/// Default number of requests a client may make per window.
pub const DEFAULT_RATE_LIMIT_MAX_CALLS: u32 = 5;

/// Default rate limit window in seconds.
pub const DEFAULT_RATE_LIMIT_PERIOD_SECS: u64 = 60;

// =============================================================================
// CLI Arguments
// =============================================================================

/// imgvault - a multi-tenant image hosting service.
///
/// Users register, upload images into S3 or S3-compatible storage, and
/// retrieve them verbatim or after on-demand pixel transformations.
#[derive(Parser, Debug, Clone)]
#[command(name = "imgvault")]
#[command(author, version, about, long_about = None)]
pub struct Config {
    // =========================================================================
    // Server Configuration
    // =========================================================================
    /// Host address to bind the server to.
    #[arg(long, default_value = DEFAULT_HOST, env = "IMGV_HOST")]
    pub host: String,

    /// Port to listen on.
    #[arg(short, long, default_value_t = DEFAULT_PORT, env = "IMGV_PORT")]
    pub port: u16,

    // =========================================================================
    // S3 Configuration
    // =========================================================================
    /// S3 bucket name holding the image objects.
    #[arg(long, env = "IMGV_S3_BUCKET")]
    pub s3_bucket: String,

    /// Custom S3 endpoint URL for S3-compatible services (MinIO, etc.).
    ///
    /// If not specified, uses the default AWS S3 endpoint.
    #[arg(long, env = "IMGV_S3_ENDPOINT")]
    pub s3_endpoint: Option<String>,

    /// AWS region for S3. Also used to build public object URLs.
    #[arg(long, default_value = DEFAULT_REGION, env = "IMGV_S3_REGION")]
    pub s3_region: String,

    // =========================================================================
    // Authentication Configuration
    // =========================================================================
    /// Secret key for HMAC-SHA256 bearer token signing.
    ///
    /// Required; the server fails to start without it.
    #[arg(long, env = "IMGV_TOKEN_SECRET")]
    pub token_secret: Option<String>,

    /// Bearer token lifetime in seconds.
    #[arg(long, default_value_t = DEFAULT_TOKEN_TTL_SECS, env = "IMGV_TOKEN_TTL_SECS")]
    pub token_ttl_secs: u64,

    // =========================================================================
    // Rate Limit Configuration
    // =========================================================================
    /// Maximum requests a single client may make within the rate window.
    #[arg(long, default_value_t = DEFAULT_RATE_LIMIT_MAX_CALLS, env = "IMGV_RATE_LIMIT_MAX_CALLS")]
    pub rate_limit_max_calls: u32,

    /// Length of the rate limit window in seconds.
    #[arg(long, default_value_t = DEFAULT_RATE_LIMIT_PERIOD_SECS, env = "IMGV_RATE_LIMIT_PERIOD_SECS")]
    pub rate_limit_period_secs: u64,

    // =========================================================================
    // CORS Configuration
    // =========================================================================
    /// Allowed CORS origins (comma-separated).
    ///
    /// If not specified, allows any origin.
    #[arg(long, env = "IMGV_CORS_ORIGINS", value_delimiter = ',')]
    pub cors_origins: Option<Vec<String>>,

    // =========================================================================
    // Logging Configuration
    // =========================================================================
    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,

    /// Disable request tracing.
    #[arg(long, default_value_t = false)]
    pub no_tracing: bool,
}

impl Config {
    /// Validate the configuration and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.s3_bucket.is_empty() {
            return Err("S3 bucket name is required. Set --s3-bucket or IMGV_S3_BUCKET".to_string());
        }

        match &self.token_secret {
            None => {
                return Err(
                    "Token secret is required. Set --token-secret or IMGV_TOKEN_SECRET".to_string(),
                )
            }
            Some(secret) if secret.is_empty() => {
                return Err("Token secret must not be empty".to_string())
            }
            Some(_) => {}
        }

        if self.token_ttl_secs == 0 {
            return Err("token_ttl_secs must be greater than 0".to_string());
        }

        if self.rate_limit_max_calls == 0 {
            return Err("rate_limit_max_calls must be greater than 0".to_string());
        }
        if self.rate_limit_period_secs == 0 {
            return Err("rate_limit_period_secs must be greater than 0".to_string());
        }

        Ok(())
    }

    /// Get the server bind address as "host:port".
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Get the token secret, or an empty string if unset (call validate() first).
    pub fn token_secret_or_empty(&self) -> &str {
        self.token_secret.as_deref().unwrap_or("")
    }

    /// Token lifetime as a Duration.
    pub fn token_ttl(&self) -> Duration {
        Duration::from_secs(self.token_ttl_secs)
    }

    /// Rate limit window as a Duration.
    pub fn rate_limit_period(&self) -> Duration {
        Duration::from_secs(self.rate_limit_period_secs)
    }
}

// =============================================================================
// Tests
// =============================================================================
