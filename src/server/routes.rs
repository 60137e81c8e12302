//! Router configuration for the image hosting API.
//!
//! # Route Structure
//!
//! ```text
//! /health                      - Health check (public)
//! /register                    - Create account (public)
//! /token                       - Credential login (public)
//! /login                       - Token refresh (protected)
//! /logout-all                  - Revoke all sessions (protected)
//! /uploadfile                  - Upload image (protected)
//! /images/{index}              - Fetch image (protected)
//! /images/{index}/transform    - Fetch transformed image (protected)
//! ```
//!
//! The rate limiter wraps the whole router, public routes included, so a
//! rejected client cannot reach the auth surface either.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use http::header::{AUTHORIZATION, CONTENT_TYPE};
use http::Method;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::limit::{rate_limit_middleware, RateLimiter};

use super::auth::bearer_auth_middleware;
use super::handlers::{
    get_image_handler, health_handler, login_handler, logout_all_handler, refresh_handler,
    register_handler, transform_handler, upload_handler, AppState,
};

// =============================================================================
// Router Configuration
// =============================================================================

/// Configuration for the HTTP router.
#[derive(Clone)]
pub struct RouterConfig {
    /// Allowed CORS origins (None = allow any origin)
    pub cors_origins: Option<Vec<String>>,

    /// Whether to enable request tracing
    pub enable_tracing: bool,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            cors_origins: None, // Allow any origin by default
            enable_tracing: true,
        }
    }
}

impl RouterConfig {
    /// Set specific allowed CORS origins.
    ///
    /// Pass an empty vec to disallow all cross-origin requests.
    pub fn with_cors_origins(mut self, origins: Vec<String>) -> Self {
        self.cors_origins = Some(origins);
        self
    }

    /// Enable or disable request tracing.
    pub fn with_tracing(mut self, enabled: bool) -> Self {
        self.enable_tracing = enabled;
        self
    }
}

// =============================================================================
// Router Builder
// =============================================================================

/// Create the main application router.
///
/// This function builds the complete Axum router with:
/// - Public routes (health, register, login)
/// - Protected routes behind the bearer token middleware
/// - The rate limiter wrapping every route
/// - CORS configuration
/// - Request tracing (optional)
pub fn create_router(state: AppState, limiter: Arc<RateLimiter>, config: RouterConfig) -> Router {
    let cors = build_cors_layer(&config);

    let protected_routes = Router::new()
        .route("/login", get(refresh_handler))
        .route("/logout-all", post(logout_all_handler))
        .route("/uploadfile", post(upload_handler))
        .route("/images/{index}", get(get_image_handler))
        .route("/images/{index}/transform", post(transform_handler))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            bearer_auth_middleware,
        ));

    let public_routes = Router::new()
        .route("/health", get(health_handler))
        .route("/register", post(register_handler))
        .route("/token", post(login_handler));

    let router = Router::new()
        .merge(protected_routes)
        .merge(public_routes)
        .with_state(state)
        // Outermost layers: every request, matched or not, is rate limited
        .layer(middleware::from_fn_with_state(limiter, rate_limit_middleware))
        .layer(cors);

    if config.enable_tracing {
        router.layer(TraceLayer::new_for_http())
    } else {
        router
    }
}

/// Build the CORS layer based on configuration.
fn build_cors_layer(config: &RouterConfig) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE])
        .max_age(Duration::from_secs(86400)); // 24 hours

    match &config.cors_origins {
        None => cors.allow_origin(Any),
        Some(origins) if origins.is_empty() => {
            // No origins allowed - this effectively disables CORS
            cors
        }
        Some(origins) => {
            let parsed_origins: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();
            cors.allow_origin(parsed_origins)
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
