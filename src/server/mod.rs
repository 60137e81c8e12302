//! HTTP server layer for imgvault.
//!
//! This module provides the HTTP API for account management, uploads, and
//! image retrieval.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         HTTP Layer                              │
//! │   rate limiter → router → bearer auth → handler                 │
//! │                                                                 │
//! │  ┌─────────────┐  ┌──────────────┐  ┌────────────────────────┐  │
//! │  │  handlers   │  │     auth     │  │        routes          │  │
//! │  │ (requests)  │  │ (bearer jwt- │  │   (router config)      │  │
//! │  │             │  │  like token) │  │                        │  │
//! │  └─────────────┘  └──────────────┘  └────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod auth;
pub mod handlers;
pub mod routes;

pub use auth::{bearer_auth_middleware, CurrentUser};
pub use handlers::{
    get_image_handler, health_handler, login_handler, logout_all_handler, refresh_handler,
    register_handler, transform_handler, upload_handler, AppState, ErrorResponse, HealthResponse,
    LoginForm, RegisterRequest, TokenResponse, UploadResponse, UserResponse,
};
pub use routes::{create_router, RouterConfig};
