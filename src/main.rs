//! imgvault - a multi-tenant image hosting service.
//!
//! This binary starts the HTTP server and configures all components.

use std::net::SocketAddr;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use imgvault::{
    auth::TokenService,
    config::Config,
    create_s3_client,
    limit::RateLimiter,
    server::{create_router, AppState, RouterConfig},
    store::{MemoryMetadataStore, MetadataStore, ObjectStore, S3ObjectStore},
    upload::UploadService,
};

#[tokio::main]
async fn main() -> ExitCode {
    let config = Config::parse();

    init_logging(config.verbose);

    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    run_serve(config).await
}

// =============================================================================
// Serve
// =============================================================================

async fn run_serve(config: Config) -> ExitCode {
    info!("imgvault v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration:");
    info!("  S3 bucket: {}", config.s3_bucket);
    if let Some(ref endpoint) = config.s3_endpoint {
        info!("  S3 endpoint: {}", endpoint);
    }
    info!("  S3 region: {}", config.s3_region);
    info!("  Token TTL: {}s", config.token_ttl_secs);
    info!(
        "  Rate limit: {} requests / {}s",
        config.rate_limit_max_calls, config.rate_limit_period_secs
    );

    // Create S3 client and test connectivity
    info!("Connecting to S3...");
    let s3_client = create_s3_client(config.s3_endpoint.as_deref(), &config.s3_region).await;

    if let Err(e) = test_s3_connection(&s3_client, &config.s3_bucket).await {
        error!("Failed to connect to S3: {}", e);
        error!("Please check:");
        error!("  - Your AWS credentials are configured correctly");
        error!("  - The bucket '{}' exists and is accessible", config.s3_bucket);
        error!("  - The S3 endpoint is correct (if using MinIO/custom S3)");
        return ExitCode::FAILURE;
    }
    info!("  Connected successfully");

    // Assemble the services
    let objects: Arc<dyn ObjectStore> =
        Arc::new(S3ObjectStore::new(s3_client, config.s3_bucket.clone()));
    let metadata: Arc<dyn MetadataStore> = Arc::new(MemoryMetadataStore::new());

    let uploads = Arc::new(UploadService::new(
        objects.clone(),
        metadata.clone(),
        config.s3_bucket.clone(),
        config.s3_region.clone(),
    ));

    let tokens = TokenService::new(config.token_secret_or_empty());
    let limiter = Arc::new(RateLimiter::new(
        config.rate_limit_max_calls,
        config.rate_limit_period(),
    ));

    let state = AppState::new(tokens, metadata, objects, uploads, config.token_ttl());

    // Build router
    let mut router_config = RouterConfig::default().with_tracing(!config.no_tracing);
    if let Some(ref origins) = config.cors_origins {
        router_config = router_config.with_cors_origins(origins.clone());
    }

    let router = create_router(state, limiter, router_config);

    // Bind and serve
    let addr = config.bind_address();
    info!("Server listening on: http://{}", addr);

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind to {}: {}", addr, e);
            return ExitCode::FAILURE;
        }
    };

    // ConnectInfo feeds the rate limiter's client key fallback
    if let Err(e) = axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    {
        error!("Server error: {}", e);
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

/// Test S3 connectivity with a one-key listing.
async fn test_s3_connection(client: &aws_sdk_s3::Client, bucket: &str) -> Result<(), String> {
    client
        .list_objects_v2()
        .bucket(bucket)
        .max_keys(1)
        .send()
        .await
        .map_err(|e| format!("{}", e))?;

    Ok(())
}

/// Initialize the tracing/logging subsystem.
fn init_logging(verbose: bool) {
    let env_filter = if verbose {
        "imgvault=debug,tower_http=debug"
    } else {
        "imgvault=info,tower_http=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
