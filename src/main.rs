//! Thumbnail server binary.
//!
//! This binary starts the HTTP server and configures all components.

use clap::Parser;
use http::HeaderValue;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use thumbs_server::{
    config::{Config, StoreLocation},
    server::{create_router, RouterConfig},
    store::{create_s3_client, BlobStore, FsStore, S3Store, SharedStore},
    thumbnail::ThumbnailService,
    transform::DescriptorParser,
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

async fn run_serve(config: Config) -> ExitCode {
    let s3_client = if config.uses_s3() {
        Some(create_s3_client(config.s3_endpoint.as_deref(), &config.s3_region).await)
    } else {
        None
    };

    let (images, thumbs) = match (
        build_store(config.image_store(), s3_client.as_ref()),
        build_store(config.thumbs_store(), s3_client.as_ref()),
    ) {
        (Ok(images), Ok(thumbs)) => (images, thumbs),
        (Err(e), _) | (_, Err(e)) => {
            error!("Configuration error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    info!("Configuration:");
    info!("  Images: {}", images.describe());
    info!("  Thumbnails: {}", thumbs.describe());
    if let Some(ref endpoint) = config.s3_endpoint {
        info!("  S3 endpoint: {}", endpoint);
    }
    info!(
        "  Limits: max {}px, default quality {}",
        config.max_dimension, config.default_quality
    );
    info!(
        "  Coalescing: {}",
        if config.coalesce_generation { "on" } else { "off" }
    );

    let service = ThumbnailService::new(images, thumbs)
        .with_parser(DescriptorParser::new(
            config.max_dimension,
            config.default_quality,
        ))
        .with_coalescing(config.coalesce_generation);

    let router_config = match build_router_config(&config) {
        Ok(router_config) => router_config,
        Err(e) => {
            error!("Configuration error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let router = create_router(service, router_config);

    let addr = config.bind_address();
    info!("Server listening on: http://{}", addr);
    info!("  Try: curl -o thumb.jpg http://{}/m200x200/<image path>", addr);

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind to {}: {}", addr, e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = axum::serve(listener, router).await {
        error!("Server error: {}", e);
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

/// Build a store for a validated location.
fn build_store(
    location: Result<StoreLocation, String>,
    s3_client: Option<&aws_sdk_s3::Client>,
) -> Result<SharedStore, String> {
    match location? {
        StoreLocation::Directory(dir) => Ok(Arc::new(FsStore::new(dir))),
        StoreLocation::Bucket(bucket) => match s3_client {
            Some(client) => Ok(Arc::new(S3Store::new(client.clone(), bucket))),
            None => Err(format!("no S3 client for bucket {}", bucket)),
        },
    }
}

/// Initialize the tracing/logging subsystem.
fn init_logging(verbose: bool) {
    let env_filter = if verbose {
        "thumbs_server=debug,tower_http=debug"
    } else {
        "thumbs_server=info,tower_http=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Build RouterConfig from the application Config.
fn build_router_config(config: &Config) -> Result<RouterConfig, String> {
    let cache_control = config
        .cache_control
        .parse::<HeaderValue>()
        .map_err(|_| format!("invalid cache control value {:?}", config.cache_control))?;

    let mut router_config = RouterConfig::new()
        .with_cache_control(cache_control)
        .with_tracing(!config.no_tracing);

    if let Some(ref origins) = config.cors_origins {
        router_config = router_config.with_cors_origins(origins.clone());
    }

    Ok(router_config)
}
