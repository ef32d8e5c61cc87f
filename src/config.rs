//! Configuration management for the thumbnail server.
//!
//! Settings come from command-line arguments (clap) with `THUMBS_`-prefixed
//! environment variable fallbacks.
//!
//! # Example
//!
//! ```ignore
//! use clap::Parser;
//! use thumbs_server::config::Config;
//!
//! let config = Config::parse();
//! config.validate()?;
//! println!("Listening on {}", config.bind_address());
//! ```
//!
//! # Environment Variables
//!
//! - `THUMBS_HOST` - Server bind address (default: 0.0.0.0)
//! - `THUMBS_PORT` - Server port (default: 3000)
//! - `THUMBS_IMAGE_DIR` / `THUMBS_IMAGE_BUCKET` - Where source images live
//! - `THUMBS_THUMBS_DIR` / `THUMBS_THUMBS_BUCKET` - Where thumbnails are kept
//! - `THUMBS_S3_ENDPOINT` - Custom S3 endpoint for S3-compatible services
//! - `THUMBS_S3_REGION` - AWS region (default: us-east-1)
//! - `THUMBS_MAX_DIMENSION` - Largest accepted width or height (default: 2000)
//! - `THUMBS_DEFAULT_QUALITY` - Quality when the token has none (default: 85)
//! - `THUMBS_CACHE_CONTROL` - Cache-Control sent with thumbnails
//! - `THUMBS_COALESCE_GENERATION` - Share concurrent identical generations (default: true)
//! - `THUMBS_CORS_ORIGINS` - Allowed CORS origins, comma-separated

use std::path::PathBuf;

use clap::{ArgAction, Parser};
use http::HeaderValue;

use crate::server::DEFAULT_CACHE_CONTROL;
use crate::transform::{DEFAULT_MAX_DIMENSION, DEFAULT_QUALITY, MAX_QUALITY};

// =============================================================================
// Default Values
// =============================================================================

/// Default server host.
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Default server port.
pub const DEFAULT_PORT: u16 = 3000;

/// Default AWS region.
pub const DEFAULT_REGION: &str = "us-east-1";

// =============================================================================
// Store Location
// =============================================================================

/// Where a store keeps its objects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreLocation {
    Directory(PathBuf),
    Bucket(String),
}

// =============================================================================
// CLI Arguments
// =============================================================================

/// Thumbnail server.
///
/// Serves resized, padded or cropped thumbnails of images kept in a local
/// directory or an S3 bucket, and keeps every generated thumbnail so it is
/// only rendered once.
#[derive(Parser, Debug, Clone)]
#[command(name = "thumbs-server")]
#[command(author, version, about, long_about = None)]
pub struct Config {
    // =========================================================================
    // Server Configuration
    // =========================================================================
    /// Host address to bind the server to.
    #[arg(long, default_value = DEFAULT_HOST, env = "THUMBS_HOST")]
    pub host: String,

    /// Port to listen on.
    #[arg(short, long, default_value_t = DEFAULT_PORT, env = "THUMBS_PORT")]
    pub port: u16,

    // =========================================================================
    // Store Configuration
    // =========================================================================
    /// Directory containing source images.
    #[arg(long, env = "THUMBS_IMAGE_DIR")]
    pub image_dir: Option<PathBuf>,

    /// S3 bucket containing source images.
    #[arg(long, env = "THUMBS_IMAGE_BUCKET")]
    pub image_bucket: Option<String>,

    /// Directory to store generated thumbnails in.
    #[arg(long, env = "THUMBS_THUMBS_DIR")]
    pub thumbs_dir: Option<PathBuf>,

    /// S3 bucket to store generated thumbnails in.
    #[arg(long, env = "THUMBS_THUMBS_BUCKET")]
    pub thumbs_bucket: Option<String>,

    /// Custom S3 endpoint URL for S3-compatible services (MinIO, etc.).
    #[arg(long, env = "THUMBS_S3_ENDPOINT")]
    pub s3_endpoint: Option<String>,

    /// AWS region for S3.
    #[arg(long, default_value = DEFAULT_REGION, env = "THUMBS_S3_REGION")]
    pub s3_region: String,

    // =========================================================================
    // Thumbnail Configuration
    // =========================================================================
    /// Largest accepted thumbnail width or height.
    #[arg(long, default_value_t = DEFAULT_MAX_DIMENSION, env = "THUMBS_MAX_DIMENSION")]
    pub max_dimension: u32,

    /// Quality used when a request does not specify one (1-100).
    #[arg(long, default_value_t = DEFAULT_QUALITY, env = "THUMBS_DEFAULT_QUALITY")]
    pub default_quality: u8,

    /// Cache-Control header sent with thumbnails.
    #[arg(long, default_value = DEFAULT_CACHE_CONTROL, env = "THUMBS_CACHE_CONTROL")]
    pub cache_control: String,

    /// Let concurrent requests for the same missing thumbnail share one
    /// generation.
    #[arg(
        long,
        default_value_t = true,
        action = ArgAction::Set,
        env = "THUMBS_COALESCE_GENERATION"
    )]
    pub coalesce_generation: bool,

    // =========================================================================
    // CORS Configuration
    // =========================================================================
    /// Allowed CORS origins (comma-separated).
    ///
    /// If not specified, allows any origin.
    #[arg(long, env = "THUMBS_CORS_ORIGINS", value_delimiter = ',')]
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

fn pick_location(
    name: &str,
    dir: &Option<PathBuf>,
    bucket: &Option<String>,
) -> Result<StoreLocation, String> {
    match (dir, bucket) {
        (Some(dir), None) => Ok(StoreLocation::Directory(dir.clone())),
        (None, Some(bucket)) if bucket.trim().is_empty() => {
            Err(format!("{name} bucket name must not be empty"))
        }
        (None, Some(bucket)) => Ok(StoreLocation::Bucket(bucket.clone())),
        (Some(_), Some(_)) => Err(format!(
            "{name} store is configured twice; set either --{name}-dir or --{name}-bucket"
        )),
        (None, None) => Err(format!(
            "{name} store is required; set --{name}-dir or --{name}-bucket"
        )),
    }
}

impl Config {
    /// Validate the configuration and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        self.image_store()?;
        self.thumbs_store()?;

        if self.max_dimension == 0 {
            return Err("max_dimension must be greater than 0".to_string());
        }

        if self.default_quality > MAX_QUALITY {
            return Err(format!("default_quality must be at most {}", MAX_QUALITY));
        }

        if HeaderValue::from_str(&self.cache_control).is_err() {
            return Err("cache_control is not a valid header value".to_string());
        }

        Ok(())
    }

    /// Location of the source image store.
    pub fn image_store(&self) -> Result<StoreLocation, String> {
        pick_location("image", &self.image_dir, &self.image_bucket)
    }

    /// Location of the thumbnail store.
    pub fn thumbs_store(&self) -> Result<StoreLocation, String> {
        pick_location("thumbs", &self.thumbs_dir, &self.thumbs_bucket)
    }

    /// Whether either store lives in S3.
    pub fn uses_s3(&self) -> bool {
        self.image_bucket.is_some() || self.thumbs_bucket.is_some()
    }

    /// Get the server bind address as "host:port".
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

// =============================================================================
// Tests
// =============================================================================
