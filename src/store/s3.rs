//! S3-backed store.
//!
//! Objects are addressed as `s3://{bucket}/{key}`. Each `store` is a single
//! `PutObject`, which S3 applies atomically.

use async_trait::async_trait;
use aws_sdk_s3::config::http::HttpResponse;
use aws_sdk_s3::error::SdkError;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use bytes::Bytes;
use tracing::debug;

use super::BlobStore;
use crate::error::StorageError;

/// Store backed by one S3 bucket.
#[derive(Clone)]
pub struct S3Store {
    client: Client,
    bucket: String,
}

impl S3Store {
    /// Create a store over `bucket`.
    pub fn new(client: Client, bucket: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
        }
    }

    /// Get the bucket name.
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    fn location(&self, key: &str) -> String {
        format!("s3://{}/{}", self.bucket, key)
    }
}

/// Map an SDK error onto a storage error.
///
/// `service_not_found` is the operation-specific "no such key" check, which
/// the caller evaluates on the typed service error.
fn classify<E>(
    err: SdkError<E, HttpResponse>,
    service_not_found: bool,
    location: String,
) -> StorageError {
    if service_not_found {
        return StorageError::NotFound(location);
    }

    // Also check for 404 status code in the raw response
    let status_is_404 = err
        .raw_response()
        .map(|r| r.status().as_u16() == 404)
        .unwrap_or(false);
    if status_is_404 {
        return StorageError::NotFound(location);
    }

    if matches!(
        err,
        SdkError::DispatchFailure(_) | SdkError::TimeoutError(_)
    ) {
        return StorageError::Connection(format!("{}: {}", location, err));
    }

    let err_str = err.to_string();
    if err_str.contains("NotFound") || err_str.contains("NoSuchKey") {
        return StorageError::NotFound(location);
    }

    StorageError::S3(format!("{}: {}", location, err_str))
}

#[async_trait]
impl BlobStore for S3Store {
    async fn exists(&self, key: &str) -> Result<bool, StorageError> {
        let result = self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await;

        match result {
            Ok(_) => Ok(true),
            Err(e) => {
                let not_found = e
                    .as_service_error()
                    .map(|se| se.is_not_found())
                    .unwrap_or(false);
                match classify(e, not_found, self.location(key)) {
                    StorageError::NotFound(_) => Ok(false),
                    other => Err(other),
                }
            }
        }
    }

    async fn load(&self, key: &str) -> Result<Bytes, StorageError> {
        let resp = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                let not_found = e
                    .as_service_error()
                    .map(|se| se.is_no_such_key())
                    .unwrap_or(false);
                classify(e, not_found, self.location(key))
            })?;

        let data = resp
            .body
            .collect()
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?
            .into_bytes();

        Ok(data)
    }

    async fn store(&self, key: &str, data: Bytes) -> Result<(), StorageError> {
        let len = data.len();
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(data))
            .send()
            .await
            .map_err(|e| classify(e, false, self.location(key)))?;

        debug!(bucket = %self.bucket, key = %key, bytes = len, "Stored object");
        Ok(())
    }

    fn describe(&self) -> String {
        format!("s3://{}", self.bucket)
    }
}

/// Create an S3 client with optional custom endpoint and region.
///
/// Use a custom endpoint for S3-compatible services like MinIO:
/// ```ignore
/// let client = create_s3_client(Some("http://localhost:9000"), "us-east-1").await;
/// ```
pub async fn create_s3_client(endpoint_url: Option<&str>, region: &str) -> Client {
    let region = aws_config::Region::new(region.to_string());
    let mut config_loader =
        aws_config::defaults(aws_config::BehaviorVersion::latest()).region(region);

    if let Some(endpoint) = endpoint_url {
        config_loader = config_loader.endpoint_url(endpoint);
    }

    let sdk_config = config_loader.load().await;

    // Custom endpoints are usually path-style only
    let s3_config = if endpoint_url.is_some() {
        aws_sdk_s3::config::Builder::from(&sdk_config)
            .force_path_style(true)
            .build()
    } else {
        aws_sdk_s3::config::Builder::from(&sdk_config).build()
    };

    Client::from_conf(s3_config)
}
