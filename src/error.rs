use thiserror::Error;

/// Errors that can occur when talking to a blob store
#[derive(Debug, Clone, Error)]
pub enum StorageError {
    /// Object not found
    #[error("Object not found: {0}")]
    NotFound(String),

    /// Error from S3 or S3-compatible storage
    #[error("S3 error: {0}")]
    S3(String),

    /// Network or connection error
    #[error("Connection error: {0}")]
    Connection(String),

    /// Local filesystem error
    #[error("Filesystem error: {0}")]
    Filesystem(String),

    /// Key cannot be mapped onto the store (e.g. path traversal)
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    /// Object cannot fit in a bounded store at all
    #[error("Object of {size} bytes exceeds store capacity of {capacity} bytes")]
    TooLarge { size: usize, capacity: usize },
}

impl From<std::io::Error> for StorageError {
    fn from(err: std::io::Error) -> Self {
        StorageError::Filesystem(err.to_string())
    }
}

/// Errors produced while parsing a transformation request or running the engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransformError {
    /// Request path does not follow the token grammar
    #[error("Invalid thumbnail request: {reason}")]
    InvalidRequest { reason: String },

    /// Mode token is not part of the mode vocabulary
    #[error("Unsupported thumbnail mode: {mode:?}")]
    InvalidMode { mode: String },

    /// Width or height is missing, malformed or zero
    #[error("Invalid dimensions: {reason}")]
    InvalidDimensions { reason: String },

    /// Width or height exceeds the configured maximum
    #[error("Dimensions too large: {width}x{height} (max: {max}x{max})")]
    DimensionsTooLarge { width: u32, height: u32, max: u32 },

    /// Source bytes are not in a format the registry can decode
    #[error("Unsupported source format: {reason}")]
    UnsupportedSourceFormat { reason: String },

    /// Source bytes were recognised but could not be decoded
    #[error("Failed to decode source image: {message}")]
    DecodeFailed { message: String },

    /// No encoder is registered for the requested output format
    #[error("Unsupported output format: {format:?}")]
    UnsupportedOutputFormat { format: String },

    /// Encoder failed to produce output
    #[error("Failed to encode thumbnail: {message}")]
    EncodeFailed { message: String },
}

/// Terminal outcome of a failed thumbnail request.
///
/// Each variant corresponds to one terminal state of the pipeline; none of
/// them is retried.
#[derive(Debug, Clone, Error)]
pub enum ThumbnailError {
    /// The request token could not be resolved into a descriptor
    #[error("Bad request: {0}")]
    BadRequest(TransformError),

    /// The source image does not exist in the image store
    #[error("Source image not found: {source_key}")]
    SourceNotFound { source_key: String },

    /// Reading from or writing to a store failed
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Decoding, compositing or encoding failed
    #[error("Generation failed: {0}")]
    Generation(TransformError),
}
