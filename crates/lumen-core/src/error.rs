//! Error types for the Lumen thumbnail pipeline.
//!
//! Errors are organized by layer: request parsing, pipeline stages, object
//! storage and configuration. Every variant maps onto an HTTP status so the
//! service can answer with a structured `{"erro": ...}` payload.

use thiserror::Error;

/// Top-level error type for a single processing request.
#[derive(Error, Debug)]
pub enum ServiceError {
    /// Missing or invalid request fields, or an image string that is not a data URL
    #[error("Malformed request: {0}")]
    MalformedRequest(String),

    /// Pipeline processing errors
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// No stored photo under the requested path
    #[error("Not found: {0}")]
    NotFound(String),

    /// Object storage errors
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Anything unanticipated, such as a response that cannot be serialized
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ServiceError {
    /// HTTP status code reported to the caller for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            ServiceError::MalformedRequest(_) => 400,
            ServiceError::NotFound(_) => 404,
            ServiceError::Pipeline(e) => e.status_code(),
            ServiceError::Storage(_) => 502,
            ServiceError::Config(_) | ServiceError::Internal(_) => 500,
        }
    }
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read the config file from disk
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    /// Failed to parse TOML configuration
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Configuration values are invalid
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Pipeline processing errors, organized by stage.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Image bytes are empty, truncated or not a recognized container
    #[error("Decode error: {0}")]
    Decode(String),

    /// Requested target size has a zero or negative component
    #[error("Invalid dimensions: {height}x{width} (both must be >= 1 and <= {max})")]
    InvalidDimensions { height: i64, width: i64, max: u32 },

    /// A resample target with a zero component
    #[error("Invalid dimensions: {height}x{width} (both must be >= 1)")]
    ZeroDimension { height: u32, width: u32 },

    /// Output serialization failed
    #[error("Encode error ({format}): {message}")]
    Encode { format: String, message: String },

    /// Encoded input exceeds the byte limit
    #[error("File too large: {size_mb}MB > {max_mb}MB")]
    FileTooLarge { size_mb: u64, max_mb: u64 },

    /// Decoded image dimensions exceed the limit
    #[error("Image too large: {width}x{height} > {max_dim}")]
    ImageTooLarge {
        width: u32,
        height: u32,
        max_dim: u32,
    },

    /// Operation timed out
    #[error("Timeout in {stage} stage after {timeout_ms}ms")]
    Timeout { stage: String, timeout_ms: u64 },

    /// The blocking task running the pipeline panicked or was cancelled
    #[error("Worker failure: {0}")]
    Worker(String),
}

impl PipelineError {
    /// HTTP status code reported to the caller for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            PipelineError::Decode(_) => 422,
            PipelineError::InvalidDimensions { .. } | PipelineError::ZeroDimension { .. } => 400,
            PipelineError::FileTooLarge { .. } | PipelineError::ImageTooLarge { .. } => 413,
            PipelineError::Timeout { .. } => 504,
            PipelineError::Encode { .. } | PipelineError::Worker(_) => 500,
        }
    }
}

/// Errors reported by an object storage backend.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Backend selected but credentials or endpoint are missing
    #[error("Storage not configured: {0}")]
    NotConfigured(String),

    /// Upload was rejected or the request failed
    #[error("Upload of {bucket}/{path} failed: {message}")]
    Upload {
        bucket: String,
        path: String,
        message: String,
        status_code: Option<u16>,
    },

    /// Public or signed URL could not be produced
    #[error("URL for {bucket}/{path} unavailable: {message}")]
    Url {
        bucket: String,
        path: String,
        message: String,
    },

    /// Listing a prefix failed
    #[error("Listing {bucket}/{prefix} failed: {message}")]
    List {
        bucket: String,
        prefix: String,
        message: String,
    },

    /// Object removal failed
    #[error("Removal of {bucket}/{path} failed: {message}")]
    Remove {
        bucket: String,
        path: String,
        message: String,
    },
}

/// Convenience type alias for service results.
pub type Result<T> = std::result::Result<T, ServiceError>;

/// Convenience type alias for pipeline-specific results.
pub type PipelineResult<T> = std::result::Result<T, PipelineError>;

/// Convenience type alias for storage results.
pub type StorageResult<T> = std::result::Result<T, StorageError>;
