//! Core data types for the Lumen thumbnail pipeline.
//!
//! These are created fresh for every request and never outlive its response.

use crate::pipeline::{ColorLayout, TargetSize};

/// A validated request to produce one thumbnail.
#[derive(Debug, Clone)]
pub struct ProcessingRequest {
    /// Raw encoded image bytes
    pub image: Vec<u8>,

    /// MIME type declared by the caller, if any
    pub media_type: Option<String>,

    /// Output size
    pub target: TargetSize,

    /// Also persist a JPEG copy of the source
    pub save_original: bool,
}

/// Output of the pipeline before anything is persisted.
#[derive(Debug, Clone)]
pub struct ProcessedImage {
    /// Source `(height, width)`
    pub original_dims: (u32, u32),

    /// Thumbnail `(height, width)`
    pub processed_dims: (u32, u32),

    /// Smallest sample after normalization
    pub valor_min: f64,

    /// Largest sample after normalization
    pub valor_max: f64,

    /// Detected source container ("jpeg", "png", ...)
    pub source_format: String,

    /// Whether the source was decoded as grayscale or color
    pub layout: ColorLayout,

    /// 8-bit grayscale PNG
    pub processed_png: Vec<u8>,

    /// JPEG re-encode of the source, when requested
    pub original_jpeg: Option<Vec<u8>>,
}

/// Where an artifact was stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredArtifact {
    /// Path inside the bucket
    pub path: String,

    /// Public or signed URL
    pub url: String,
}

/// Final result of a request: pipeline output plus storage locations.
#[derive(Debug, Clone)]
pub struct ProcessingResult {
    pub image: ProcessedImage,

    /// Location of the thumbnail
    pub processed: StoredArtifact,

    /// Location of the original, when it was persisted
    pub original: Option<StoredArtifact>,
}
