//! Lumen Core - grayscale thumbnail pipeline with object storage.
//!
//! Lumen takes a single encoded image, reduces it to a normalized grayscale
//! thumbnail of a caller-specified size and stores the result (and optionally
//! the original) in an object store.
//!
//! # Architecture
//!
//! ```text
//! bytes → Decode → Grayscale → Resample → Normalize → Quantize/PNG → Store
//!            └──────────────── JPEG (original) ──────────────────────┘
//! ```
//!
//! Every stage is a synchronous, pure function of its input; only the final
//! storage handoff is asynchronous.
//!
//! # Usage
//!
//! ```rust,ignore
//! use lumen_core::{Config, ThumbnailService};
//!
//! #[tokio::main]
//! async fn main() -> lumen_core::Result<()> {
//!     let service = ThumbnailService::new(Config::load()?)?;
//!     let body = br#"{"imagem": "data:image/png;base64,...", "tamanho": [64, 64]}"#;
//!     let response = service.handle_json(body).await?;
//!     println!("Stored at {}", response.arquivo_salvo_url);
//!     Ok(())
//! }
//! ```

// Module declarations
pub mod api;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod service;
pub mod storage;
pub mod types;

// Re-exports for convenient access
pub use api::{
    ErrorResponse, HealthResponse, PhotoListResponse, PhotoLocationResponse, ProcessPhotoRequest,
    ProcessPhotoResponse,
};
pub use config::Config;
pub use error::{
    ConfigError, PipelineError, PipelineResult, Result, ServiceError, StorageError, StorageResult,
};
pub use pipeline::{Deadline, ImageProcessor, TargetSize};
pub use service::ThumbnailService;
pub use storage::{EntryKind, MemoryStore, ObjectEntry, ObjectStore, StoreFactory};
pub use types::{ProcessedImage, ProcessingRequest, ProcessingResult, StoredArtifact};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_service_with_memory_store() {
        let service = ThumbnailService::with_store(Config::default(), Box::new(MemoryStore::default()));
        assert_eq!(service.config().storage.bucket, "fotos");
        assert_eq!(service.processor().default_target(), TargetSize { height: 64, width: 64 });
    }
}
