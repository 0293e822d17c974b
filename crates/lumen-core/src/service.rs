//! Request orchestration: pipeline first, then storage.
//!
//! A request either fully succeeds or reports a single error. Both artifacts
//! are produced before the first upload; if a later upload fails, objects
//! already written for the request are removed on a best-effort basis.
//!
//! The service also answers read-only queries over what it has stored: a
//! listing of every artifact and the URL of a single one.

use std::time::Instant;

use crate::api::{
    PhotoListResponse, PhotoLocationResponse, ProcessPhotoRequest, ProcessPhotoResponse,
};
use crate::config::Config;
use crate::error::{Result, ServiceError, StorageResult};
use crate::pipeline::ImageProcessor;
use crate::storage::{object_path, EntryKind, ObjectStore, StoreFactory};
use crate::types::{ProcessingRequest, ProcessingResult, StoredArtifact};

const PNG_CONTENT_TYPE: &str = "image/png";
const JPEG_CONTENT_TYPE: &str = "image/jpeg";

/// Folder levels walked below a prefix; stored paths use four.
const MAX_LIST_DEPTH: usize = 8;

/// The thumbnail service: an [`ImageProcessor`] plus an [`ObjectStore`].
pub struct ThumbnailService {
    config: Config,
    processor: ImageProcessor,
    store: Box<dyn ObjectStore>,
}

impl ThumbnailService {
    /// Create a service using the store selected in `config.storage`.
    pub fn new(config: Config) -> Result<Self> {
        let store = StoreFactory::create(&config.storage)?;
        Ok(Self::with_store(config, store))
    }

    /// Create a service with an explicit store.
    pub fn with_store(config: Config, store: Box<dyn ObjectStore>) -> Self {
        tracing::debug!(
            "Initializing thumbnail service (store: {}, bucket: {})",
            store.name(),
            config.storage.bucket
        );
        Self {
            processor: ImageProcessor::new(&config),
            config,
            store,
        }
    }

    /// Get a reference to the current configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn processor(&self) -> &ImageProcessor {
        &self.processor
    }

    /// Handle a raw JSON body end to end and build the response payload.
    pub async fn handle_json(&self, body: &[u8]) -> Result<ProcessPhotoResponse> {
        let request =
            ProcessPhotoRequest::from_json(body)?.into_processing_request(&self.processor)?;
        let result = self.process(request).await?;
        Ok(ProcessPhotoResponse::from(&result))
    }

    /// Process one request and persist its artifacts.
    pub async fn process(&self, request: ProcessingRequest) -> Result<ProcessingResult> {
        let start = Instant::now();
        let declared = request.media_type.clone();

        let image = self.processor.process(request).await?;
        if let Some(declared) = declared.as_deref() {
            if !declared.ends_with(&image.source_format) && image.source_format != "unknown" {
                tracing::debug!(
                    "Declared type {} differs from detected format {}",
                    declared,
                    image.source_format
                );
            }
        }

        let storage = &self.config.storage;
        let processed_path = object_path(&storage.processed_prefix, "png");
        let processed = self
            .persist(&processed_path, image.processed_png.clone(), PNG_CONTENT_TYPE)
            .await?;

        let original = match &image.original_jpeg {
            Some(jpeg) => {
                let original_path = object_path(&storage.original_prefix, "jpg");
                match self
                    .persist(&original_path, jpeg.clone(), JPEG_CONTENT_TYPE)
                    .await
                {
                    Ok(artifact) => Some(artifact),
                    Err(e) => {
                        self.cleanup(&processed.path).await;
                        return Err(e.into());
                    }
                }
            }
            None => None,
        };

        tracing::info!(
            "Processed {}x{} -> {}x{} in {:?}: {}",
            image.original_dims.0,
            image.original_dims.1,
            image.processed_dims.0,
            image.processed_dims.1,
            start.elapsed(),
            processed.path
        );

        Ok(ProcessingResult {
            image,
            processed,
            original,
        })
    }

    /// Every stored artifact under the processed and original prefixes.
    pub async fn list_photos(&self) -> Result<PhotoListResponse> {
        let storage = &self.config.storage;
        let mut fotos = self.walk(&storage.processed_prefix).await?;
        fotos.extend(self.walk(&storage.original_prefix).await?);
        fotos.sort();
        fotos.dedup();
        tracing::debug!("Listed {} stored photos", fotos.len());
        Ok(PhotoListResponse::new(fotos))
    }

    /// Resolve the URL of one stored artifact.
    ///
    /// Only paths under the configured prefixes are served, and the object
    /// must exist.
    pub async fn photo_location(&self, path: &str) -> Result<PhotoLocationResponse> {
        let path = path.trim_matches('/');
        if path.is_empty()
            || path
                .split('/')
                .any(|segment| segment.is_empty() || segment == "." || segment == "..")
        {
            return Err(ServiceError::MalformedRequest(format!(
                "invalid photo path: {path:?}"
            )));
        }

        let storage = &self.config.storage;
        if !is_under(path, &storage.processed_prefix) && !is_under(path, &storage.original_prefix)
        {
            return Err(ServiceError::NotFound(path.to_string()));
        }

        let (dir, name) = path.rsplit_once('/').unwrap_or(("", path));
        let exists = self
            .store
            .list(&storage.bucket, dir)
            .await?
            .iter()
            .any(|entry| entry.kind == EntryKind::File && entry.name == name);
        if !exists {
            return Err(ServiceError::NotFound(path.to_string()));
        }

        let url = self.store.public_url(&storage.bucket, path).await?;
        Ok(PhotoLocationResponse {
            arquivo: path.to_string(),
            url,
        })
    }

    /// Paths of all files below `prefix`, walking folders at most
    /// to [`MAX_LIST_DEPTH`] levels.
    async fn walk(&self, prefix: &str) -> StorageResult<Vec<String>> {
        let bucket = &self.config.storage.bucket;
        let mut files = Vec::new();
        let mut pending = vec![(prefix.trim_matches('/').to_string(), 0usize)];

        while let Some((dir, depth)) = pending.pop() {
            for entry in self.store.list(bucket, &dir).await? {
                // Backends may keep hidden placeholders in empty folders.
                if entry.name.starts_with('.') {
                    continue;
                }
                let path = if dir.is_empty() {
                    entry.name
                } else {
                    format!("{dir}/{}", entry.name)
                };
                match entry.kind {
                    EntryKind::File => files.push(path),
                    EntryKind::Folder if depth < MAX_LIST_DEPTH => pending.push((path, depth + 1)),
                    EntryKind::Folder => tracing::debug!("Not descending into {}", path),
                }
            }
        }
        Ok(files)
    }

    /// Upload one artifact and resolve its URL; removes it again if the URL
    /// cannot be produced.
    async fn persist(
        &self,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> StorageResult<StoredArtifact> {
        let bucket = &self.config.storage.bucket;
        let stored = self.store.upload(bucket, path, bytes, content_type).await?;
        tracing::trace!("  Stored {} ({} bytes)", stored.path, stored.size);

        match self.store.public_url(bucket, path).await {
            Ok(url) => Ok(StoredArtifact {
                path: stored.path,
                url,
            }),
            Err(e) => {
                self.cleanup(path).await;
                Err(e)
            }
        }
    }

    async fn cleanup(&self, path: &str) {
        let bucket = &self.config.storage.bucket;
        if let Err(e) = self.store.remove(bucket, path).await {
            tracing::warn!("Failed to remove orphaned object {}/{}: {}", bucket, path, e);
        }
    }
}

/// Whether `path` lies below `prefix`; an empty prefix covers the bucket.
fn is_under(path: &str, prefix: &str) -> bool {
    let prefix = prefix.trim_matches('/');
    prefix.is_empty()
        || path
            .strip_prefix(prefix)
            .is_some_and(|rest| rest.starts_with('/'))
}
