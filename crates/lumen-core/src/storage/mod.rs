//! Object storage collaborator.
//!
//! The service needs four operations from a store: upload bytes, derive a
//! URL for an uploaded object, list a folder, and remove an object during
//! cleanup. Stores do not retry; failures surface to the caller as
//! [`StorageError`].

pub mod memory;
pub mod supabase;

pub use memory::{MemoryObject, MemoryStore};
pub use supabase::SupabaseStore;

use async_trait::async_trait;

use crate::config::{resolve_env_var, StorageBackend, StorageConfig};
use crate::error::{StorageError, StorageResult};

/// Metadata of an uploaded object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub bucket: String,
    pub path: String,
    pub content_type: String,
    pub size: usize,
}

/// Whether a listing entry is an object or a folder of further entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Folder,
}

/// One immediate child of a listed prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectEntry {
    /// Name relative to the listed prefix, without slashes
    pub name: String,
    pub kind: EntryKind,
    /// Object size in bytes, when the backend reports it
    pub size: Option<u64>,
}

impl ObjectEntry {
    pub fn file(name: impl Into<String>, size: Option<u64>) -> Self {
        Self {
            name: name.into(),
            kind: EntryKind::File,
            size,
        }
    }

    pub fn folder(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: EntryKind::Folder,
            size: None,
        }
    }
}

/// Trait that all storage backends implement.
///
/// Uses `async_trait` because the service holds the store as
/// `Box<dyn ObjectStore>`.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Backend name for logging (e.g., "supabase", "memory").
    fn name(&self) -> &str;

    /// Upload `bytes` to `bucket/path`. Existing objects are not overwritten.
    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> StorageResult<StoredObject>;

    /// URL under which `bucket/path` can be fetched (public or signed,
    /// depending on the backend configuration).
    async fn public_url(&self, bucket: &str, path: &str) -> StorageResult<String>;

    /// Immediate children of `prefix` (not recursive), sorted by name.
    /// An empty prefix lists the bucket root.
    async fn list(&self, bucket: &str, prefix: &str) -> StorageResult<Vec<ObjectEntry>>;

    /// Delete `bucket/path`.
    async fn remove(&self, bucket: &str, path: &str) -> StorageResult<()>;
}

/// Generate a collision-free object path:
/// `<prefix>/<YYYY>/<MM>/<DD>/<32 hex chars>.<extension>`.
///
/// The date bucket is UTC; the name carries 128 random bits, so concurrent
/// requests never need to coordinate.
pub fn object_path(prefix: &str, extension: &str) -> String {
    let date = chrono::Utc::now().format("%Y/%m/%d");
    let id: u128 = rand::random();
    let prefix = prefix.trim_matches('/');
    if prefix.is_empty() {
        format!("{date}/{id:032x}.{extension}")
    } else {
        format!("{prefix}/{date}/{id:032x}.{extension}")
    }
}

/// Factory that creates the configured storage backend.
pub struct StoreFactory;

impl StoreFactory {
    /// Create a store from config, resolving `${ENV_VAR}` credentials.
    pub fn create(config: &StorageConfig) -> StorageResult<Box<dyn ObjectStore>> {
        match config.backend {
            StorageBackend::Memory => {
                tracing::warn!(
                    "Using in-memory storage: artifacts live only in this process (max {} objects)",
                    config.memory_max_objects
                );
                Ok(Box::new(MemoryStore::with_capacity(config.memory_max_objects)))
            }
            StorageBackend::Supabase => {
                let url = resolve_env_var(&config.url).ok_or_else(|| {
                    StorageError::NotConfigured(
                        "Supabase URL not set. Set SUPABASE_URL env var.".to_string(),
                    )
                })?;
                let api_key = resolve_env_var(&config.api_key).ok_or_else(|| {
                    StorageError::NotConfigured(
                        "Supabase key not set. Set SUPABASE_KEY env var.".to_string(),
                    )
                })?;
                Ok(Box::new(SupabaseStore::new(&url, &api_key, config)?))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_object_path_layout() {
        let path = object_path("processadas", "png");
        let parts: Vec<&str> = path.split('/').collect();
        assert_eq!(parts.len(), 5);
        assert_eq!(parts[0], "processadas");
        assert_eq!(parts[1].len(), 4);
        assert_eq!(parts[2].len(), 2);
        assert_eq!(parts[3].len(), 2);
        let (name, ext) = parts[4].split_once('.').unwrap();
        assert_eq!(name.len(), 32);
        assert!(name.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(ext, "png");
    }

    #[test]
    fn test_object_path_trims_prefix_slashes() {
        assert!(object_path("/originais/", "jpg").starts_with("originais/"));
        assert!(!object_path("", "jpg").starts_with('/'));
    }

    #[test]
    fn test_object_paths_are_unique() {
        let paths: HashSet<String> = (0..1000).map(|_| object_path("p", "png")).collect();
        assert_eq!(paths.len(), 1000);
    }

    #[test]
    fn test_factory_memory_backend() {
        let config = StorageConfig {
            backend: StorageBackend::Memory,
            ..StorageConfig::default()
        };
        let store = StoreFactory::create(&config).unwrap();
        assert_eq!(store.name(), "memory");
    }

    #[tokio::test]
    async fn test_factory_memory_backend_is_capped() {
        let config = StorageConfig {
            backend: StorageBackend::Memory,
            memory_max_objects: 1,
            ..StorageConfig::default()
        };
        let store = StoreFactory::create(&config).unwrap();
        store.upload("fotos", "a.png", vec![1], "image/png").await.unwrap();
        assert!(store.upload("fotos", "b.png", vec![2], "image/png").await.is_err());
    }

    #[test]
    fn test_factory_supabase_requires_credentials() {
        let config = StorageConfig {
            backend: StorageBackend::Supabase,
            url: "${LUMEN_TEST_UNSET_URL_XYZ}".to_string(),
            ..StorageConfig::default()
        };
        assert!(matches!(
            StoreFactory::create(&config),
            Err(StorageError::NotConfigured(_))
        ));
    }

    #[test]
    fn test_factory_supabase_with_literal_credentials() {
        let config = StorageConfig {
            backend: StorageBackend::Supabase,
            url: "https://project.supabase.co".to_string(),
            api_key: "service-key".to_string(),
            ..StorageConfig::default()
        };
        let store = StoreFactory::create(&config).unwrap();
        assert_eq!(store.name(), "supabase");
    }
}
