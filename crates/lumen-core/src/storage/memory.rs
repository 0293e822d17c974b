//! In-process object store.
//!
//! Backs `backend = "memory"` dry runs and the service tests. Clones share
//! the same objects, so a test can keep a handle while the service owns the
//! boxed store. Nothing is evicted: a store built with
//! [`MemoryStore::with_capacity`] rejects uploads once it is full, and the
//! default store is unbounded. Not meant for long-running deployments.

use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use super::{ObjectEntry, ObjectStore, StoredObject};
use crate::error::{StorageError, StorageResult};

/// Bytes and content type of a stored object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryObject {
    pub content_type: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Default)]
struct State {
    objects: Mutex<BTreeMap<(String, String), MemoryObject>>,
    upload_calls: AtomicUsize,
    remove_calls: AtomicUsize,
    fail_after: Option<usize>,
    capacity: Option<usize>,
}

/// Object store that keeps everything in a map.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<State>,
}

impl MemoryStore {
    /// A store whose uploads succeed `successes` times and then fail.
    pub fn failing_after(successes: usize) -> Self {
        Self {
            state: Arc::new(State {
                fail_after: Some(successes),
                ..State::default()
            }),
        }
    }

    /// A store that holds at most `max_objects` objects.
    pub fn with_capacity(max_objects: usize) -> Self {
        Self {
            state: Arc::new(State {
                capacity: Some(max_objects),
                ..State::default()
            }),
        }
    }

    /// Fetch a stored object.
    pub fn get(&self, bucket: &str, path: &str) -> Option<MemoryObject> {
        self.objects()
            .get(&(bucket.to_string(), path.to_string()))
            .cloned()
    }

    /// Number of objects currently stored.
    pub fn len(&self) -> usize {
        self.objects().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of upload attempts, including failed ones.
    pub fn upload_calls(&self) -> usize {
        self.state.upload_calls.load(Ordering::SeqCst)
    }

    /// Number of remove attempts.
    pub fn remove_calls(&self) -> usize {
        self.state.remove_calls.load(Ordering::SeqCst)
    }

    fn objects(&self) -> std::sync::MutexGuard<'_, BTreeMap<(String, String), MemoryObject>> {
        self.state
            .objects
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> StorageResult<StoredObject> {
        let attempt = self.state.upload_calls.fetch_add(1, Ordering::SeqCst);
        let upload_error = |message: &str| StorageError::Upload {
            bucket: bucket.to_string(),
            path: path.to_string(),
            message: message.to_string(),
            status_code: None,
        };

        if self.state.fail_after.is_some_and(|n| attempt >= n) {
            return Err(upload_error("simulated upload failure"));
        }

        let key = (bucket.to_string(), path.to_string());
        let mut objects = self.objects();
        if objects.contains_key(&key) {
            return Err(upload_error("object already exists"));
        }
        if let Some(capacity) = self.state.capacity {
            if objects.len() >= capacity {
                return Err(upload_error(&format!(
                    "memory store is full ({capacity} objects)"
                )));
            }
        }
        let size = bytes.len();
        objects.insert(
            key,
            MemoryObject {
                content_type: content_type.to_string(),
                bytes,
            },
        );

        Ok(StoredObject {
            bucket: bucket.to_string(),
            path: path.to_string(),
            content_type: content_type.to_string(),
            size,
        })
    }

    async fn public_url(&self, bucket: &str, path: &str) -> StorageResult<String> {
        Ok(format!("memory://{bucket}/{path}"))
    }

    async fn list(&self, bucket: &str, prefix: &str) -> StorageResult<Vec<ObjectEntry>> {
        let prefix = prefix.trim_matches('/');
        let mut files = Vec::new();
        let mut folders = BTreeSet::new();

        for ((object_bucket, path), object) in self.objects().iter() {
            if object_bucket != bucket {
                continue;
            }
            let rest = if prefix.is_empty() {
                path.as_str()
            } else {
                match path.strip_prefix(prefix).and_then(|r| r.strip_prefix('/')) {
                    Some(rest) => rest,
                    None => continue,
                }
            };
            match rest.split_once('/') {
                Some((folder, _)) => {
                    folders.insert(folder.to_string());
                }
                None => files.push(ObjectEntry::file(rest, Some(object.bytes.len() as u64))),
            }
        }

        let mut entries: Vec<ObjectEntry> =
            folders.into_iter().map(ObjectEntry::folder).collect();
        entries.extend(files);
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    async fn remove(&self, bucket: &str, path: &str) -> StorageResult<()> {
        self.state.remove_calls.fetch_add(1, Ordering::SeqCst);
        match self.objects().remove(&(bucket.to_string(), path.to_string())) {
            Some(_) => Ok(()),
            None => Err(StorageError::Remove {
                bucket: bucket.to_string(),
                path: path.to_string(),
                message: "no such object".to_string(),
            }),
        }
    }
}
