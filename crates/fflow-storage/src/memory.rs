//! In-process object store.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::{StorageError, StorageResult};
use crate::keys;
use crate::store::ObjectStore;

pub const MEMORY_BASE_URL: &str = "memory://objects";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

/// In-memory `ObjectStore`.
///
/// An optional size cap rejects larger uploads, which lets tests provoke
/// individual upload failures.
pub struct MemoryObjectStore {
    objects: RwLock<HashMap<String, StoredObject>>,
    base_url: String,
    max_object_size: Option<usize>,
}

impl Default for MemoryObjectStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self {
            objects: RwLock::new(HashMap::new()),
            base_url: MEMORY_BASE_URL.to_string(),
            max_object_size: None,
        }
    }

    pub fn with_max_object_size(mut self, bytes: usize) -> Self {
        self.max_object_size = Some(bytes);
        self
    }

    pub async fn get(&self, key: &str) -> Option<StoredObject> {
        self.objects.read().await.get(key).cloned()
    }

    pub async fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.objects.read().await.keys().cloned().collect();
        keys.sort();
        keys
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn put(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> StorageResult<()> {
        if let Some(max) = self.max_object_size {
            if bytes.len() > max {
                return Err(StorageError::upload_failed(format!(
                    "{} is {} bytes, limit is {}",
                    key,
                    bytes.len(),
                    max
                )));
            }
        }
        self.objects.write().await.insert(
            key.to_string(),
            StoredObject {
                bytes,
                content_type: content_type.to_string(),
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        self.objects
            .write()
            .await
            .remove(key)
            .map(|_| ())
            .ok_or_else(|| StorageError::not_found(key))
    }

    fn public_url(&self, key: &str) -> String {
        keys::public_url(&self.base_url, key)
    }

    fn key_from_url(&self, url: &str) -> StorageResult<String> {
        keys::key_from_url(&self.base_url, url)
    }
}
