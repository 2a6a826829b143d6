//! The object store seam.

use async_trait::async_trait;

use crate::error::StorageResult;

pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// A file handed in for upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFile {
    /// Original file name, kept in the object key.
    pub name: String,
    pub bytes: Vec<u8>,
    pub content_type: String,
}

impl UploadFile {
    pub fn new(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            bytes: bytes.into(),
            content_type: DEFAULT_CONTENT_TYPE.to_string(),
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = content_type.into();
        self
    }
}

/// Binary object storage with public URLs.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn put(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> StorageResult<()>;

    /// Remove an object. Fails with `NotFound` if nothing is stored under `key`.
    async fn delete(&self, key: &str) -> StorageResult<()>;

    /// Publicly fetchable URL of `key`.
    fn public_url(&self, key: &str) -> String;

    /// Inverse of `public_url`, also accepting Firebase download URLs.
    fn key_from_url(&self, url: &str) -> StorageResult<String>;
}
