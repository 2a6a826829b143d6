//! Object storage for catalog media.
//!
//! This crate provides:
//! - An S3-compatible bucket client
//! - The `ObjectStore` seam with an in-memory implementation
//! - Object key layout and public URL mapping

pub mod client;
pub mod error;
pub mod keys;
pub mod memory;
pub mod store;

pub use client::{BucketClient, BucketConfig};
pub use error::{StorageError, StorageResult};
pub use keys::{key_from_url, object_key, public_url};
pub use memory::{MemoryObjectStore, StoredObject};
pub use store::{ObjectStore, UploadFile, DEFAULT_CONTENT_TYPE};
