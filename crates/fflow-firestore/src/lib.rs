//! Firestore REST API client.
//!
//! This crate provides:
//! - CRUD, structured queries and streaming listen over the REST surface
//! - Conversion between schema-less JSON fields and Firestore values
//! - Access tokens from a service account, a signed-in user or nothing
//! - The `DocumentStore` seam with an in-memory implementation for tests

pub mod client;
pub mod convert;
pub mod error;
pub mod listen;
pub mod memory;
pub mod metrics;
pub mod store;
pub mod tokens;
pub mod types;

pub use client::{FirestoreClient, FirestoreConfig};
pub use error::{FirestoreError, FirestoreResult};
pub use memory::MemoryStore;
pub use store::{DocumentStore, SnapshotStream};
pub use tokens::{AccessTokenSource, Anonymous, ServiceAccountTokens, StaticToken};
pub use types::{FromFirestoreValue, ToFirestoreValue, Value};
