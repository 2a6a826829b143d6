//! Errors raised while assembling a backend.
//!
//! Service operations never return these; they report failures through
//! `Outcome`.

use thiserror::Error;

pub type BackendResult<T> = Result<T, BackendError>;

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Firestore error: {0}")]
    Firestore(#[from] fflow_firestore::FirestoreError),

    #[error("Auth error: {0}")]
    Auth(#[from] fflow_auth::AuthError),

    #[error("Storage error: {0}")]
    Storage(#[from] fflow_storage::StorageError),
}

impl BackendError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}
