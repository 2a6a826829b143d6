//! The document store seam.
//!
//! Services talk to `dyn DocumentStore`; `FirestoreClient` is the remote
//! implementation and `MemoryStore` the in-process one.

use async_trait::async_trait;
use futures_util::stream::BoxStream;

use fflow_models::{Document, Fields, Query};

use crate::client::FirestoreClient;
use crate::convert::{document_from_firestore, fields_to_firestore, structured_query};
use crate::error::{FirestoreError, FirestoreResult};
use crate::listen;

/// Successive full result sets of a watched query, newest first.
pub type SnapshotStream = BoxStream<'static, FirestoreResult<Vec<Document>>>;

/// Schema-less document storage with ordered equality queries.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Insert a document; the store assigns and returns the id.
    async fn add(&self, collection: &str, fields: Fields) -> FirestoreResult<String>;

    async fn get(&self, collection: &str, id: &str) -> FirestoreResult<Option<Document>>;

    /// Overwrite only the fields present in `patch`. Fails with
    /// `NotFound` if the document does not exist.
    async fn merge(&self, collection: &str, id: &str, patch: Fields) -> FirestoreResult<()>;

    /// Remove a document. Removing a missing document succeeds.
    async fn delete(&self, collection: &str, id: &str) -> FirestoreResult<()>;

    /// Documents matching `query`, ordered by `createdAt` descending.
    async fn query(&self, collection: &str, query: &Query) -> FirestoreResult<Vec<Document>>;

    /// Push a fresh result set for `query` on every change.
    fn watch(&self, collection: &str, query: Query) -> SnapshotStream;
}

#[async_trait]
impl DocumentStore for FirestoreClient {
    async fn add(&self, collection: &str, fields: Fields) -> FirestoreResult<String> {
        let doc = self
            .create_document(collection, fields_to_firestore(&fields))
            .await?;
        doc.id().map(str::to_string).ok_or_else(|| {
            FirestoreError::InvalidResponse("created document has no name".to_string())
        })
    }

    async fn get(&self, collection: &str, id: &str) -> FirestoreResult<Option<Document>> {
        match self.get_document(collection, id).await? {
            Some(doc) => document_from_firestore(&doc).map(Some),
            None => Ok(None),
        }
    }

    async fn merge(&self, collection: &str, id: &str, patch: Fields) -> FirestoreResult<()> {
        let mask: Vec<String> = patch.keys().cloned().collect();
        self.update_document(collection, id, fields_to_firestore(&patch), &mask)
            .await?;
        Ok(())
    }

    async fn delete(&self, collection: &str, id: &str) -> FirestoreResult<()> {
        self.delete_document(collection, id).await
    }

    async fn query(&self, collection: &str, query: &Query) -> FirestoreResult<Vec<Document>> {
        self.run_query(structured_query(collection, query))
            .await?
            .iter()
            .map(document_from_firestore)
            .collect()
    }

    fn watch(&self, collection: &str, query: Query) -> SnapshotStream {
        listen::watch(self.clone(), collection, query)
    }
}
