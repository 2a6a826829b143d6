//! Generic CRUD and subscriptions over one named collection.

use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;
use tracing::{debug, info, warn};

use fflow_firestore::{DocumentStore, FirestoreError};
use fflow_models::{stamp, Collection, Document, Fields, Outcome, Query, CREATED_AT, UPDATED_AT};

use crate::subscription::Subscription;

/// Which timestamps a create writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateStamps {
    /// `createdAt` and `updatedAt`
    CreatedAndUpdated,
    /// `createdAt` only
    CreatedOnly,
}

/// CRUD over one collection. All reads are ordered newest first.
#[derive(Clone)]
pub struct CollectionService {
    store: Arc<dyn DocumentStore>,
    collection: String,
    entity: String,
    stamps: CreateStamps,
}

impl CollectionService {
    /// Service for one of the known collections.
    pub fn new(store: Arc<dyn DocumentStore>, collection: Collection) -> Self {
        Self::named(store, collection.as_str(), collection.entity_name())
    }

    /// Service for any collection; `entity` names it in error messages.
    pub fn named(
        store: Arc<dyn DocumentStore>,
        collection: impl Into<String>,
        entity: impl Into<String>,
    ) -> Self {
        Self {
            store,
            collection: collection.into(),
            entity: entity.into(),
            stamps: CreateStamps::CreatedAndUpdated,
        }
    }

    pub fn with_create_stamps(mut self, stamps: CreateStamps) -> Self {
        self.stamps = stamps;
        self
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Store a new document; returns its id.
    pub async fn create(&self, fields: Fields) -> Outcome<String> {
        let mut fields = fields;
        let now = Utc::now();
        stamp(&mut fields, CREATED_AT, now);
        if self.stamps == CreateStamps::CreatedAndUpdated {
            stamp(&mut fields, UPDATED_AT, now);
        }

        let result = self.store.add(&self.collection, fields).await;
        if let Ok(id) = &result {
            info!(collection = %self.collection, id = %id, "Created document");
        }
        self.finish("create", result)
    }

    /// Every document, newest first.
    pub async fn list_all(&self) -> Outcome<Vec<Document>> {
        self.list(Query::all()).await
    }

    /// Documents whose `field` equals `value`, newest first.
    pub async fn list_filtered(
        &self,
        field: &str,
        value: impl Into<Value>,
    ) -> Outcome<Vec<Document>> {
        self.list(Query::where_eq(field, value)).await
    }

    async fn list(&self, query: Query) -> Outcome<Vec<Document>> {
        let result = self.store.query(&self.collection, &query).await;
        if let Ok(docs) = &result {
            debug!(collection = %self.collection, count = docs.len(), "Listed documents");
        }
        self.finish("list", result)
    }

    pub async fn get_by_id(&self, id: &str) -> Outcome<Document> {
        match self.store.get(&self.collection, id).await {
            Ok(Some(doc)) => Outcome::Success(doc),
            Ok(None) => Outcome::failure(self.not_found()),
            Err(e) => self.finish("get", Err(e)),
        }
    }

    /// Merge `patch` into the document and refresh `updatedAt`. Fields not
    /// in the patch are left alone.
    pub async fn update(&self, id: &str, patch: Fields) -> Outcome<()> {
        let mut patch = patch;
        stamp(&mut patch, UPDATED_AT, Utc::now());

        match self.store.merge(&self.collection, id, patch).await {
            Err(e) if e.is_not_found() => Outcome::failure(self.not_found()),
            result => self.finish("update", result),
        }
    }

    /// Remove the document. Removing a missing document succeeds.
    pub async fn delete(&self, id: &str) -> Outcome<()> {
        let result = self.store.delete(&self.collection, id).await;
        if result.is_ok() {
            info!(collection = %self.collection, id = %id, "Deleted document");
        }
        self.finish("delete", result)
    }

    /// Call `callback` with the full, ordered collection on every change.
    pub fn subscribe_to_changes<F>(&self, callback: F) -> Subscription
    where
        F: FnMut(Vec<Document>) + Send + 'static,
    {
        self.subscribe(Query::all(), callback)
    }

    /// `subscribe_to_changes` restricted to documents whose `field` equals `value`.
    pub fn subscribe_filtered<F>(
        &self,
        field: &str,
        value: impl Into<Value>,
        callback: F,
    ) -> Subscription
    where
        F: FnMut(Vec<Document>) + Send + 'static,
    {
        self.subscribe(Query::where_eq(field, value), callback)
    }

    fn subscribe<F>(&self, query: Query, callback: F) -> Subscription
    where
        F: FnMut(Vec<Document>) + Send + 'static,
    {
        debug!(collection = %self.collection, "Subscribing to changes");
        let snapshots = self.store.watch(&self.collection, query);
        Subscription::forward(self.collection.clone(), snapshots, callback)
    }

    fn not_found(&self) -> String {
        format!("{} not found", self.entity)
    }

    fn finish<T>(&self, operation: &str, result: Result<T, FirestoreError>) -> Outcome<T> {
        if let Err(e) = &result {
            warn!(
                collection = %self.collection,
                operation,
                error = %e,
                "Document operation failed"
            );
        }
        Outcome::from(result)
    }
}
