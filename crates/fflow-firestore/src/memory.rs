//! In-process document store.
//!
//! Same contract as the remote store: server-assigned ids, merge with
//! must-exist, idempotent delete, ordered equality queries and change
//! notification. Used by tests and local runs without a project.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::stream::{self, StreamExt};
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::sync::RwLock;
use tracing::debug;

use fflow_models::{generate_id, sort_newest_first, Document, Fields, Query};

use crate::error::{FirestoreError, FirestoreResult};
use crate::store::{DocumentStore, SnapshotStream};

const CHANGE_CHANNEL_CAPACITY: usize = 256;

type Collections = HashMap<String, BTreeMap<String, Fields>>;

struct Inner {
    collections: RwLock<Collections>,
    /// Name of each collection as it changes.
    changes: broadcast::Sender<String>,
}

/// In-memory `DocumentStore`. Clones share state.
#[derive(Clone)]
pub struct MemoryStore {
    inner: Arc<Inner>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            inner: Arc::new(Inner {
                collections: RwLock::new(HashMap::new()),
                changes,
            }),
        }
    }

    /// Write a document under a chosen id, replacing any existing one.
    pub async fn put(&self, collection: &str, id: &str, fields: Fields) {
        self.inner
            .collections
            .write()
            .await
            .entry(collection.to_string())
            .or_default()
            .insert(id.to_string(), fields);
        self.notify(collection);
    }

    /// Number of documents in a collection.
    pub async fn len(&self, collection: &str) -> usize {
        self.inner
            .collections
            .read()
            .await
            .get(collection)
            .map_or(0, BTreeMap::len)
    }

    pub async fn is_empty(&self, collection: &str) -> bool {
        self.len(collection).await == 0
    }

    fn notify(&self, collection: &str) {
        // No receivers just means nobody is watching.
        let _ = self.inner.changes.send(collection.to_string());
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn add(&self, collection: &str, fields: Fields) -> FirestoreResult<String> {
        let id = generate_id();
        self.put(collection, &id, fields).await;
        debug!(collection, id = %id, "Stored document");
        Ok(id)
    }

    async fn get(&self, collection: &str, id: &str) -> FirestoreResult<Option<Document>> {
        Ok(self
            .inner
            .collections
            .read()
            .await
            .get(collection)
            .and_then(|docs| docs.get(id))
            .map(|fields| Document::new(id, fields.clone())))
    }

    async fn merge(&self, collection: &str, id: &str, patch: Fields) -> FirestoreResult<()> {
        {
            let mut collections = self.inner.collections.write().await;
            let fields = collections
                .get_mut(collection)
                .and_then(|docs| docs.get_mut(id))
                .ok_or_else(|| FirestoreError::not_found(format!("{}/{}", collection, id)))?;
            fields.extend(patch);
        }
        self.notify(collection);
        Ok(())
    }

    async fn delete(&self, collection: &str, id: &str) -> FirestoreResult<()> {
        let removed = self
            .inner
            .collections
            .write()
            .await
            .get_mut(collection)
            .and_then(|docs| docs.remove(id))
            .is_some();
        if removed {
            self.notify(collection);
        }
        Ok(())
    }

    async fn query(&self, collection: &str, query: &Query) -> FirestoreResult<Vec<Document>> {
        let collections = self.inner.collections.read().await;
        let mut docs: Vec<Document> = collections
            .get(collection)
            .into_iter()
            .flatten()
            .map(|(id, fields)| Document::new(id.clone(), fields.clone()))
            .filter(|doc| query.matches(doc))
            .collect();
        sort_newest_first(&mut docs);
        Ok(docs)
    }

    fn watch(&self, collection: &str, query: Query) -> SnapshotStream {
        let receiver = self.inner.changes.subscribe();
        let state = (self.clone(), receiver, collection.to_string(), query, true);

        stream::unfold(state, |(store, mut receiver, collection, query, first)| async move {
            if !first {
                loop {
                    match receiver.recv().await {
                        Ok(changed) if changed == collection => break,
                        Ok(_) => continue,
                        // Missed notifications still mean something changed.
                        Err(RecvError::Lagged(_)) => break,
                        Err(RecvError::Closed) => return None,
                    }
                }
            }
            let snapshot = store.query(&collection, &query).await;
            Some((snapshot, (store, receiver, collection, query, false)))
        })
        .boxed()
    }
}
