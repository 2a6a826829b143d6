//! Shared backend handles.

use std::sync::Arc;

use tracing::info;

use fflow_auth::{AuthSession, IdentityClient, IdentityProvider, MemoryIdentityProvider};
use fflow_firestore::{
    AccessTokenSource, Anonymous, DocumentStore, FirestoreClient, MemoryStore,
    ServiceAccountTokens,
};
use fflow_storage::{BucketClient, MemoryObjectStore, ObjectStore};

use crate::config::{BackendConfig, DocumentAuth};
use crate::error::BackendResult;
use crate::services::{
    AuthService, CollectionService, OrderService, ProductService, ReviewService, StorageService,
};
use crate::tokens::SessionTokens;

/// Document store, auth session and object store shared by all services.
///
/// Cloning is cheap; every clone talks to the same backends and session.
#[derive(Clone)]
pub struct Backend {
    documents: Arc<dyn DocumentStore>,
    session: Arc<AuthSession>,
    objects: Arc<dyn ObjectStore>,
}

impl Backend {
    pub fn new(
        documents: Arc<dyn DocumentStore>,
        session: Arc<AuthSession>,
        objects: Arc<dyn ObjectStore>,
    ) -> Self {
        Self {
            documents,
            session,
            objects,
        }
    }

    /// Connect to Firestore, Firebase Auth and the media bucket.
    pub async fn connect(config: BackendConfig) -> BackendResult<Self> {
        let identity: Arc<dyn IdentityProvider> = Arc::new(IdentityClient::new(config.identity)?);
        let session = Arc::new(AuthSession::new(identity));

        let tokens: Arc<dyn AccessTokenSource> = match config.document_auth {
            DocumentAuth::Session => Arc::new(SessionTokens::new(Arc::clone(&session))),
            DocumentAuth::ServiceAccount => Arc::new(ServiceAccountTokens::from_env()?),
            DocumentAuth::Anonymous => Arc::new(Anonymous),
        };

        let project_id = config.firestore.project_id.clone();
        let documents = FirestoreClient::with_tokens(config.firestore, tokens)?;
        let objects = BucketClient::new(config.storage).await?;

        info!(
            project_id = %project_id,
            document_auth = %config.document_auth,
            "Backend connected"
        );

        Ok(Self::new(Arc::new(documents), session, Arc::new(objects)))
    }

    /// `connect` with configuration from the environment.
    pub async fn from_env() -> BackendResult<Self> {
        let config = BackendConfig::from_env()?;
        Self::connect(config).await
    }

    /// Backend held entirely in process memory.
    pub fn in_memory() -> Self {
        Self::new(
            Arc::new(MemoryStore::new()),
            Arc::new(AuthSession::new(Arc::new(MemoryIdentityProvider::new()))),
            Arc::new(MemoryObjectStore::new()),
        )
    }

    pub fn documents(&self) -> &Arc<dyn DocumentStore> {
        &self.documents
    }

    pub fn session(&self) -> &Arc<AuthSession> {
        &self.session
    }

    pub fn objects(&self) -> &Arc<dyn ObjectStore> {
        &self.objects
    }

    pub fn auth(&self) -> AuthService {
        AuthService::new(Arc::clone(&self.session))
    }

    pub fn products(&self) -> ProductService {
        ProductService::new(Arc::clone(&self.documents))
    }

    pub fn orders(&self) -> OrderService {
        OrderService::new(Arc::clone(&self.documents))
    }

    pub fn reviews(&self) -> ReviewService {
        ReviewService::new(Arc::clone(&self.documents))
    }

    pub fn storage(&self) -> StorageService {
        StorageService::new(Arc::clone(&self.objects))
    }

    /// Generic service over any other collection.
    pub fn collection(&self, name: &str, entity: &str) -> CollectionService {
        CollectionService::named(Arc::clone(&self.documents), name, entity)
    }
}
