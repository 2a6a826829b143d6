//! Product catalog.

use std::sync::Arc;

use fflow_firestore::DocumentStore;
use fflow_models::{Collection, Document, Fields, Outcome};

use super::collection::CollectionService;
use crate::subscription::Subscription;

/// Field products are grouped by.
pub const CATEGORY_FIELD: &str = "category";

#[derive(Clone)]
pub struct ProductService {
    products: CollectionService,
}

impl ProductService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            products: CollectionService::new(store, Collection::Products),
        }
    }

    pub async fn add_product(&self, product: Fields) -> Outcome<String> {
        self.products.create(product).await
    }

    pub async fn get_all_products(&self) -> Outcome<Vec<Document>> {
        self.products.list_all().await
    }

    pub async fn get_product_by_id(&self, id: &str) -> Outcome<Document> {
        self.products.get_by_id(id).await
    }

    pub async fn update_product(&self, id: &str, patch: Fields) -> Outcome<()> {
        self.products.update(id, patch).await
    }

    pub async fn delete_product(&self, id: &str) -> Outcome<()> {
        self.products.delete(id).await
    }

    pub async fn get_products_by_category(&self, category: &str) -> Outcome<Vec<Document>> {
        self.products.list_filtered(CATEGORY_FIELD, category).await
    }

    pub fn on_products_change<F>(&self, callback: F) -> Subscription
    where
        F: FnMut(Vec<Document>) + Send + 'static,
    {
        self.products.subscribe_to_changes(callback)
    }

    /// The underlying collection service.
    pub fn collection(&self) -> &CollectionService {
        &self.products
    }
}
