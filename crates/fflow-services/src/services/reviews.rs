//! Product reviews. Reviews are never edited, so only `createdAt` is stamped.

use std::sync::Arc;

use fflow_firestore::DocumentStore;
use fflow_models::{Collection, Document, Fields, Outcome};

use super::collection::{CollectionService, CreateStamps};
use crate::subscription::Subscription;

pub const PRODUCT_ID_FIELD: &str = "productId";

#[derive(Clone)]
pub struct ReviewService {
    reviews: CollectionService,
}

impl ReviewService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            reviews: CollectionService::new(store, Collection::Reviews)
                .with_create_stamps(CreateStamps::CreatedOnly),
        }
    }

    pub async fn add_review(&self, review: Fields) -> Outcome<String> {
        self.reviews.create(review).await
    }

    pub async fn get_product_reviews(&self, product_id: &str) -> Outcome<Vec<Document>> {
        self.reviews.list_filtered(PRODUCT_ID_FIELD, product_id).await
    }

    pub async fn get_review_by_id(&self, id: &str) -> Outcome<Document> {
        self.reviews.get_by_id(id).await
    }

    pub async fn delete_review(&self, id: &str) -> Outcome<()> {
        self.reviews.delete(id).await
    }

    pub fn on_product_reviews_change<F>(&self, product_id: &str, callback: F) -> Subscription
    where
        F: FnMut(Vec<Document>) + Send + 'static,
    {
        self.reviews
            .subscribe_filtered(PRODUCT_ID_FIELD, product_id, callback)
    }

    pub fn collection(&self) -> &CollectionService {
        &self.reviews
    }
}
