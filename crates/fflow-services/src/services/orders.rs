//! Customer orders.
//!
//! New orders always start as `pending`; status changes touch nothing but
//! `status` and `updatedAt`.

use std::sync::Arc;

use serde_json::Value;

use fflow_firestore::DocumentStore;
use fflow_models::{Collection, Document, Fields, OrderStatus, Outcome};

use super::collection::CollectionService;
use crate::subscription::Subscription;

pub const STATUS_FIELD: &str = "status";
pub const USER_ID_FIELD: &str = "userId";

#[derive(Clone)]
pub struct OrderService {
    orders: CollectionService,
}

impl OrderService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            orders: CollectionService::new(store, Collection::Orders),
        }
    }

    /// Place an order. Any caller-supplied `status` is replaced by `pending`.
    pub async fn add_order(&self, order: Fields) -> Outcome<String> {
        let mut order = order;
        order.insert(
            STATUS_FIELD.to_string(),
            Value::String(OrderStatus::Pending.as_str().to_string()),
        );
        self.orders.create(order).await
    }

    pub async fn get_user_orders(&self, user_id: &str) -> Outcome<Vec<Document>> {
        self.orders.list_filtered(USER_ID_FIELD, user_id).await
    }

    pub async fn update_order_status(
        &self,
        id: &str,
        status: impl Into<OrderStatus>,
    ) -> Outcome<()> {
        let mut patch = Fields::new();
        patch.insert(
            STATUS_FIELD.to_string(),
            Value::String(status.into().as_str().to_string()),
        );
        self.orders.update(id, patch).await
    }

    pub async fn get_order_by_id(&self, id: &str) -> Outcome<Document> {
        self.orders.get_by_id(id).await
    }

    pub async fn delete_order(&self, id: &str) -> Outcome<()> {
        self.orders.delete(id).await
    }

    pub fn on_orders_change<F>(&self, callback: F) -> Subscription
    where
        F: FnMut(Vec<Document>) + Send + 'static,
    {
        self.orders.subscribe_to_changes(callback)
    }

    /// Orders of one user, pushed on every change.
    pub fn on_user_orders_change<F>(&self, user_id: &str, callback: F) -> Subscription
    where
        F: FnMut(Vec<Document>) + Send + 'static,
    {
        self.orders.subscribe_filtered(USER_ID_FIELD, user_id, callback)
    }

    pub fn collection(&self) -> &CollectionService {
        &self.orders
    }
}
