//! Collection queries.
//!
//! Equality on a single field is the only predicate this layer issues.
//! Every query is ordered by `createdAt` descending.

use serde_json::Value;

use crate::document::{Document, CREATED_AT};

/// Single-field equality filter.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldEquals {
    pub field: String,
    pub value: Value,
}

/// A query over one collection, newest first.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Query {
    pub filter: Option<FieldEquals>,
}

impl Query {
    /// Every document in the collection.
    pub fn all() -> Self {
        Self { filter: None }
    }

    /// Documents whose `field` equals `value` exactly.
    pub fn where_eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            filter: Some(FieldEquals {
                field: field.into(),
                value: value.into(),
            }),
        }
    }

    /// Field the results are ordered by (descending).
    pub fn order_field(&self) -> &'static str {
        CREATED_AT
    }

    /// Local evaluation of the filter and the ordering precondition.
    ///
    /// Ordered queries only return documents that carry the order field.
    pub fn matches(&self, doc: &Document) -> bool {
        if doc.get(self.order_field()).is_none() {
            return false;
        }
        match &self.filter {
            Some(f) => doc.get(&f.field) == Some(&f.value),
            None => true,
        }
    }
}
