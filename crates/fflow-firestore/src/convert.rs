//! Mapping between schema-less catalog documents and the Firestore wire format.

use std::collections::HashMap;

use chrono::DateTime;

use fflow_models::{Document as CatalogDocument, Fields, Query, TIMESTAMP_FIELDS};

use crate::error::{FirestoreError, FirestoreResult};
use crate::types::{
    CollectionSelector, Document, FieldFilter, FieldReference, Filter, FromFirestoreValue, Order,
    StructuredQuery, ToFirestoreValue, Value,
};

/// Convert caller fields to Firestore values.
///
/// Top-level stamp fields holding RFC 3339 text become native timestamps so
/// that ordering by them is chronological on the server.
pub fn fields_to_firestore(fields: &Fields) -> HashMap<String, Value> {
    fields
        .iter()
        .map(|(name, value)| {
            let converted = match value.as_str() {
                Some(text)
                    if TIMESTAMP_FIELDS.contains(&name.as_str())
                        && DateTime::parse_from_rfc3339(text).is_ok() =>
                {
                    Value::TimestampValue(text.to_string())
                }
                _ => value.to_firestore_value(),
            };
            (name.clone(), converted)
        })
        .collect()
}

/// Convert a wire document into a catalog document.
pub fn document_from_firestore(doc: &Document) -> FirestoreResult<CatalogDocument> {
    let id = doc
        .id()
        .ok_or_else(|| FirestoreError::InvalidResponse("document without a name".to_string()))?;

    let fields: Fields = doc
        .fields
        .iter()
        .flatten()
        .filter_map(|(k, v)| serde_json::Value::from_firestore_value(v).map(|j| (k.clone(), j)))
        .collect();

    Ok(CatalogDocument::new(id, fields))
}

/// Field path as Firestore expects it: plain identifiers as-is, anything else backquoted.
pub fn field_path(name: &str) -> String {
    let mut chars = name.chars();
    let simple = matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
    if simple {
        name.to_string()
    } else {
        format!("`{}`", name.replace('\\', "\\\\").replace('`', "\\`"))
    }
}

/// Structured query for a catalog query: optional equality filter, newest first.
pub fn structured_query(collection: &str, query: &Query) -> StructuredQuery {
    let filter = query.filter.as_ref().map(|f| Filter {
        field_filter: Some(FieldFilter {
            field: FieldReference {
                field_path: field_path(&f.field),
            },
            op: "EQUAL".to_string(),
            value: f.value.to_firestore_value(),
        }),
    });

    StructuredQuery {
        from: vec![CollectionSelector {
            collection_id: collection.to_string(),
            all_descendants: None,
        }],
        r#where: filter,
        order_by: Some(vec![Order {
            field: FieldReference {
                field_path: query.order_field().to_string(),
            },
            direction: "DESCENDING".to_string(),
        }]),
        limit: None,
    }
}
