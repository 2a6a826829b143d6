//! Schema-less documents.
//!
//! The catalog never enforces a schema: caller-supplied fields are
//! forwarded verbatim and read back as JSON. The only fields this layer
//! owns are the `createdAt` / `updatedAt` stamps.

use std::cmp::Ordering;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::utils::DateInput;

/// Field name of the creation stamp.
pub const CREATED_AT: &str = "createdAt";

/// Field name of the last-update stamp.
pub const UPDATED_AT: &str = "updatedAt";

/// Top-level fields stored as native remote timestamps.
pub const TIMESTAMP_FIELDS: [&str; 2] = [CREATED_AT, UPDATED_AT];

/// Document body: an ordered JSON object.
pub type Fields = serde_json::Map<String, Value>;

/// A stored document with its remote-assigned identifier.
///
/// Serializes flattened, i.e. `{"id": "...", ...fields}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    #[serde(flatten)]
    pub fields: Fields,
}

impl Document {
    pub fn new(id: impl Into<String>, fields: Fields) -> Self {
        Self {
            id: id.into(),
            fields,
        }
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    pub fn get_str(&self, field: &str) -> Option<&str> {
        self.fields.get(field).and_then(Value::as_str)
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.timestamp(CREATED_AT)
    }

    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.timestamp(UPDATED_AT)
    }

    fn timestamp(&self, field: &str) -> Option<DateTime<Utc>> {
        self.fields
            .get(field)
            .and_then(DateInput::from_json)
            .and_then(|input| input.to_datetime())
    }
}

/// Write a timestamp field in the wire form used for stamps (RFC 3339, UTC, microseconds).
pub fn stamp(fields: &mut Fields, field: &str, at: DateTime<Utc>) {
    fields.insert(
        field.to_string(),
        Value::String(at.to_rfc3339_opts(SecondsFormat::Micros, true)),
    );
}

/// Order documents by `createdAt`, newest first. Unstamped documents sort last.
pub fn sort_newest_first(docs: &mut [Document]) {
    docs.sort_by(|a, b| match (a.created_at(), b.created_at()) {
        (Some(x), Some(y)) => y.cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
}
