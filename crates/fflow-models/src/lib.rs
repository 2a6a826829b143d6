//! Shared data models for the Fashion Flow catalog backend.
//!
//! This crate provides:
//! - Schema-less documents and equality queries
//! - The `Outcome` envelope returned by every service operation
//! - Order status values
//! - Remote collection and storage namespace names
//! - Formatting and validation helpers

pub mod collections;
pub mod document;
pub mod order;
pub mod outcome;
pub mod query;
pub mod utils;

// Re-export common types
pub use collections::{Collection, StorageNamespace};
pub use document::{
    sort_newest_first, stamp, Document, Fields, CREATED_AT, TIMESTAMP_FIELDS, UPDATED_AT,
};
pub use order::OrderStatus;
pub use outcome::Outcome;
pub use query::Query;
pub use utils::{
    format_date, format_field_date, format_price, generate_id, is_valid_email, DateInput, Locale,
};
