//! Fashion Flow client services.
//!
//! Thin service layer over Firestore, Firebase Auth and an object bucket:
//! - `AuthService`: email/password and federated sign-in, session changes
//! - `ProductService`, `OrderService`, `ReviewService`: CRUD and live
//!   subscriptions, newest first
//! - `StorageService`: media uploads addressed by public URL
//!
//! Every service operation reports through `Outcome`, which serializes as
//! `{"success": true, "data": ...}` or `{"success": false, "error": "..."}`.

pub mod backend;
pub mod config;
pub mod error;
pub mod services;
pub mod subscription;
pub mod telemetry;
pub mod tokens;

pub use backend::Backend;
pub use config::{BackendConfig, DocumentAuth};
pub use error::{BackendError, BackendResult};
pub use services::{
    AuthService, CollectionService, CreateStamps, OrderService, ProductService, ReviewService,
    StorageService,
};
pub use subscription::Subscription;
pub use telemetry::init_tracing;
pub use tokens::SessionTokens;

pub use fflow_auth::{FederatedCredential, OAuthToken, User};
pub use fflow_models::{Collection, Document, Fields, OrderStatus, Outcome, StorageNamespace};
pub use fflow_storage::UploadFile;
