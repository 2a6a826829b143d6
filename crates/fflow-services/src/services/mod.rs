//! Service layer. Every operation reports through `Outcome`.

pub mod auth;
pub mod collection;
pub mod orders;
pub mod products;
pub mod reviews;
pub mod storage;

pub use auth::AuthService;
pub use collection::{CollectionService, CreateStamps};
pub use orders::OrderService;
pub use products::ProductService;
pub use reviews::ReviewService;
pub use storage::StorageService;
