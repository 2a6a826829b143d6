//! End-user authentication against Firebase Auth.
//!
//! This crate provides:
//! - The `IdentityProvider` seam with an Identity Toolkit REST client
//! - An in-memory provider for tests
//! - `AuthSession`: current user, ID-token freshness, session-change channel

pub mod error;
pub mod identity;
pub mod memory;
pub mod session;
pub mod types;

pub use error::{AuthError, AuthResult};
pub use identity::{IdentityClient, IdentityConfig, IdentityProvider};
pub use memory::MemoryIdentityProvider;
pub use session::AuthSession;
pub use types::{FederatedCredential, OAuthToken, SignedIn, TokenGrant, User, GOOGLE_PROVIDER};
