//! Access tokens for Firestore requests.
//!
//! Requests carry a bearer token when one is available. Where it comes
//! from depends on who is calling:
//! - a signed-in end user (ID token, provided by the auth crate),
//! - a service account (OAuth token via `gcp_auth`, cached here),
//! - nobody, for collections whose security rules allow public access.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::Utc;
use gcp_auth::{CustomServiceAccount, TokenProvider};
use tokio::sync::Mutex;
use tracing::debug;

use crate::error::{FirestoreError, FirestoreResult};

/// OAuth scope for Firestore access.
pub const FIRESTORE_SCOPE: &str = "https://www.googleapis.com/auth/datastore";

/// Tokens are treated as expired this long before their real expiry.
const REFRESH_MARGIN: Duration = Duration::from_secs(60);

/// Source of bearer tokens for Firestore requests.
#[async_trait]
pub trait AccessTokenSource: Send + Sync {
    /// Token to send, or `None` to send the request unauthenticated.
    async fn access_token(&self) -> FirestoreResult<Option<String>>;
}

/// No credentials; access is governed by security rules alone.
#[derive(Debug, Clone, Copy, Default)]
pub struct Anonymous;

#[async_trait]
impl AccessTokenSource for Anonymous {
    async fn access_token(&self) -> FirestoreResult<Option<String>> {
        Ok(None)
    }
}

/// A fixed token, e.g. `owner` for the local emulator.
#[derive(Debug, Clone)]
pub struct StaticToken(pub String);

#[async_trait]
impl AccessTokenSource for StaticToken {
    async fn access_token(&self) -> FirestoreResult<Option<String>> {
        Ok(Some(self.0.clone()))
    }
}

struct Cached {
    token: String,
    refresh_at: Instant,
}

/// Service-account OAuth tokens, cached until shortly before expiry.
///
/// The mutex is held across the refresh so concurrent callers wait for a
/// single token fetch instead of each issuing one.
pub struct ServiceAccountTokens {
    provider: Arc<dyn TokenProvider>,
    cached: Mutex<Option<Cached>>,
}

impl ServiceAccountTokens {
    pub fn new(provider: Arc<dyn TokenProvider>) -> Self {
        Self {
            provider,
            cached: Mutex::new(None),
        }
    }

    /// Load the service account named by `GOOGLE_APPLICATION_CREDENTIALS`.
    pub fn from_env() -> FirestoreResult<Self> {
        let account = CustomServiceAccount::from_env()
            .map_err(|e| FirestoreError::auth_error(format!("Failed to load service account: {}", e)))?
            .ok_or_else(|| {
                FirestoreError::auth_error(
                    "GOOGLE_APPLICATION_CREDENTIALS not set. \
                     Set it to the path of your service account JSON file.",
                )
            })?;
        Ok(Self::new(Arc::new(account)))
    }
}

#[async_trait]
impl AccessTokenSource for ServiceAccountTokens {
    async fn access_token(&self) -> FirestoreResult<Option<String>> {
        let mut cached = self.cached.lock().await;
        if let Some(c) = cached.as_ref() {
            if Instant::now() < c.refresh_at {
                return Ok(Some(c.token.clone()));
            }
        }

        let token = self
            .provider
            .token(&[FIRESTORE_SCOPE])
            .await
            .map_err(|e| FirestoreError::auth_error(format!("Failed to obtain auth token: {}", e)))?;

        let ttl = (token.expires_at() - Utc::now())
            .to_std()
            .unwrap_or(Duration::ZERO);
        let refresh_at = Instant::now() + ttl.saturating_sub(REFRESH_MARGIN);

        debug!(ttl_secs = ttl.as_secs(), "Refreshed service account token");
        *cached = Some(Cached {
            token: token.as_str().to_string(),
            refresh_at,
        });
        Ok(Some(token.as_str().to_string()))
    }
}
