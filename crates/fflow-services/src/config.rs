//! Backend configuration.

use std::fmt;
use std::str::FromStr;

use fflow_auth::IdentityConfig;
use fflow_firestore::FirestoreConfig;
use fflow_storage::BucketConfig;

use crate::error::{BackendError, BackendResult};

/// Credentials attached to document requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DocumentAuth {
    /// ID token of the signed-in user; anonymous while signed out.
    #[default]
    Session,
    /// OAuth token of the service account in `GOOGLE_APPLICATION_CREDENTIALS`.
    ServiceAccount,
    /// No credentials.
    Anonymous,
}

impl FromStr for DocumentAuth {
    type Err = BackendError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "session" | "user" => Ok(Self::Session),
            "service_account" | "service-account" => Ok(Self::ServiceAccount),
            "anonymous" | "none" => Ok(Self::Anonymous),
            other => Err(BackendError::config(format!(
                "unknown FFLOW_DOCUMENT_AUTH value: {}",
                other
            ))),
        }
    }
}

impl fmt::Display for DocumentAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Session => "session",
            Self::ServiceAccount => "service_account",
            Self::Anonymous => "anonymous",
        };
        write!(f, "{}", s)
    }
}

/// Everything needed to connect a `Backend`.
#[derive(Debug, Clone)]
pub struct BackendConfig {
    pub firestore: FirestoreConfig,
    pub identity: IdentityConfig,
    pub storage: BucketConfig,
    pub document_auth: DocumentAuth,
}

impl BackendConfig {
    /// Create config from environment variables, loading `.env` first.
    pub fn from_env() -> BackendResult<Self> {
        dotenvy::dotenv().ok();

        let document_auth = match std::env::var("FFLOW_DOCUMENT_AUTH") {
            Ok(v) if !v.is_empty() => v.parse()?,
            _ => DocumentAuth::default(),
        };

        let identity = IdentityConfig::from_env()?;
        let mut firestore = FirestoreConfig::from_env()?;
        // The web API key identifies the project for Firestore as well.
        if firestore.api_key.is_none() {
            firestore.api_key = Some(identity.api_key.clone());
        }

        Ok(Self {
            firestore,
            identity,
            storage: BucketConfig::from_env()?,
            document_auth,
        })
    }
}
