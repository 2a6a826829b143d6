//! Document-store credentials taken from the signed-in session.

use std::sync::Arc;

use async_trait::async_trait;

use fflow_auth::AuthSession;
use fflow_firestore::{AccessTokenSource, FirestoreError, FirestoreResult};

/// Sends the current user's ID token; requests go out unauthenticated
/// while nobody is signed in.
#[derive(Clone)]
pub struct SessionTokens {
    session: Arc<AuthSession>,
}

impl SessionTokens {
    pub fn new(session: Arc<AuthSession>) -> Self {
        Self { session }
    }
}

#[async_trait]
impl AccessTokenSource for SessionTokens {
    async fn access_token(&self) -> FirestoreResult<Option<String>> {
        self.session
            .id_token()
            .await
            .map_err(|e| FirestoreError::auth_error(e.to_string()))
    }
}
