//! Sign-up, sign-in and session observation.

use std::sync::Arc;

use tracing::warn;

use fflow_auth::{AuthError, AuthSession, FederatedCredential, User};
use fflow_models::Outcome;

use crate::subscription::Subscription;

#[derive(Clone)]
pub struct AuthService {
    session: Arc<AuthSession>,
}

impl AuthService {
    pub fn new(session: Arc<AuthSession>) -> Self {
        Self { session }
    }

    /// Create an email/password account and sign it in.
    pub async fn sign_up(&self, email: &str, password: &str) -> Outcome<User> {
        Self::finish("sign_up", self.session.sign_up(email, password).await)
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Outcome<User> {
        Self::finish("sign_in", self.session.sign_in(email, password).await)
    }

    /// Sign in with a token from the caller's OAuth flow (Google by default,
    /// see `FederatedCredential::google`).
    pub async fn sign_in_with_federated_provider(
        &self,
        credential: FederatedCredential,
    ) -> Outcome<User> {
        Self::finish(
            "sign_in_with_federated_provider",
            self.session.sign_in_with_federated(&credential).await,
        )
    }

    pub async fn sign_out(&self) -> Outcome<()> {
        self.session.sign_out().await;
        Outcome::Success(())
    }

    pub fn current_user(&self) -> Option<User> {
        self.session.current_user()
    }

    /// Call `callback` now with the current user, then on every sign-in and
    /// sign-out.
    pub fn on_session_change<F>(&self, mut callback: F) -> Subscription
    where
        F: FnMut(Option<User>) + Send + 'static,
    {
        let mut changes = self.session.subscribe();
        let current = changes.borrow_and_update().clone();
        callback(current);

        Subscription::spawn(async move {
            while changes.changed().await.is_ok() {
                let user = changes.borrow_and_update().clone();
                callback(user);
            }
        })
    }

    fn finish(operation: &str, result: Result<User, AuthError>) -> Outcome<User> {
        if let Err(e) = &result {
            warn!(operation, error = %e, "Authentication failed");
        }
        Outcome::from(result)
    }
}
