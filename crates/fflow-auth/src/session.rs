//! The signed-in session.
//!
//! `AuthSession` owns the current user and token pair, publishes session
//! changes on a `watch` channel and hands out ID tokens that are refreshed
//! shortly before they expire.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tokio::sync::{watch, RwLock};
use tracing::{debug, info, warn};

use crate::error::{AuthError, AuthResult};
use crate::identity::IdentityProvider;
use crate::types::{FederatedCredential, SignedIn, TokenGrant, User};

/// ID tokens are refreshed this long before they expire.
const REFRESH_MARGIN_SECS: i64 = 60;

struct SessionTokens {
    id_token: String,
    refresh_token: String,
    expires_at: DateTime<Utc>,
}

impl SessionTokens {
    fn from_grant(grant: TokenGrant) -> Self {
        let expires_at = grant.expires_at(Utc::now());
        Self {
            id_token: grant.id_token,
            refresh_token: grant.refresh_token,
            expires_at,
        }
    }

    fn is_fresh(&self) -> bool {
        Utc::now() + Duration::seconds(REFRESH_MARGIN_SECS) < self.expires_at
    }
}

/// Current user and tokens for one client.
pub struct AuthSession {
    provider: Arc<dyn IdentityProvider>,
    tokens: RwLock<Option<SessionTokens>>,
    user: watch::Sender<Option<User>>,
}

impl AuthSession {
    pub fn new(provider: Arc<dyn IdentityProvider>) -> Self {
        let (user, _) = watch::channel(None);
        Self {
            provider,
            tokens: RwLock::new(None),
            user,
        }
    }

    pub async fn sign_up(&self, email: &str, password: &str) -> AuthResult<User> {
        let signed_in = self.provider.sign_up(email, password).await?;
        info!(uid = %signed_in.user.uid, "Account created");
        Ok(self.establish(signed_in).await)
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> AuthResult<User> {
        let signed_in = self.provider.sign_in_with_password(email, password).await?;
        info!(uid = %signed_in.user.uid, "Signed in with password");
        Ok(self.establish(signed_in).await)
    }

    pub async fn sign_in_with_federated(
        &self,
        credential: &FederatedCredential,
    ) -> AuthResult<User> {
        let signed_in = self.provider.sign_in_with_idp(credential).await?;
        info!(
            uid = %signed_in.user.uid,
            provider = %credential.provider_id,
            "Signed in with federated provider"
        );
        Ok(self.establish(signed_in).await)
    }

    /// Drop the local session. Signing out while signed out is a no-op.
    pub async fn sign_out(&self) {
        let had_tokens = self.tokens.write().await.take().is_some();
        if had_tokens || self.user.borrow().is_some() {
            self.user.send_replace(None);
            info!("Signed out");
        }
    }

    /// The cached current user.
    pub fn current_user(&self) -> Option<User> {
        self.user.borrow().clone()
    }

    /// Receiver of session changes. The current value is marked seen.
    pub fn subscribe(&self) -> watch::Receiver<Option<User>> {
        self.user.subscribe()
    }

    /// ID token of the signed-in user, refreshed if it is about to expire.
    ///
    /// `None` when nobody is signed in. A refresh rejected because the
    /// account or its credential is gone signs the user out.
    pub async fn id_token(&self) -> AuthResult<Option<String>> {
        {
            let tokens = self.tokens.read().await;
            match tokens.as_ref() {
                None => return Ok(None),
                Some(t) if t.is_fresh() => return Ok(Some(t.id_token.clone())),
                Some(_) => {}
            }
        }

        let mut tokens = self.tokens.write().await;
        // Another caller may have refreshed while we waited for the lock.
        let refresh_token = match tokens.as_ref() {
            None => return Ok(None),
            Some(t) if t.is_fresh() => return Ok(Some(t.id_token.clone())),
            Some(t) => t.refresh_token.clone(),
        };

        match self.provider.refresh(&refresh_token).await {
            Ok(grant) => {
                let refreshed = SessionTokens::from_grant(grant);
                let id_token = refreshed.id_token.clone();
                *tokens = Some(refreshed);
                debug!("Refreshed ID token");
                Ok(Some(id_token))
            }
            Err(e) if e.ends_session() => {
                warn!(error = %e, "Session ended by identity provider");
                *tokens = None;
                drop(tokens);
                self.user.send_replace(None);
                Err(e)
            }
            Err(e) => Err(e),
        }
    }

    /// ID token, failing when nobody is signed in.
    pub async fn require_id_token(&self) -> AuthResult<String> {
        self.id_token().await?.ok_or(AuthError::NotSignedIn)
    }

    async fn establish(&self, signed_in: SignedIn) -> User {
        *self.tokens.write().await = Some(SessionTokens::from_grant(signed_in.tokens));
        self.user.send_replace(Some(signed_in.user.clone()));
        signed_in.user
    }
}
