//! In-process identity provider.
//!
//! Mirrors the provider's observable rules: syntactic email check, six
//! character minimum password, unique emails, indistinguishable failures
//! for unknown email and wrong password, disabled accounts.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use uuid::Uuid;

use fflow_models::is_valid_email;

use crate::error::{AuthError, AuthResult};
use crate::identity::IdentityProvider;
use crate::types::{FederatedCredential, SignedIn, TokenGrant, User, PASSWORD_PROVIDER};

const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Clone)]
struct Account {
    user: User,
    password: Option<String>,
    disabled: bool,
}

#[derive(Default)]
struct Accounts {
    by_uid: HashMap<String, Account>,
    /// Email or `provider:token` to uid.
    index: HashMap<String, String>,
    refresh_tokens: HashMap<String, String>,
}

/// In-memory `IdentityProvider`.
pub struct MemoryIdentityProvider {
    accounts: Mutex<Accounts>,
    token_lifetime: Duration,
    refreshes: AtomicUsize,
}

impl Default for MemoryIdentityProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryIdentityProvider {
    pub fn new() -> Self {
        Self {
            accounts: Mutex::new(Accounts::default()),
            token_lifetime: Duration::from_secs(3600),
            refreshes: AtomicUsize::new(0),
        }
    }

    /// Lifetime of issued ID tokens.
    pub fn with_token_lifetime(mut self, lifetime: Duration) -> Self {
        self.token_lifetime = lifetime;
        self
    }

    /// Disable the account registered under `email`.
    pub async fn disable(&self, email: &str) {
        let mut accounts = self.accounts.lock().await;
        if let Some(uid) = accounts.index.get(&email.to_lowercase()).cloned() {
            if let Some(account) = accounts.by_uid.get_mut(&uid) {
                account.disabled = true;
            }
        }
    }

    /// Number of refresh exchanges served.
    pub fn refresh_count(&self) -> usize {
        self.refreshes.load(Ordering::Relaxed)
    }

    fn issue(&self, accounts: &mut Accounts, uid: &str) -> TokenGrant {
        let refresh_token = Uuid::new_v4().simple().to_string();
        accounts
            .refresh_tokens
            .insert(refresh_token.clone(), uid.to_string());
        TokenGrant {
            id_token: format!("mem.{}.{}", uid, Uuid::new_v4().simple()),
            refresh_token,
            expires_in: self.token_lifetime,
        }
    }

    fn signed_in(&self, accounts: &mut Accounts, uid: &str) -> AuthResult<SignedIn> {
        let account = accounts.by_uid.get(uid).ok_or(AuthError::UserNotFound)?;
        if account.disabled {
            return Err(AuthError::UserDisabled);
        }
        let user = account.user.clone();
        let tokens = self.issue(accounts, uid);
        Ok(SignedIn { user, tokens })
    }
}

#[async_trait]
impl IdentityProvider for MemoryIdentityProvider {
    async fn sign_up(&self, email: &str, password: &str) -> AuthResult<SignedIn> {
        if !is_valid_email(email) {
            return Err(AuthError::InvalidEmail);
        }
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AuthError::WeakPassword(
                "Password should be at least 6 characters".to_string(),
            ));
        }

        let mut accounts = self.accounts.lock().await;
        let key = email.to_lowercase();
        if accounts.index.contains_key(&key) {
            return Err(AuthError::EmailExists);
        }

        let uid = Uuid::new_v4().simple().to_string();
        let user = User {
            uid: uid.clone(),
            email: Some(email.to_string()),
            display_name: None,
            photo_url: None,
            provider_id: PASSWORD_PROVIDER.to_string(),
            email_verified: false,
        };
        accounts.by_uid.insert(
            uid.clone(),
            Account {
                user,
                password: Some(password.to_string()),
                disabled: false,
            },
        );
        accounts.index.insert(key, uid.clone());
        self.signed_in(&mut accounts, &uid)
    }

    async fn sign_in_with_password(&self, email: &str, password: &str) -> AuthResult<SignedIn> {
        if !is_valid_email(email) {
            return Err(AuthError::InvalidEmail);
        }
        let mut accounts = self.accounts.lock().await;
        let uid = accounts
            .index
            .get(&email.to_lowercase())
            .cloned()
            .ok_or(AuthError::InvalidCredentials)?;
        let matches = accounts
            .by_uid
            .get(&uid)
            .and_then(|a| a.password.as_deref())
            .is_some_and(|stored| stored == password);
        if !matches {
            return Err(AuthError::InvalidCredentials);
        }
        self.signed_in(&mut accounts, &uid)
    }

    async fn sign_in_with_idp(&self, credential: &FederatedCredential) -> AuthResult<SignedIn> {
        if credential.token_value().is_empty() {
            return Err(AuthError::InvalidIdpResponse(
                "missing OAuth token".to_string(),
            ));
        }

        let mut accounts = self.accounts.lock().await;
        let key = format!("{}:{}", credential.provider_id, credential.token_value());
        let uid = match accounts.index.get(&key).cloned() {
            Some(uid) => uid,
            None => {
                let uid = Uuid::new_v4().simple().to_string();
                let user = User {
                    uid: uid.clone(),
                    email: None,
                    display_name: None,
                    photo_url: None,
                    provider_id: credential.provider_id.clone(),
                    email_verified: true,
                };
                accounts.by_uid.insert(
                    uid.clone(),
                    Account {
                        user,
                        password: None,
                        disabled: false,
                    },
                );
                accounts.index.insert(key, uid.clone());
                uid
            }
        };
        self.signed_in(&mut accounts, &uid)
    }

    async fn refresh(&self, refresh_token: &str) -> AuthResult<TokenGrant> {
        self.refreshes.fetch_add(1, Ordering::Relaxed);
        let mut accounts = self.accounts.lock().await;
        let uid = accounts
            .refresh_tokens
            .remove(refresh_token)
            .ok_or(AuthError::InvalidRefreshToken)?;
        Ok(self.signed_in(&mut accounts, &uid)?.tokens)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_sign_up_rules() {
        let provider = MemoryIdentityProvider::new();
        assert!(matches!(
            provider.sign_up("not-an-email", "secret123").await,
            Err(AuthError::InvalidEmail)
        ));
        assert!(matches!(
            provider.sign_up("a@b.com", "12345").await,
            Err(AuthError::WeakPassword(_))
        ));
        let signed_in = provider.sign_up("a@b.com", "123456").await.unwrap();
        assert_eq!(signed_in.user.email.as_deref(), Some("a@b.com"));
        assert_eq!(signed_in.user.provider_id, "password");
        assert!(matches!(
            provider.sign_up("A@b.com", "another1").await,
            Err(AuthError::EmailExists)
        ));
    }

    #[tokio::test]
    async fn test_wrong_password_and_unknown_email_look_alike() {
        let provider = MemoryIdentityProvider::new();
        provider.sign_up("a@b.com", "secret123").await.unwrap();
        let wrong = provider.sign_in_with_password("a@b.com", "nope123").await.unwrap_err();
        let unknown = provider.sign_in_with_password("z@b.com", "secret123").await.unwrap_err();
        assert_eq!(wrong.to_string(), unknown.to_string());
    }

    #[tokio::test]
    async fn test_federated_sign_in_is_stable_per_token() {
        let provider = MemoryIdentityProvider::new();
        let cred = FederatedCredential::google("google-id-token");
        let first = provider.sign_in_with_idp(&cred).await.unwrap();
        let again = provider.sign_in_with_idp(&cred).await.unwrap();
        assert_eq!(first.user.uid, again.user.uid);
        assert_eq!(first.user.provider_id, "google.com");
        assert!(matches!(
            provider.sign_in_with_idp(&FederatedCredential::google("")).await,
            Err(AuthError::InvalidIdpResponse(_))
        ));
    }

    #[tokio::test]
    async fn test_refresh_tokens_are_single_use() {
        let provider = MemoryIdentityProvider::new();
        let signed_in = provider.sign_up("a@b.com", "secret123").await.unwrap();
        let grant = provider.refresh(&signed_in.tokens.refresh_token).await.unwrap();
        assert_ne!(grant.id_token, signed_in.tokens.id_token);
        assert!(matches!(
            provider.refresh(&signed_in.tokens.refresh_token).await,
            Err(AuthError::InvalidRefreshToken)
        ));
    }
}
