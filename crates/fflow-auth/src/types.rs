//! Users, token grants and federated credentials.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Provider id of email/password accounts.
pub const PASSWORD_PROVIDER: &str = "password";

/// Provider id used for federated sign-in when none is given.
pub const GOOGLE_PROVIDER: &str = "google.com";

/// A signed-in user as reported by the identity provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub uid: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub photo_url: Option<String>,
    pub provider_id: String,
    #[serde(default)]
    pub email_verified: bool,
}

/// ID and refresh token pair with the ID token's lifetime.
#[derive(Debug, Clone)]
pub struct TokenGrant {
    pub id_token: String,
    pub refresh_token: String,
    pub expires_in: Duration,
}

impl TokenGrant {
    /// Absolute expiry when the grant was issued at `issued_at`.
    pub fn expires_at(&self, issued_at: DateTime<Utc>) -> DateTime<Utc> {
        issued_at
            + chrono::Duration::from_std(self.expires_in).unwrap_or_else(|_| chrono::Duration::zero())
    }
}

/// Result of a successful sign-up or sign-in.
#[derive(Debug, Clone)]
pub struct SignedIn {
    pub user: User,
    pub tokens: TokenGrant,
}

/// Token obtained by the caller's OAuth popup or redirect flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OAuthToken {
    IdToken(String),
    AccessToken(String),
}

/// Credential for federated sign-in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FederatedCredential {
    pub provider_id: String,
    pub token: OAuthToken,
}

impl FederatedCredential {
    pub fn new(provider_id: impl Into<String>, token: OAuthToken) -> Self {
        Self {
            provider_id: provider_id.into(),
            token,
        }
    }

    /// Google sign-in with an OAuth ID token.
    pub fn google(id_token: impl Into<String>) -> Self {
        Self::new(GOOGLE_PROVIDER, OAuthToken::IdToken(id_token.into()))
    }

    pub fn token_value(&self) -> &str {
        match &self.token {
            OAuthToken::IdToken(t) | OAuthToken::AccessToken(t) => t,
        }
    }

    /// Form-encoded `postBody` for `accounts:signInWithIdp`.
    pub fn post_body(&self) -> String {
        let (param, value) = match &self.token {
            OAuthToken::IdToken(t) => ("id_token", t),
            OAuthToken::AccessToken(t) => ("access_token", t),
        };
        format!(
            "{}={}&providerId={}",
            param,
            urlencoding::encode(value),
            urlencoding::encode(&self.provider_id)
        )
    }
}

/// Parse the decimal-seconds `expiresIn` field providers send as text.
pub(crate) fn parse_expires_in(raw: &str) -> Duration {
    Duration::from_secs(raw.trim().parse().unwrap_or(0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_post_body() {
        let cred = FederatedCredential::google("abc.def+ghi");
        assert_eq!(cred.post_body(), "id_token=abc.def%2Bghi&providerId=google.com");

        let cred = FederatedCredential::new("facebook.com", OAuthToken::AccessToken("tok".into()));
        assert_eq!(cred.post_body(), "access_token=tok&providerId=facebook.com");
    }

    #[test]
    fn test_user_serializes_camel_case() {
        let user = User {
            uid: "u1".into(),
            email: Some("a@b.com".into()),
            display_name: None,
            photo_url: None,
            provider_id: PASSWORD_PROVIDER.into(),
            email_verified: false,
        };
        let json = serde_json::to_value(&user).unwrap();
        assert_eq!(json["providerId"], "password");
        assert_eq!(json["emailVerified"], false);
    }

    #[test]
    fn test_expiry() {
        let grant = TokenGrant {
            id_token: "i".into(),
            refresh_token: "r".into(),
            expires_in: parse_expires_in("3600"),
        };
        let issued = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(
            grant.expires_at(issued),
            Utc.with_ymd_and_hms(2024, 1, 1, 1, 0, 0).unwrap()
        );
        assert_eq!(parse_expires_in("garbage"), Duration::ZERO);
    }
}
