//! Identity provider seam and the Identity Toolkit REST client.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use metrics::{counter, histogram};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info_span, Instrument};

use crate::error::{AuthError, AuthResult};
use crate::types::{
    parse_expires_in, FederatedCredential, SignedIn, TokenGrant, User, PASSWORD_PROVIDER,
};

pub const DEFAULT_IDENTITY_TOOLKIT_ENDPOINT: &str = "https://identitytoolkit.googleapis.com";
pub const DEFAULT_SECURE_TOKEN_ENDPOINT: &str = "https://securetoken.googleapis.com";

/// Account operations offered by an identity provider.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn sign_up(&self, email: &str, password: &str) -> AuthResult<SignedIn>;

    async fn sign_in_with_password(&self, email: &str, password: &str) -> AuthResult<SignedIn>;

    async fn sign_in_with_idp(&self, credential: &FederatedCredential) -> AuthResult<SignedIn>;

    /// Exchange a refresh token for a new token pair.
    async fn refresh(&self, refresh_token: &str) -> AuthResult<TokenGrant>;
}

// =============================================================================
// Configuration
// =============================================================================

#[derive(Debug, Clone)]
pub struct IdentityConfig {
    /// Web API key of the Firebase project
    pub api_key: String,
    pub identity_endpoint: String,
    pub secure_token_endpoint: String,
    /// Continue URI reported for federated sign-in
    pub request_uri: String,
    pub timeout: Duration,
}

impl IdentityConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            identity_endpoint: DEFAULT_IDENTITY_TOOLKIT_ENDPOINT.to_string(),
            secure_token_endpoint: DEFAULT_SECURE_TOKEN_ENDPOINT.to_string(),
            request_uri: "http://localhost".to_string(),
            timeout: Duration::from_secs(30),
        }
    }

    /// Point both endpoints at one host, e.g. the auth emulator.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        let endpoint = endpoint.into();
        self.identity_endpoint = endpoint.clone();
        self.secure_token_endpoint = endpoint;
        self
    }

    /// Create config from environment variables.
    pub fn from_env() -> AuthResult<Self> {
        let api_key = std::env::var("FIREBASE_API_KEY")
            .ok()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| AuthError::config("FIREBASE_API_KEY must be set for authentication"))?;

        let mut config = Self::new(api_key);
        if let Ok(endpoint) = std::env::var("IDENTITY_TOOLKIT_ENDPOINT") {
            config.identity_endpoint = endpoint;
        }
        if let Ok(endpoint) = std::env::var("SECURE_TOKEN_ENDPOINT") {
            config.secure_token_endpoint = endpoint;
        }
        if let Ok(uri) = std::env::var("FIREBASE_AUTH_REQUEST_URI") {
            config.request_uri = uri;
        }
        Ok(config)
    }
}

// =============================================================================
// Wire types
// =============================================================================

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PasswordRequest<'a> {
    email: &'a str,
    password: &'a str,
    return_secure_token: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct IdpRequest<'a> {
    post_body: String,
    request_uri: &'a str,
    return_secure_token: bool,
    return_idp_credential: bool,
}

#[derive(Serialize)]
struct RefreshRequest<'a> {
    grant_type: &'static str,
    refresh_token: &'a str,
}

/// Response of `signUp`, `signInWithPassword` and `signInWithIdp`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccountResponse {
    local_id: String,
    email: Option<String>,
    display_name: Option<String>,
    photo_url: Option<String>,
    provider_id: Option<String>,
    email_verified: Option<bool>,
    id_token: String,
    refresh_token: String,
    expires_in: String,
}

impl AccountResponse {
    fn into_signed_in(self, default_provider: &str) -> SignedIn {
        SignedIn {
            user: User {
                uid: self.local_id,
                email: self.email.filter(|e| !e.is_empty()),
                display_name: self.display_name.filter(|n| !n.is_empty()),
                photo_url: self.photo_url.filter(|p| !p.is_empty()),
                provider_id: self
                    .provider_id
                    .unwrap_or_else(|| default_provider.to_string()),
                email_verified: self.email_verified.unwrap_or(false),
            },
            tokens: TokenGrant {
                id_token: self.id_token,
                refresh_token: self.refresh_token,
                expires_in: parse_expires_in(&self.expires_in),
            },
        }
    }
}

/// Secure Token responses use snake case.
#[derive(Debug, Deserialize)]
struct RefreshResponse {
    id_token: String,
    refresh_token: String,
    expires_in: String,
}

// =============================================================================
// Client
// =============================================================================

/// Identity Toolkit / Secure Token REST client.
#[derive(Clone)]
pub struct IdentityClient {
    http: Client,
    config: IdentityConfig,
}

impl IdentityClient {
    pub fn new(config: IdentityConfig) -> AuthResult<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("fflow-auth/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { http, config })
    }

    pub fn from_env() -> AuthResult<Self> {
        Self::new(IdentityConfig::from_env()?)
    }

    fn accounts_url(&self, method: &str) -> String {
        format!(
            "{}/v1/accounts:{}?key={}",
            self.config.identity_endpoint.trim_end_matches('/'),
            method,
            urlencoding::encode(&self.config.api_key)
        )
    }

    fn token_url(&self) -> String {
        format!(
            "{}/v1/token?key={}",
            self.config.secure_token_endpoint.trim_end_matches('/'),
            urlencoding::encode(&self.config.api_key)
        )
    }

    async fn post_json<B, T>(&self, operation: &str, url: &str, body: &B) -> AuthResult<T>
    where
        B: Serialize + Sync,
        T: DeserializeOwned,
    {
        let request = self.http.post(url).json(body);
        self.execute(operation, request).await
    }

    /// Send a request with tracing and metrics, decoding the JSON body.
    async fn execute<T: DeserializeOwned>(
        &self,
        operation: &str,
        request: reqwest::RequestBuilder,
    ) -> AuthResult<T> {
        let span = info_span!("identity_request", operation = %operation);
        let start = Instant::now();

        let result = async {
            let response = request.send().await?;
            let status = response.status();
            let body = response.text().await?;
            if !status.is_success() {
                debug!(status = status.as_u16(), "Identity request rejected");
                return Err(AuthError::from_http_status(status.as_u16(), &body));
            }
            serde_json::from_str::<T>(&body)
                .map_err(|e| AuthError::InvalidResponse(format!("{}: {}", operation, e)))
        }
        .instrument(span)
        .await;

        let outcome = if result.is_ok() { "ok" } else { "error" };
        counter!(
            "identity_requests_total",
            "operation" => operation.to_string(),
            "outcome" => outcome
        )
        .increment(1);
        histogram!(
            "identity_latency_seconds",
            "operation" => operation.to_string()
        )
        .record(start.elapsed().as_secs_f64());

        result
    }
}

#[async_trait]
impl IdentityProvider for IdentityClient {
    async fn sign_up(&self, email: &str, password: &str) -> AuthResult<SignedIn> {
        let body = PasswordRequest {
            email,
            password,
            return_secure_token: true,
        };
        let response: AccountResponse = self
            .post_json("sign_up", &self.accounts_url("signUp"), &body)
            .await?;
        Ok(response.into_signed_in(PASSWORD_PROVIDER))
    }

    async fn sign_in_with_password(&self, email: &str, password: &str) -> AuthResult<SignedIn> {
        let body = PasswordRequest {
            email,
            password,
            return_secure_token: true,
        };
        let response: AccountResponse = self
            .post_json("sign_in_with_password", &self.accounts_url("signInWithPassword"), &body)
            .await?;
        Ok(response.into_signed_in(PASSWORD_PROVIDER))
    }

    async fn sign_in_with_idp(&self, credential: &FederatedCredential) -> AuthResult<SignedIn> {
        let body = IdpRequest {
            post_body: credential.post_body(),
            request_uri: &self.config.request_uri,
            return_secure_token: true,
            return_idp_credential: true,
        };
        let response: AccountResponse = self
            .post_json("sign_in_with_idp", &self.accounts_url("signInWithIdp"), &body)
            .await?;
        Ok(response.into_signed_in(&credential.provider_id))
    }

    async fn refresh(&self, refresh_token: &str) -> AuthResult<TokenGrant> {
        let body = RefreshRequest {
            grant_type: "refresh_token",
            refresh_token,
        };
        let request = self.http.post(self.token_url()).form(&body);
        let response: RefreshResponse = self.execute("refresh", request).await?;
        Ok(TokenGrant {
            id_token: response.id_token,
            refresh_token: response.refresh_token,
            expires_in: parse_expires_in(&response.expires_in),
        })
    }
}
