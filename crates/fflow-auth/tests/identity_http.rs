//! Identity Toolkit client tests against a mock HTTP server.

use std::sync::Arc;

use serde_json::json;
use wiremock::matchers::{body_json, body_partial_json, body_string_contains, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use fflow_auth::{
    AuthError, AuthSession, FederatedCredential, IdentityClient, IdentityConfig, IdentityProvider,
};

fn client(server: &MockServer) -> IdentityClient {
    IdentityClient::new(IdentityConfig::new("test-key").with_endpoint(server.uri())).unwrap()
}

fn account(local_id: &str, email: &str, id_token: &str, expires_in: &str) -> serde_json::Value {
    json!({
        "kind": "identitytoolkit#SignupNewUserResponse",
        "localId": local_id,
        "email": email,
        "idToken": id_token,
        "refreshToken": format!("refresh-{}", local_id),
        "expiresIn": expires_in
    })
}

fn rejection(code: &str) -> ResponseTemplate {
    ResponseTemplate::new(400).set_body_json(json!({
        "error": {"code": 400, "message": code, "errors": [{"message": code, "domain": "global", "reason": "invalid"}]}
    }))
}

#[tokio::test]
async fn test_sign_up_posts_credentials() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/accounts:signUp"))
        .and(query_param("key", "test-key"))
        .and(body_json(json!({
            "email": "rina@example.com",
            "password": "secret123",
            "returnSecureToken": true
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(account("u1", "rina@example.com", "id-1", "3600")))
        .expect(1)
        .mount(&server)
        .await;

    let signed_in = client(&server).sign_up("rina@example.com", "secret123").await.unwrap();
    assert_eq!(signed_in.user.uid, "u1");
    assert_eq!(signed_in.user.provider_id, "password");
    assert_eq!(signed_in.tokens.id_token, "id-1");
    assert_eq!(signed_in.tokens.expires_in.as_secs(), 3600);
}

#[tokio::test]
async fn test_error_codes_become_typed_errors() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/accounts:signUp"))
        .respond_with(rejection("EMAIL_EXISTS"))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/accounts:signInWithPassword"))
        .respond_with(rejection("INVALID_LOGIN_CREDENTIALS"))
        .mount(&server)
        .await;

    let client = client(&server);
    assert!(matches!(
        client.sign_up("a@b.com", "secret123").await,
        Err(AuthError::EmailExists)
    ));
    let err = client.sign_in_with_password("a@b.com", "wrong").await.unwrap_err();
    assert!(matches!(err, AuthError::InvalidCredentials));
}

#[tokio::test]
async fn test_federated_sign_in_sends_post_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/accounts:signInWithIdp"))
        .and(body_partial_json(json!({
            "postBody": "id_token=google-token&providerId=google.com",
            "returnSecureToken": true
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "localId": "g1",
            "email": "rina@gmail.com",
            "emailVerified": true,
            "displayName": "Rina",
            "photoUrl": "https://lh3.googleusercontent.com/a/photo",
            "providerId": "google.com",
            "idToken": "id-g",
            "refreshToken": "refresh-g",
            "expiresIn": "3600"
        })))
        .mount(&server)
        .await;

    let signed_in = client(&server)
        .sign_in_with_idp(&FederatedCredential::google("google-token"))
        .await
        .unwrap();
    assert_eq!(signed_in.user.provider_id, "google.com");
    assert_eq!(signed_in.user.display_name.as_deref(), Some("Rina"));
    assert!(signed_in.user.email_verified);
}

#[tokio::test]
async fn test_refresh_uses_secure_token_form() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/token"))
        .and(query_param("key", "test-key"))
        .and(body_string_contains("grant_type=refresh_token"))
        .and(body_string_contains("refresh_token=refresh-u1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "expires_in": "3600",
            "token_type": "Bearer",
            "refresh_token": "refresh-u1-next",
            "id_token": "id-2",
            "user_id": "u1",
            "project_id": "1234"
        })))
        .mount(&server)
        .await;

    let grant = client(&server).refresh("refresh-u1").await.unwrap();
    assert_eq!(grant.id_token, "id-2");
    assert_eq!(grant.refresh_token, "refresh-u1-next");
}

#[tokio::test]
async fn test_session_refreshes_short_lived_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/accounts:signInWithPassword"))
        .respond_with(ResponseTemplate::new(200).set_body_json(account("u1", "a@b.com", "id-short", "30")))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "expires_in": "3600",
            "refresh_token": "refresh-next",
            "id_token": "id-long",
            "user_id": "u1"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let session = AuthSession::new(Arc::new(client(&server)));
    session.sign_in("a@b.com", "secret123").await.unwrap();
    assert_eq!(session.id_token().await.unwrap().as_deref(), Some("id-long"));
    assert_eq!(session.id_token().await.unwrap().as_deref(), Some("id-long"));
}

#[tokio::test]
async fn test_expired_refresh_token_signs_out() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/accounts:signInWithPassword"))
        .respond_with(ResponseTemplate::new(200).set_body_json(account("u1", "a@b.com", "id-short", "0")))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/token"))
        .respond_with(rejection("TOKEN_EXPIRED"))
        .mount(&server)
        .await;

    let session = AuthSession::new(Arc::new(client(&server)));
    session.sign_in("a@b.com", "secret123").await.unwrap();
    assert!(matches!(session.id_token().await, Err(AuthError::TokenExpired)));
    assert!(session.current_user().is_none());
}
