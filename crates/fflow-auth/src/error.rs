//! Authentication error types.

use serde::Deserialize;
use thiserror::Error;

pub type AuthResult<T> = Result<T, AuthError>;

/// Errors from the identity provider and the local session.
///
/// Provider error codes map to dedicated variants with readable messages;
/// unknown codes keep the raw provider message.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("The email address is already in use by another account.")]
    EmailExists,

    #[error("The email address is badly formatted.")]
    InvalidEmail,

    #[error("The password is invalid or the user does not have a password.")]
    InvalidPassword,

    #[error("The supplied login credentials are incorrect.")]
    InvalidCredentials,

    #[error("There is no user record corresponding to this identifier.")]
    UserNotFound,

    #[error("The user account has been disabled by an administrator.")]
    UserDisabled,

    #[error("{0}")]
    WeakPassword(String),

    #[error("Access to this account has been temporarily disabled due to many failed login attempts. Try again later.")]
    TooManyAttempts,

    #[error("The user's credential is no longer valid. The user must sign in again.")]
    TokenExpired,

    #[error("The refresh token is invalid.")]
    InvalidRefreshToken,

    #[error("This sign-in method is not enabled for the project.")]
    OperationNotAllowed,

    #[error("Invalid federated credential: {0}")]
    InvalidIdpResponse(String),

    #[error("Identity provider error ({0}): {1}")]
    Provider(u16, String),

    #[error("No user is signed in")]
    NotSignedIn,

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

impl AuthError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Map a provider error code such as `EMAIL_EXISTS` or
    /// `WEAK_PASSWORD : Password should be at least 6 characters`.
    pub fn from_code(status: u16, message: &str) -> Self {
        let (code, detail) = match message.split_once(':') {
            Some((code, detail)) => (code.trim(), Some(detail.trim())),
            None => (message.trim(), None),
        };

        match code {
            "EMAIL_EXISTS" => Self::EmailExists,
            "INVALID_EMAIL" => Self::InvalidEmail,
            "INVALID_PASSWORD" => Self::InvalidPassword,
            "INVALID_LOGIN_CREDENTIALS" => Self::InvalidCredentials,
            "EMAIL_NOT_FOUND" | "USER_NOT_FOUND" => Self::UserNotFound,
            "USER_DISABLED" => Self::UserDisabled,
            "WEAK_PASSWORD" => Self::WeakPassword(
                detail
                    .unwrap_or("Password should be at least 6 characters")
                    .to_string(),
            ),
            "TOO_MANY_ATTEMPTS_TRY_LATER" => Self::TooManyAttempts,
            "TOKEN_EXPIRED" => Self::TokenExpired,
            "INVALID_REFRESH_TOKEN" => Self::InvalidRefreshToken,
            "OPERATION_NOT_ALLOWED" | "PASSWORD_LOGIN_DISABLED" => Self::OperationNotAllowed,
            "INVALID_IDP_RESPONSE" => {
                Self::InvalidIdpResponse(detail.unwrap_or(code).to_string())
            }
            _ => Self::Provider(status, message.to_string()),
        }
    }

    /// Map an HTTP error response from Identity Toolkit or Secure Token.
    pub fn from_http_status(status: u16, body: &str) -> Self {
        match serde_json::from_str::<ErrorEnvelope>(body) {
            Ok(ErrorEnvelope {
                error: ErrorBody {
                    message: Some(message),
                },
            }) => Self::from_code(status, &message),
            _ => Self::Provider(status, body.to_string()),
        }
    }

    /// Whether the stored session can no longer be used and must be dropped.
    pub fn ends_session(&self) -> bool {
        matches!(
            self,
            Self::TokenExpired | Self::InvalidRefreshToken | Self::UserDisabled | Self::UserNotFound
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_codes() {
        assert!(matches!(AuthError::from_code(400, "EMAIL_EXISTS"), AuthError::EmailExists));
        assert!(matches!(
            AuthError::from_code(400, "INVALID_LOGIN_CREDENTIALS"),
            AuthError::InvalidCredentials
        ));
        assert!(matches!(AuthError::from_code(400, "EMAIL_NOT_FOUND"), AuthError::UserNotFound));
        assert!(matches!(
            AuthError::from_code(400, "TOO_MANY_ATTEMPTS_TRY_LATER : Access disabled"),
            AuthError::TooManyAttempts
        ));
    }

    #[test]
    fn test_weak_password_keeps_detail() {
        let err = AuthError::from_code(
            400,
            "WEAK_PASSWORD : Password should be at least 6 characters",
        );
        assert_eq!(err.to_string(), "Password should be at least 6 characters");
    }

    #[test]
    fn test_unknown_code_is_provider_error() {
        let err = AuthError::from_code(400, "QUOTA_EXCEEDED");
        assert_eq!(err.to_string(), "Identity provider error (400): QUOTA_EXCEEDED");
    }

    #[test]
    fn test_from_http_status_parses_envelope() {
        let body = r#"{"error":{"code":400,"message":"EMAIL_EXISTS","errors":[{"message":"EMAIL_EXISTS","domain":"global","reason":"invalid"}]}}"#;
        assert!(matches!(AuthError::from_http_status(400, body), AuthError::EmailExists));

        let err = AuthError::from_http_status(502, "Bad Gateway");
        assert!(matches!(err, AuthError::Provider(502, _)));
    }

    #[test]
    fn test_ends_session() {
        assert!(AuthError::TokenExpired.ends_session());
        assert!(AuthError::UserDisabled.ends_session());
        assert!(!AuthError::TooManyAttempts.ends_session());
    }
}
