//! Uniform result envelope.
//!
//! Every service operation returns an `Outcome` instead of a `Result`:
//! callers branch on success and never see the typed crate errors.

use std::fmt::Display;

use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};

/// `{success: true, data}` or `{success: false, error}`.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    Success(T),
    Failure { error: String },
}

impl<T> Outcome<T> {
    pub fn failure(error: impl Into<String>) -> Self {
        Self::Failure {
            error: error.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success(_))
    }

    pub fn data(&self) -> Option<&T> {
        match self {
            Outcome::Success(data) => Some(data),
            Outcome::Failure { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            Outcome::Success(_) => None,
            Outcome::Failure { error } => Some(error),
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        match self {
            Outcome::Success(data) => Outcome::Success(f(data)),
            Outcome::Failure { error } => Outcome::Failure { error },
        }
    }

    pub fn into_result(self) -> Result<T, String> {
        match self {
            Outcome::Success(data) => Ok(data),
            Outcome::Failure { error } => Err(error),
        }
    }
}

impl<T, E: Display> From<Result<T, E>> for Outcome<T> {
    fn from(result: Result<T, E>) -> Self {
        match result {
            Ok(data) => Outcome::Success(data),
            Err(e) => Outcome::failure(e.to_string()),
        }
    }
}

impl<T: Serialize> Serialize for Outcome<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("Outcome", 2)?;
        match self {
            Outcome::Success(data) => {
                state.serialize_field("success", &true)?;
                state.serialize_field("data", data)?;
            }
            Outcome::Failure { error } => {
                state.serialize_field("success", &false)?;
                state.serialize_field("error", error)?;
            }
        }
        state.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_success_envelope_shape() {
        let outcome = Outcome::Success("abc".to_string());
        assert_eq!(
            serde_json::to_value(&outcome).unwrap(),
            json!({"success": true, "data": "abc"})
        );
    }

    #[test]
    fn test_failure_envelope_shape() {
        let outcome: Outcome<()> = Outcome::failure("Product not found");
        assert_eq!(
            serde_json::to_value(&outcome).unwrap(),
            json!({"success": false, "error": "Product not found"})
        );
    }

    #[test]
    fn test_from_result_uses_display() {
        let result: Result<u32, std::fmt::Error> = Err(std::fmt::Error);
        let outcome = Outcome::from(result);
        assert!(!outcome.is_success());
        assert_eq!(outcome.error(), Some("an error occurred when formatting an argument"));
    }

    #[test]
    fn test_map_keeps_failure() {
        let outcome: Outcome<u32> = Outcome::failure("boom");
        assert_eq!(outcome.map(|n| n + 1).into_result(), Err("boom".to_string()));
    }
}
