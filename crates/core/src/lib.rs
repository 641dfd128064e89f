//! Shared primitives for all Rust crates in the Qbox backend.

#![forbid(unsafe_code)]

/// Authentication primitives shared across services.
pub mod auth;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use auth::UserIdentity;

/// Result type used across Qbox crates.
pub type AppResult<T> = Result<T, AppError>;

/// A validated non-empty UTF-8 string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NonEmptyString(String);

impl NonEmptyString {
    /// Creates a validated non-empty string.
    pub fn new(value: impl Into<String>) -> AppResult<Self> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(AppError::Validation(
                "value must not be empty or whitespace".to_owned(),
            ));
        }

        Ok(Self(value))
    }

    /// Creates a validated string after trimming surrounding whitespace,
    /// rejecting values longer than `max_chars` characters.
    pub fn bounded(value: impl Into<String>, field: &str, max_chars: usize) -> AppResult<Self> {
        let value = value.into();
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(AppError::Validation(format!("{field} must not be empty")));
        }

        if trimmed.chars().count() > max_chars {
            return Err(AppError::Validation(format!(
                "{field} must not exceed {max_chars} characters"
            )));
        }

        Ok(Self(trimmed.to_owned()))
    }

    /// Returns the underlying string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl From<NonEmptyString> for String {
    fn from(value: NonEmptyString) -> Self {
        value.0
    }
}

/// Common application error categories.
#[derive(Debug, Error)]
pub enum AppError {
    /// Invalid input or violated invariant.
    #[error("validation error: {0}")]
    Validation(String),

    /// Requested resource does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Write operation conflicts with existing state.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Caller is not authenticated.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Access grant is revoked, expired, or has no remaining capacity.
    #[error("access grant unavailable: {0}")]
    GrantExhaustedOrExpired(String),

    /// Caller exceeded a request rate limit.
    #[error("rate limited: {0}")]
    RateLimited(String),

    /// Internal unexpected error.
    #[error("internal error: {0}")]
    Internal(String),
}

#[cfg(test)]
mod tests {
    use super::NonEmptyString;

    #[test]
    fn non_empty_string_rejects_whitespace() {
        let result = NonEmptyString::new("   ");
        assert!(result.is_err());
    }

    #[test]
    fn bounded_string_trims_and_enforces_length() {
        let value = NonEmptyString::bounded("  Front door  ", "name", 20);
        assert_eq!(
            value.map(String::from).unwrap_or_default(),
            "Front door".to_owned()
        );

        assert!(NonEmptyString::bounded("abcdef", "name", 5).is_err());
        assert!(NonEmptyString::bounded(" \t ", "name", 5).is_err());
    }
}
