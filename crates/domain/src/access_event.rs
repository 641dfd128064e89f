use std::str::FromStr;

use chrono::{DateTime, Utc};
use qbox_core::{AppError, AppResult, NonEmptyString};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::AccessGrantId;

const USER_IDENTIFIER_MAX_CHARS: usize = 255;
const USER_NAME_MAX_CHARS: usize = 255;

/// How an end user presented a grant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessMethod {
    /// Scanned the grant's QR code.
    #[default]
    QrCode,
}

impl AccessMethod {
    /// Returns the storage string for this access method.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::QrCode => "qr_code",
        }
    }
}

impl FromStr for AccessMethod {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "qr_code" => Ok(Self::QrCode),
            _ => Err(AppError::Validation(format!(
                "unknown access method '{value}'"
            ))),
        }
    }
}

/// Caller-supplied identifier of the person consuming a grant.
///
/// Free-form (email, phone number or any other id); only trimmed and
/// length-checked.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UserIdentifier(String);

impl UserIdentifier {
    /// Creates a validated user identifier.
    pub fn new(value: impl Into<String>) -> AppResult<Self> {
        NonEmptyString::bounded(value, "user_identifier", USER_IDENTIFIER_MAX_CHARS)
            .map(|value| Self(value.into()))
    }

    /// Normalizes an optional display name, dropping blank values.
    pub fn display_name(value: Option<String>) -> AppResult<Option<String>> {
        match value {
            Some(name) if name.trim().is_empty() => Ok(None),
            Some(name) => NonEmptyString::bounded(name, "user_name", USER_NAME_MAX_CHARS)
                .map(|value| Some(value.into())),
            None => Ok(None),
        }
    }

    /// Returns the identifier string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

/// One successful first-time consumption of a grant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessEvent {
    /// Event identifier.
    pub id: Uuid,
    /// Consumed grant.
    pub grant_id: AccessGrantId,
    /// Caller-supplied identifier of the consumer.
    pub user_identifier: String,
    /// Optional display name of the consumer.
    pub user_name: Option<String>,
    /// Consumption timestamp.
    pub accessed_at: DateTime<Utc>,
    /// Presentation method.
    pub access_method: AccessMethod,
}

#[cfg(test)]
mod tests {
    use super::{AccessMethod, UserIdentifier};

    #[test]
    fn user_identifier_is_trimmed() {
        let identifier = UserIdentifier::new("  alice@example.com ");
        assert_eq!(
            identifier.map(|value| value.as_str().to_owned()).ok(),
            Some("alice@example.com".to_owned())
        );
    }

    #[test]
    fn user_identifier_rejects_blank_and_oversized_values() {
        assert!(UserIdentifier::new("   ").is_err());
        assert!(UserIdentifier::new("x".repeat(256)).is_err());
    }

    #[test]
    fn blank_display_name_is_dropped() {
        assert_eq!(
            UserIdentifier::display_name(Some("  ".to_owned())).ok(),
            Some(None)
        );
        assert_eq!(
            UserIdentifier::display_name(Some(" Alice ".to_owned())).ok(),
            Some(Some("Alice".to_owned()))
        );
    }

    #[test]
    fn access_method_defaults_to_qr_code() {
        assert_eq!(AccessMethod::default(), AccessMethod::QrCode);
        assert_eq!(
            "qr_code".parse::<AccessMethod>().ok(),
            Some(AccessMethod::QrCode)
        );
    }
}
