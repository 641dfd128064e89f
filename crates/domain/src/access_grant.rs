//! Access grant domain types.
//!
//! An access grant is a shareable, usage-limited and time-limited token bound
//! to one Qbox locker. Whether a grant can still be consumed is derived on
//! every check from `is_active`, `expires_at` and the usage counter; it is
//! never stored.

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use qbox_core::{AppError, AppResult, NonEmptyString};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Upper bound for `max_users` on a single grant.
pub const MAX_GRANT_USERS: u32 = 1_000_000;

/// Upper bound for `valid_duration`, in either unit.
pub const MAX_VALID_DURATION: u32 = 1_000_000;

const NAME_MAX_CHARS: usize = 255;
const LOCATION_MAX_CHARS: usize = 255;
const ADDRESS_MAX_CHARS: usize = 1_000;

/// Unique identifier for an access grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AccessGrantId(Uuid);

impl AccessGrantId {
    /// Creates a new random grant identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a grant identifier from an existing UUID value.
    #[must_use]
    pub fn from_uuid(value: Uuid) -> Self {
        Self(value)
    }

    /// Parses a grant identifier from its transport representation.
    pub fn parse(value: &str) -> AppResult<Self> {
        Uuid::parse_str(value.trim())
            .map(Self)
            .map_err(|_| AppError::Validation(format!("invalid grant_id '{value}'")))
    }

    /// Returns the underlying UUID value.
    #[must_use]
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for AccessGrantId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for AccessGrantId {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// Unit in which a grant's validity window is expressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DurationType {
    /// Whole days.
    Days,
    /// Whole minutes.
    Minutes,
}

impl DurationType {
    /// Returns the storage string for this duration unit.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Days => "days",
            Self::Minutes => "minutes",
        }
    }
}

impl FromStr for DurationType {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "days" => Ok(Self::Days),
            "minutes" => Ok(Self::Minutes),
            _ => Err(AppError::Validation(format!(
                "duration_type must be 'days' or 'minutes', got '{value}'"
            ))),
        }
    }
}

/// Validated validity window of a grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GrantDuration {
    duration_type: DurationType,
    valid_duration: u32,
}

impl GrantDuration {
    /// Creates a validity window of `valid_duration` units.
    pub fn new(duration_type: DurationType, valid_duration: u32) -> AppResult<Self> {
        if valid_duration == 0 {
            return Err(AppError::Validation(
                "valid_duration must be at least 1".to_owned(),
            ));
        }

        if valid_duration > MAX_VALID_DURATION {
            return Err(AppError::Validation(format!(
                "valid_duration must not exceed {MAX_VALID_DURATION}"
            )));
        }

        Ok(Self {
            duration_type,
            valid_duration,
        })
    }

    /// Returns the duration unit.
    #[must_use]
    pub fn duration_type(&self) -> DurationType {
        self.duration_type
    }

    /// Returns the number of units.
    #[must_use]
    pub fn valid_duration(&self) -> u32 {
        self.valid_duration
    }

    /// Returns the window as a signed chrono duration.
    pub fn as_chrono(&self) -> AppResult<Duration> {
        let units = i64::from(self.valid_duration);
        match self.duration_type {
            DurationType::Days => Duration::try_days(units),
            DurationType::Minutes => Duration::try_minutes(units),
        }
        .ok_or_else(|| AppError::Validation("valid_duration is out of range".to_owned()))
    }

    /// Computes the expiry instant for a grant created at `created_at`.
    pub fn expires_at_from(&self, created_at: DateTime<Utc>) -> AppResult<DateTime<Utc>> {
        created_at
            .checked_add_signed(self.as_chrono()?)
            .ok_or_else(|| AppError::Validation("grant expiry is out of range".to_owned()))
    }
}

/// Derived lifecycle state of a grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessGrantStatus {
    /// Consumable: active, unexpired, capacity remaining.
    Active,
    /// Every slot has been used.
    Exhausted,
    /// The validity window has passed.
    Expired,
    /// Manually deactivated.
    Revoked,
}

impl AccessGrantStatus {
    /// Returns the transport string for this status.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Exhausted => "exhausted",
            Self::Expired => "expired",
            Self::Revoked => "revoked",
        }
    }

    /// Returns the caller-facing reason a non-active grant cannot be consumed.
    #[must_use]
    pub fn unavailable_reason(&self) -> &'static str {
        match self {
            Self::Active => "access grant is active",
            Self::Exhausted => "access grant has reached its maximum number of users",
            Self::Expired => "access grant has expired",
            Self::Revoked => "access grant is no longer active",
        }
    }
}

/// Input for issuing a new grant against a resolved device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAccessGrant {
    /// Public device identifier.
    pub qbox_id: String,
    /// Subject of the issuing identity, when known.
    pub created_by: Option<String>,
    /// Human-readable label.
    pub name: String,
    /// Location snapshot.
    pub location: Option<String>,
    /// Address snapshot.
    pub address: Option<String>,
    /// Capacity.
    pub max_users: u32,
    /// Validity window.
    pub duration: GrantDuration,
}

/// Full persisted state used to restore a grant from storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessGrantParts {
    /// Grant identifier.
    pub id: AccessGrantId,
    /// Public device identifier.
    pub qbox_id: String,
    /// Subject of the issuing identity, when known.
    pub created_by: Option<String>,
    /// Human-readable label.
    pub name: String,
    /// Location snapshot.
    pub location: Option<String>,
    /// Address snapshot.
    pub address: Option<String>,
    /// Capacity.
    pub max_users: u32,
    /// Consumed slots.
    pub current_users: u32,
    /// Validity window as configured (informational after creation).
    pub duration: GrantDuration,
    /// Expiry computed once at creation.
    pub expires_at: DateTime<Utc>,
    /// Manual kill switch.
    pub is_active: bool,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last modification timestamp.
    pub updated_at: DateTime<Utc>,
}

/// Partial update of a grant's editable fields.
///
/// The access token and `expires_at` are deliberately absent: neither can be
/// edited after creation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccessGrantUpdate {
    /// New label.
    pub name: Option<String>,
    /// New location; an empty string clears it.
    pub location: Option<String>,
    /// New address; an empty string clears it.
    pub address: Option<String>,
    /// New capacity.
    pub max_users: Option<u32>,
    /// New duration unit (does not move `expires_at`).
    pub duration_type: Option<DurationType>,
    /// New duration amount (does not move `expires_at`).
    pub valid_duration: Option<u32>,
    /// New kill-switch state.
    pub is_active: Option<bool>,
}

impl AccessGrantUpdate {
    /// Returns whether the update changes nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.location.is_none()
            && self.address.is_none()
            && self.max_users.is_none()
            && self.duration_type.is_none()
            && self.valid_duration.is_none()
            && self.is_active.is_none()
    }
}

/// Shareable access token record bound to one device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessGrant {
    id: AccessGrantId,
    qbox_id: String,
    created_by: Option<String>,
    name: String,
    location: Option<String>,
    address: Option<String>,
    max_users: u32,
    current_users: u32,
    duration: GrantDuration,
    expires_at: DateTime<Utc>,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl AccessGrant {
    /// Creates a fresh, active, unused grant. `expires_at` is fixed here.
    pub fn issue(input: NewAccessGrant, created_at: DateTime<Utc>) -> AppResult<Self> {
        let qbox_id = NonEmptyString::bounded(input.qbox_id, "qbox_id", NAME_MAX_CHARS)?;
        let name = NonEmptyString::bounded(input.name, "name", NAME_MAX_CHARS)?;
        validate_max_users(input.max_users)?;

        Ok(Self {
            id: AccessGrantId::new(),
            qbox_id: qbox_id.into(),
            created_by: input.created_by,
            name: name.into(),
            location: normalize_optional_text(input.location, "location", LOCATION_MAX_CHARS)?,
            address: normalize_optional_text(input.address, "address", ADDRESS_MAX_CHARS)?,
            max_users: input.max_users,
            current_users: 0,
            duration: input.duration,
            expires_at: input.duration.expires_at_from(created_at)?,
            is_active: true,
            created_at,
            updated_at: created_at,
        })
    }

    /// Restores a grant from persisted state, re-checking the capacity invariant.
    pub fn from_parts(parts: AccessGrantParts) -> AppResult<Self> {
        validate_max_users(parts.max_users)?;
        if parts.current_users > parts.max_users {
            return Err(AppError::Internal(format!(
                "access grant '{}' has current_users {} above max_users {}",
                parts.id, parts.current_users, parts.max_users
            )));
        }

        Ok(Self {
            id: parts.id,
            qbox_id: parts.qbox_id,
            created_by: parts.created_by,
            name: parts.name,
            location: parts.location,
            address: parts.address,
            max_users: parts.max_users,
            current_users: parts.current_users,
            duration: parts.duration,
            expires_at: parts.expires_at,
            is_active: parts.is_active,
            created_at: parts.created_at,
            updated_at: parts.updated_at,
        })
    }

    /// Decomposes the grant into its persisted state.
    #[must_use]
    pub fn into_parts(self) -> AccessGrantParts {
        AccessGrantParts {
            id: self.id,
            qbox_id: self.qbox_id,
            created_by: self.created_by,
            name: self.name,
            location: self.location,
            address: self.address,
            max_users: self.max_users,
            current_users: self.current_users,
            duration: self.duration,
            expires_at: self.expires_at,
            is_active: self.is_active,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }

    /// Returns the grant identifier.
    #[must_use]
    pub fn id(&self) -> AccessGrantId {
        self.id
    }

    /// Returns the public identifier of the bound device.
    #[must_use]
    pub fn qbox_id(&self) -> &str {
        self.qbox_id.as_str()
    }

    /// Returns the issuing identity subject, if any.
    #[must_use]
    pub fn created_by(&self) -> Option<&str> {
        self.created_by.as_deref()
    }

    /// Returns the grant label.
    #[must_use]
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Returns the location snapshot.
    #[must_use]
    pub fn location(&self) -> Option<&str> {
        self.location.as_deref()
    }

    /// Returns the address snapshot.
    #[must_use]
    pub fn address(&self) -> Option<&str> {
        self.address.as_deref()
    }

    /// Returns the capacity.
    #[must_use]
    pub fn max_users(&self) -> u32 {
        self.max_users
    }

    /// Returns the number of consumed slots.
    #[must_use]
    pub fn current_users(&self) -> u32 {
        self.current_users
    }

    /// Returns the number of slots left.
    #[must_use]
    pub fn remaining_users(&self) -> u32 {
        self.max_users.saturating_sub(self.current_users)
    }

    /// Returns the configured validity window.
    #[must_use]
    pub fn duration(&self) -> GrantDuration {
        self.duration
    }

    /// Returns the expiry computed at creation.
    #[must_use]
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// Returns the kill-switch state.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.is_active
    }

    /// Returns the creation timestamp.
    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns the last modification timestamp.
    #[must_use]
    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Evaluates the grant's lifecycle state at `now`.
    ///
    /// This is the only place consumability is decided.
    #[must_use]
    pub fn status_at(&self, now: DateTime<Utc>) -> AccessGrantStatus {
        if !self.is_active {
            AccessGrantStatus::Revoked
        } else if now >= self.expires_at {
            AccessGrantStatus::Expired
        } else if self.current_users >= self.max_users {
            AccessGrantStatus::Exhausted
        } else {
            AccessGrantStatus::Active
        }
    }

    /// Returns whether the grant can be consumed at `now`.
    #[must_use]
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        self.status_at(now) == AccessGrantStatus::Active
    }

    /// Takes one capacity slot, failing when the grant is not active at `now`.
    pub fn record_consumption(&mut self, now: DateTime<Utc>) -> AppResult<()> {
        let status = self.status_at(now);
        if status != AccessGrantStatus::Active {
            return Err(AppError::GrantExhaustedOrExpired(
                status.unavailable_reason().to_owned(),
            ));
        }

        self.current_users += 1;
        self.updated_at = now;
        Ok(())
    }

    /// Deactivates the grant. Revoking a revoked grant is a no-op.
    pub fn revoke(&mut self, now: DateTime<Utc>) {
        if self.is_active {
            self.is_active = false;
            self.updated_at = now;
        }
    }

    /// Applies an edit to the mutable fields.
    ///
    /// Duration edits are recorded but never move `expires_at`. Capacity may
    /// not drop below the slots already consumed.
    pub fn apply_update(&mut self, update: AccessGrantUpdate, now: DateTime<Utc>) -> AppResult<()> {
        if update.is_empty() {
            return Err(AppError::Validation(
                "update must change at least one field".to_owned(),
            ));
        }

        let name = update
            .name
            .map(|value| NonEmptyString::bounded(value, "name", NAME_MAX_CHARS))
            .transpose()?;
        let location = update
            .location
            .map(|value| normalize_optional_text(Some(value), "location", LOCATION_MAX_CHARS))
            .transpose()?;
        let address = update
            .address
            .map(|value| normalize_optional_text(Some(value), "address", ADDRESS_MAX_CHARS))
            .transpose()?;

        if let Some(max_users) = update.max_users {
            validate_max_users(max_users)?;
            if max_users < self.current_users {
                return Err(AppError::Validation(format!(
                    "max_users cannot be lowered below the {} users already granted",
                    self.current_users
                )));
            }
        }

        let duration = if update.duration_type.is_some() || update.valid_duration.is_some() {
            Some(GrantDuration::new(
                update
                    .duration_type
                    .unwrap_or(self.duration.duration_type()),
                update
                    .valid_duration
                    .unwrap_or(self.duration.valid_duration()),
            )?)
        } else {
            None
        };

        if let Some(name) = name {
            self.name = name.into();
        }
        if let Some(location) = location {
            self.location = location;
        }
        if let Some(address) = address {
            self.address = address;
        }
        if let Some(max_users) = update.max_users {
            self.max_users = max_users;
        }
        if let Some(duration) = duration {
            self.duration = duration;
        }
        if let Some(is_active) = update.is_active {
            self.is_active = is_active;
        }
        self.updated_at = now;

        Ok(())
    }
}

fn validate_max_users(max_users: u32) -> AppResult<()> {
    if max_users == 0 {
        return Err(AppError::Validation(
            "max_users must be at least 1".to_owned(),
        ));
    }

    if max_users > MAX_GRANT_USERS {
        return Err(AppError::Validation(format!(
            "max_users must not exceed {MAX_GRANT_USERS}"
        )));
    }

    Ok(())
}

fn normalize_optional_text(
    value: Option<String>,
    field: &str,
    max_chars: usize,
) -> AppResult<Option<String>> {
    match value {
        Some(text) if text.trim().is_empty() => Ok(None),
        Some(text) => NonEmptyString::bounded(text, field, max_chars)
            .map(String::from)
            .map(Some),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use proptest::prelude::*;
    use qbox_core::AppError;

    use super::{
        AccessGrant, AccessGrantStatus, AccessGrantUpdate, DurationType, GrantDuration,
        NewAccessGrant,
    };

    fn created_at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0)
            .single()
            .unwrap_or_else(Utc::now)
    }

    fn issue(max_users: u32, duration_type: DurationType, valid_duration: u32) -> AccessGrant {
        let duration = GrantDuration::new(duration_type, valid_duration);
        assert!(duration.is_ok());
        let Ok(duration) = duration else {
            unreachable!()
        };

        let grant = AccessGrant::issue(
            NewAccessGrant {
                qbox_id: "QB-100".to_owned(),
                created_by: Some("staff-1".to_owned()),
                name: "Front door".to_owned(),
                location: Some("Lobby".to_owned()),
                address: Some("1 Main St".to_owned()),
                max_users,
                duration,
            },
            created_at(),
        );
        assert!(grant.is_ok());
        let Ok(grant) = grant else { unreachable!() };
        grant
    }

    #[test]
    fn issue_computes_expiry_from_days_and_minutes() {
        let days = issue(5, DurationType::Days, 2);
        assert_eq!(days.expires_at(), created_at() + Duration::days(2));
        assert_eq!(days.current_users(), 0);
        assert!(days.is_active());

        let minutes = issue(5, DurationType::Minutes, 90);
        assert_eq!(minutes.expires_at(), created_at() + Duration::minutes(90));
    }

    #[test]
    fn issue_rejects_zero_capacity_and_zero_duration() {
        assert!(matches!(
            GrantDuration::new(DurationType::Days, 0),
            Err(AppError::Validation(_))
        ));

        let Ok(duration) = GrantDuration::new(DurationType::Days, 1) else {
            unreachable!()
        };
        let result = AccessGrant::issue(
            NewAccessGrant {
                qbox_id: "QB-100".to_owned(),
                created_by: None,
                name: "Front door".to_owned(),
                location: None,
                address: None,
                max_users: 0,
                duration,
            },
            created_at(),
        );
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[test]
    fn duration_type_parses_storage_values() {
        assert_eq!("days".parse::<DurationType>().ok(), Some(DurationType::Days));
        assert_eq!(
            "minutes".parse::<DurationType>().ok(),
            Some(DurationType::Minutes)
        );
        assert!("hours".parse::<DurationType>().is_err());
    }

    #[test]
    fn one_minute_grant_is_valid_until_the_minute_mark() {
        let grant = issue(1, DurationType::Minutes, 1);

        assert!(grant.is_valid_at(created_at()));
        assert!(grant.is_valid_at(created_at() + Duration::seconds(59)));
        assert!(grant.is_valid_at(created_at() + Duration::milliseconds(59_999)));
        assert!(!grant.is_valid_at(created_at() + Duration::minutes(1)));
        assert_eq!(
            grant.status_at(created_at() + Duration::minutes(1)),
            AccessGrantStatus::Expired
        );
    }

    #[test]
    fn revoked_status_takes_precedence() {
        let mut grant = issue(1, DurationType::Days, 1);
        assert!(grant.record_consumption(created_at()).is_ok());
        assert_eq!(
            grant.status_at(created_at()),
            AccessGrantStatus::Exhausted
        );

        grant.revoke(created_at());
        assert_eq!(grant.status_at(created_at()), AccessGrantStatus::Revoked);
        assert_eq!(
            grant.status_at(created_at() + Duration::days(3)),
            AccessGrantStatus::Revoked
        );
    }

    #[test]
    fn record_consumption_stops_at_capacity() {
        let mut grant = issue(2, DurationType::Days, 1);
        assert!(grant.record_consumption(created_at()).is_ok());
        assert!(grant.record_consumption(created_at()).is_ok());
        assert!(matches!(
            grant.record_consumption(created_at()),
            Err(AppError::GrantExhaustedOrExpired(_))
        ));
        assert_eq!(grant.current_users(), 2);
        assert_eq!(grant.remaining_users(), 0);
    }

    #[test]
    fn duration_edits_do_not_move_expiry() {
        let mut grant = issue(3, DurationType::Minutes, 10);
        let original_expiry = grant.expires_at();

        let result = grant.apply_update(
            AccessGrantUpdate {
                duration_type: Some(DurationType::Days),
                valid_duration: Some(30),
                ..AccessGrantUpdate::default()
            },
            created_at() + Duration::minutes(1),
        );

        assert!(result.is_ok());
        assert_eq!(grant.expires_at(), original_expiry);
        assert_eq!(grant.duration().duration_type(), DurationType::Days);
        assert_eq!(grant.duration().valid_duration(), 30);
    }

    #[test]
    fn update_rejects_capacity_below_current_users() {
        let mut grant = issue(3, DurationType::Days, 1);
        assert!(grant.record_consumption(created_at()).is_ok());
        assert!(grant.record_consumption(created_at()).is_ok());

        let result = grant.apply_update(
            AccessGrantUpdate {
                max_users: Some(1),
                ..AccessGrantUpdate::default()
            },
            created_at(),
        );

        assert!(matches!(result, Err(AppError::Validation(_))));
        assert_eq!(grant.max_users(), 3);
    }

    #[test]
    fn update_clears_location_with_empty_string_and_reactivates() {
        let mut grant = issue(3, DurationType::Days, 1);
        grant.revoke(created_at());

        let result = grant.apply_update(
            AccessGrantUpdate {
                location: Some("   ".to_owned()),
                is_active: Some(true),
                ..AccessGrantUpdate::default()
            },
            created_at(),
        );

        assert!(result.is_ok());
        assert_eq!(grant.location(), None);
        assert_eq!(grant.status_at(created_at()), AccessGrantStatus::Active);
    }

    #[test]
    fn empty_update_is_rejected() {
        let mut grant = issue(3, DurationType::Days, 1);
        assert!(matches!(
            grant.apply_update(AccessGrantUpdate::default(), created_at()),
            Err(AppError::Validation(_))
        ));
    }

    proptest! {
        #[test]
        fn current_users_never_exceeds_max_users(
            max_users in 1u32..20,
            attempts in 0usize..60,
            revoke_at in proptest::option::of(0usize..60),
        ) {
            let mut grant = issue(max_users, DurationType::Days, 1);
            let mut granted = 0u32;

            for attempt in 0..attempts {
                if revoke_at == Some(attempt) {
                    grant.revoke(created_at());
                }
                if grant.record_consumption(created_at()).is_ok() {
                    granted += 1;
                }
                prop_assert!(grant.current_users() <= grant.max_users());
            }

            prop_assert_eq!(grant.current_users(), granted);
            prop_assert!(granted <= max_users);
        }

        #[test]
        fn expiry_is_creation_plus_duration(
            valid_duration in 1u32..100_000,
            use_days in any::<bool>(),
        ) {
            let duration_type = if use_days { DurationType::Days } else { DurationType::Minutes };
            let grant = issue(1, duration_type, valid_duration);
            let expected = if use_days {
                Duration::days(i64::from(valid_duration))
            } else {
                Duration::minutes(i64::from(valid_duration))
            };

            prop_assert_eq!(grant.expires_at() - grant.created_at(), expected);
            prop_assert!(grant.is_valid_at(grant.expires_at() - Duration::seconds(1)));
            prop_assert!(!grant.is_valid_at(grant.expires_at()));
        }
    }
}
