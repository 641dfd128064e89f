use std::str::FromStr;

use axum::http::StatusCode;
use chrono::{DateTime, SecondsFormat, Utc};
use qbox_application::ConsumeOutcome;
use qbox_core::AppError;
use qbox_domain::{AccessEvent, AccessGrant, AccessGrantUpdate, DurationType};

use super::types::{
    AccessEventResponse, AccessGrantResponse, ConsumeAccessResponse, UpdateAccessGrantRequest,
};

const ALREADY_GRANTED_MESSAGE: &str = "Access already granted";
const GRANTED_MESSAGE: &str = "Access granted successfully";

fn timestamp(value: DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Millis, true)
}

impl AccessGrantResponse {
    /// Builds the response for `grant` as evaluated at `now`.
    pub fn from_grant(grant: &AccessGrant, now: DateTime<Utc>, public_base_url: &str) -> Self {
        let status = grant.status_at(now);
        Self {
            id: grant.id().to_string(),
            qbox_id: grant.qbox_id().to_owned(),
            created_by: grant.created_by().map(ToOwned::to_owned),
            name: grant.name().to_owned(),
            location: grant.location().map(ToOwned::to_owned),
            address: grant.address().map(ToOwned::to_owned),
            max_users: grant.max_users(),
            current_users: grant.current_users(),
            remaining_users: grant.remaining_users(),
            duration_type: grant.duration().duration_type().as_str().to_owned(),
            valid_duration: grant.duration().valid_duration(),
            expires_at: timestamp(grant.expires_at()),
            is_active: grant.is_active(),
            status: status.as_str().to_owned(),
            is_valid: grant.is_valid_at(now),
            qr_code_url: format!("{public_base_url}/access-qr-codes/{}/qr-code", grant.id()),
            created_at: timestamp(grant.created_at()),
            updated_at: timestamp(grant.updated_at()),
        }
    }
}

impl From<AccessEvent> for AccessEventResponse {
    fn from(value: AccessEvent) -> Self {
        Self {
            id: value.id.to_string(),
            grant_id: value.grant_id.to_string(),
            user_identifier: value.user_identifier,
            user_name: value.user_name,
            accessed_at: timestamp(value.accessed_at),
            access_method: value.access_method.as_str().to_owned(),
        }
    }
}

impl From<ConsumeOutcome> for ConsumeAccessResponse {
    fn from(value: ConsumeOutcome) -> Self {
        match value {
            ConsumeOutcome::AlreadyGranted { grant } => Self {
                success: true,
                status_code: StatusCode::OK.as_u16(),
                message: ALREADY_GRANTED_MESSAGE.to_owned(),
                qbox_id: grant.qbox_id().to_owned(),
                location: grant.location().map(ToOwned::to_owned),
                address: grant.address().map(ToOwned::to_owned),
                expires_at: None,
                remaining_users: None,
            },
            ConsumeOutcome::Granted { grant, .. } => Self {
                success: true,
                status_code: StatusCode::OK.as_u16(),
                message: GRANTED_MESSAGE.to_owned(),
                qbox_id: grant.qbox_id().to_owned(),
                location: grant.location().map(ToOwned::to_owned),
                address: grant.address().map(ToOwned::to_owned),
                expires_at: Some(timestamp(grant.expires_at())),
                remaining_users: Some(grant.remaining_users()),
            },
        }
    }
}

impl TryFrom<UpdateAccessGrantRequest> for AccessGrantUpdate {
    type Error = AppError;

    fn try_from(value: UpdateAccessGrantRequest) -> Result<Self, Self::Error> {
        Ok(Self {
            name: value.name,
            location: value.location,
            address: value.address,
            max_users: value.max_users,
            duration_type: value
                .duration_type
                .as_deref()
                .map(DurationType::from_str)
                .transpose()?,
            valid_duration: value.valid_duration,
            is_active: value.is_active,
        })
    }
}
