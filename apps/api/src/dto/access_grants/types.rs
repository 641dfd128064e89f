use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Incoming payload for issuing an access grant.
#[derive(Debug, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/create-access-grant-request.ts"
)]
pub struct CreateAccessGrantRequest {
    pub qbox_id: String,
    pub name: String,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    /// Defaults to 5.
    #[serde(default)]
    pub max_users: Option<u32>,
    /// `days` or `minutes`.
    pub duration_type: String,
    pub valid_duration: u32,
}

/// Incoming partial update of an access grant.
#[derive(Debug, Default, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/update-access-grant-request.ts"
)]
pub struct UpdateAccessGrantRequest {
    #[serde(default)]
    pub name: Option<String>,
    /// An empty string clears the location.
    #[serde(default)]
    pub location: Option<String>,
    /// An empty string clears the address.
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub max_users: Option<u32>,
    #[serde(default)]
    pub duration_type: Option<String>,
    #[serde(default)]
    pub valid_duration: Option<u32>,
    #[serde(default)]
    pub is_active: Option<bool>,
}

/// API representation of an access grant.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/access-grant-response.ts"
)]
pub struct AccessGrantResponse {
    pub id: String,
    pub qbox_id: String,
    pub created_by: Option<String>,
    pub name: String,
    pub location: Option<String>,
    pub address: Option<String>,
    pub max_users: u32,
    pub current_users: u32,
    pub remaining_users: u32,
    pub duration_type: String,
    pub valid_duration: u32,
    pub expires_at: String,
    pub is_active: bool,
    /// One of `active`, `exhausted`, `expired`, `revoked`.
    pub status: String,
    pub is_valid: bool,
    pub qr_code_url: String,
    pub created_at: String,
    pub updated_at: String,
}

/// Issuance response; the only payload that ever carries the access token.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/issued-access-grant-response.ts"
)]
pub struct IssuedAccessGrantResponse {
    #[serde(flatten)]
    pub grant: AccessGrantResponse,
    pub access_token: String,
    pub qr_code_rendered: bool,
}

/// API representation of one recorded access.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/access-event-response.ts"
)]
pub struct AccessEventResponse {
    pub id: String,
    pub grant_id: String,
    pub user_identifier: String,
    pub user_name: Option<String>,
    pub accessed_at: String,
    pub access_method: String,
}

/// Incoming payload for presenting an access token.
#[derive(Debug, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/consume-access-request.ts"
)]
pub struct ConsumeAccessRequest {
    /// Must match the token in the path when present.
    #[serde(default)]
    pub access_token: Option<String>,
    pub user_identifier: String,
    #[serde(default)]
    pub user_name: Option<String>,
}

/// Result of presenting an access token.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/consume-access-response.ts"
)]
pub struct ConsumeAccessResponse {
    pub success: bool,
    pub status_code: u16,
    pub message: String,
    pub qbox_id: String,
    pub location: Option<String>,
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub expires_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub remaining_users: Option<u32>,
}
