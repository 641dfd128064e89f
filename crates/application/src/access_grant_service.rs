//! Issuance, validation and consumption of Qbox access grants.
//!
//! Access tokens are 256-bit random values returned in plaintext only at
//! issuance. Storage keeps a SHA-256 digest for lookup plus an encrypted copy
//! used to regenerate the QR image.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use qbox_core::{AppError, AppResult};
use qbox_domain::{AccessEvent, AccessGrant, AccessGrantId, DurationType};

use crate::access_grant_ports::{AccessGrantRepository, DeviceRegistry, QrEncoder, SecretEncryptor};

mod consume;
mod issue;
mod manage;
mod qr_code;
mod token_crypto;


/// Default capacity applied when a caller does not provide `max_users`.
pub const DEFAULT_MAX_USERS: u32 = 5;

/// Input payload for issuing a grant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueAccessGrantInput {
    /// Public identifier of the target device.
    pub qbox_id: String,
    /// Human-readable label.
    pub name: String,
    /// Location snapshot; defaults to the device's location.
    pub location: Option<String>,
    /// Address snapshot; defaults to the device's address.
    pub address: Option<String>,
    /// Capacity.
    pub max_users: u32,
    /// Duration unit.
    pub duration_type: DurationType,
    /// Duration amount.
    pub valid_duration: u32,
}

/// Newly issued grant with its plaintext token.
#[derive(Debug, Clone)]
pub struct IssuedAccessGrant {
    /// Persisted grant.
    pub grant: AccessGrant,
    /// Plaintext access token. Never returned again.
    pub access_token: String,
    /// Whether the QR image was rendered during issuance.
    pub qr_code_rendered: bool,
}

/// Input payload for consuming a grant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsumeAccessInput {
    /// Presented access token.
    pub access_token: String,
    /// Free-form identifier of the person presenting the token.
    pub user_identifier: String,
    /// Optional display name.
    pub user_name: Option<String>,
}

/// Successful consumption result.
#[derive(Debug, Clone)]
pub enum ConsumeOutcome {
    /// The user had already been granted access; nothing changed.
    AlreadyGranted {
        /// Current grant state.
        grant: AccessGrant,
    },
    /// A slot was taken for this user.
    Granted {
        /// Grant state after consumption.
        grant: AccessGrant,
        /// Recorded access event.
        event: AccessEvent,
    },
}

impl ConsumeOutcome {
    /// Returns the grant carried by either outcome.
    #[must_use]
    pub fn grant(&self) -> &AccessGrant {
        match self {
            Self::AlreadyGranted { grant } | Self::Granted { grant, .. } => grant,
        }
    }
}

/// Application service for the access grant lifecycle.
#[derive(Clone)]
pub struct AccessGrantService {
    device_registry: Arc<dyn DeviceRegistry>,
    repository: Arc<dyn AccessGrantRepository>,
    qr_encoder: Arc<dyn QrEncoder>,
    token_encryptor: Arc<dyn SecretEncryptor>,
}

impl AccessGrantService {
    /// Creates a new access grant service.
    #[must_use]
    pub fn new(
        device_registry: Arc<dyn DeviceRegistry>,
        repository: Arc<dyn AccessGrantRepository>,
        qr_encoder: Arc<dyn QrEncoder>,
        token_encryptor: Arc<dyn SecretEncryptor>,
    ) -> Self {
        Self {
            device_registry,
            repository,
            qr_encoder,
            token_encryptor,
        }
    }

    /// Returns whether `grant` can be consumed at `now`.
    #[must_use]
    pub fn check_validity(grant: &AccessGrant, now: DateTime<Utc>) -> bool {
        grant.is_valid_at(now)
    }

    async fn require_grant(&self, grant_id: AccessGrantId) -> AppResult<AccessGrant> {
        self.repository
            .find_grant(grant_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("access grant '{grant_id}' was not found")))
    }
}
