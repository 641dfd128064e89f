//! PostgreSQL-backed access grant repository.

use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use qbox_application::{
    AccessGrantQuery, AccessGrantRepository, ConsumeRecordOutcome, NewAccessGrantRecord,
    RenderedQrCode,
};
use qbox_core::{AppError, AppResult};
use qbox_domain::{
    AccessEvent, AccessGrant, AccessGrantId, AccessGrantParts, AccessMethod, DurationType,
    GrantDuration,
};

mod consume;
mod events;
mod grants;
mod qr_codes;

#[cfg(test)]
mod tests;

/// PostgreSQL implementation of the access grant repository port.
#[derive(Clone)]
pub struct PostgresAccessGrantRepository {
    pool: PgPool,
}

impl PostgresAccessGrantRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct AccessGrantRow {
    id: Uuid,
    qbox_id: String,
    created_by: Option<String>,
    name: String,
    location: Option<String>,
    address: Option<String>,
    max_users: i32,
    current_users: i32,
    duration_type: String,
    valid_duration: i32,
    expires_at: DateTime<Utc>,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<AccessGrantRow> for AccessGrant {
    type Error = AppError;

    fn try_from(row: AccessGrantRow) -> Result<Self, Self::Error> {
        let duration = GrantDuration::new(
            DurationType::from_str(row.duration_type.as_str())?,
            stored_count(row.valid_duration, "valid_duration")?,
        )?;

        AccessGrant::from_parts(AccessGrantParts {
            id: AccessGrantId::from_uuid(row.id),
            qbox_id: row.qbox_id,
            created_by: row.created_by,
            name: row.name,
            location: row.location,
            address: row.address,
            max_users: stored_count(row.max_users, "max_users")?,
            current_users: stored_count(row.current_users, "current_users")?,
            duration,
            expires_at: row.expires_at,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct AccessEventRow {
    id: Uuid,
    grant_id: Uuid,
    user_identifier: String,
    user_name: Option<String>,
    accessed_at: DateTime<Utc>,
    access_method: String,
}

impl TryFrom<AccessEventRow> for AccessEvent {
    type Error = AppError;

    fn try_from(row: AccessEventRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            grant_id: AccessGrantId::from_uuid(row.grant_id),
            user_identifier: row.user_identifier,
            user_name: row.user_name,
            accessed_at: row.accessed_at,
            access_method: AccessMethod::from_str(row.access_method.as_str())?,
        })
    }
}

fn stored_count(value: i32, column: &str) -> AppResult<u32> {
    u32::try_from(value)
        .map_err(|_| AppError::Internal(format!("stored {column} {value} is negative")))
}

fn column_count(value: u32, column: &str) -> AppResult<i32> {
    i32::try_from(value)
        .map_err(|_| AppError::Validation(format!("{column} {value} exceeds supported range")))
}

#[async_trait]
impl AccessGrantRepository for PostgresAccessGrantRepository {
    async fn create_grant(&self, record: NewAccessGrantRecord) -> AppResult<()> {
        self.create_grant_impl(record).await
    }

    async fn find_grant(&self, grant_id: AccessGrantId) -> AppResult<Option<AccessGrant>> {
        self.find_grant_impl(grant_id).await
    }

    async fn find_grant_by_token_hash(&self, token_hash: &str) -> AppResult<Option<AccessGrant>> {
        self.find_grant_by_token_hash_impl(token_hash).await
    }

    async fn list_grants(&self, query: AccessGrantQuery) -> AppResult<Vec<AccessGrant>> {
        self.list_grants_impl(query).await
    }

    async fn save_grant(&self, grant: &AccessGrant, activation: Option<bool>) -> AppResult<()> {
        self.save_grant_impl(grant, activation).await
    }

    async fn revoke_grant(&self, grant_id: AccessGrantId) -> AppResult<bool> {
        self.revoke_grant_impl(grant_id).await
    }

    async fn delete_grant(&self, grant_id: AccessGrantId) -> AppResult<bool> {
        self.delete_grant_impl(grant_id).await
    }

    async fn find_access_event(
        &self,
        grant_id: AccessGrantId,
        user_identifier: &str,
    ) -> AppResult<Option<AccessEvent>> {
        self.find_access_event_impl(grant_id, user_identifier).await
    }

    async fn list_access_events(&self, grant_id: AccessGrantId) -> AppResult<Vec<AccessEvent>> {
        self.list_access_events_impl(grant_id).await
    }

    async fn consume_grant(&self, event: AccessEvent) -> AppResult<ConsumeRecordOutcome> {
        self.consume_grant_impl(event).await
    }

    async fn find_token_ciphertext(&self, grant_id: AccessGrantId) -> AppResult<Option<Vec<u8>>> {
        self.find_token_ciphertext_impl(grant_id).await
    }

    async fn find_qr_code(&self, grant_id: AccessGrantId) -> AppResult<Option<RenderedQrCode>> {
        self.find_qr_code_impl(grant_id).await
    }

    async fn store_qr_code(
        &self,
        grant_id: AccessGrantId,
        qr_code: &RenderedQrCode,
    ) -> AppResult<()> {
        self.store_qr_code_impl(grant_id, qr_code).await
    }
}
