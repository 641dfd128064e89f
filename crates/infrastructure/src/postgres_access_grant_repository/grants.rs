use super::*;

impl PostgresAccessGrantRepository {
    pub(super) async fn create_grant_impl(&self, record: NewAccessGrantRecord) -> AppResult<()> {
        let grant = &record.grant;
        sqlx::query(
            r#"
            INSERT INTO access_grants (
                id,
                qbox_id,
                created_by,
                name,
                location,
                address,
                max_users,
                current_users,
                duration_type,
                valid_duration,
                expires_at,
                is_active,
                token_hash,
                token_ciphertext,
                created_at,
                updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
            "#,
        )
        .bind(grant.id().as_uuid())
        .bind(grant.qbox_id())
        .bind(grant.created_by())
        .bind(grant.name())
        .bind(grant.location())
        .bind(grant.address())
        .bind(column_count(grant.max_users(), "max_users")?)
        .bind(column_count(grant.current_users(), "current_users")?)
        .bind(grant.duration().duration_type().as_str())
        .bind(column_count(grant.duration().valid_duration(), "valid_duration")?)
        .bind(grant.expires_at())
        .bind(grant.is_active())
        .bind(record.token_hash.as_str())
        .bind(record.token_ciphertext.as_slice())
        .bind(grant.created_at())
        .bind(grant.updated_at())
        .execute(&self.pool)
        .await
        .map_err(|error| match error {
            sqlx::Error::Database(database_error) if database_error.is_foreign_key_violation() => {
                AppError::NotFound(format!("qbox '{}' was not found", grant.qbox_id()))
            }
            error => AppError::Internal(format!(
                "failed to create access grant '{}': {error}",
                grant.id()
            )),
        })?;

        Ok(())
    }

    pub(super) async fn find_grant_impl(
        &self,
        grant_id: AccessGrantId,
    ) -> AppResult<Option<AccessGrant>> {
        let row = sqlx::query_as::<_, AccessGrantRow>(
            r#"
            SELECT
                id, qbox_id, created_by, name, location, address, max_users, current_users,
                duration_type, valid_duration, expires_at, is_active, created_at, updated_at
            FROM access_grants
            WHERE id = $1
            "#,
        )
        .bind(grant_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to find access grant '{grant_id}': {error}"))
        })?;

        row.map(AccessGrant::try_from).transpose()
    }

    pub(super) async fn find_grant_by_token_hash_impl(
        &self,
        token_hash: &str,
    ) -> AppResult<Option<AccessGrant>> {
        let row = sqlx::query_as::<_, AccessGrantRow>(
            r#"
            SELECT
                id, qbox_id, created_by, name, location, address, max_users, current_users,
                duration_type, valid_duration, expires_at, is_active, created_at, updated_at
            FROM access_grants
            WHERE token_hash = $1
            "#,
        )
        .bind(token_hash)
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to find access grant by token: {error}"))
        })?;

        row.map(AccessGrant::try_from).transpose()
    }

    pub(super) async fn list_grants_impl(
        &self,
        query: AccessGrantQuery,
    ) -> AppResult<Vec<AccessGrant>> {
        let limit = i64::try_from(query.limit)
            .map_err(|_| AppError::Validation("limit exceeds supported range".to_owned()))?;
        let offset = i64::try_from(query.offset)
            .map_err(|_| AppError::Validation("offset exceeds supported range".to_owned()))?;

        let rows = sqlx::query_as::<_, AccessGrantRow>(
            r#"
            SELECT
                id, qbox_id, created_by, name, location, address, max_users, current_users,
                duration_type, valid_duration, expires_at, is_active, created_at, updated_at
            FROM access_grants
            WHERE ($1::TEXT IS NULL OR qbox_id = $1)
              AND (
                  NOT $2
                  OR (is_active AND expires_at > now() AND current_users < max_users)
              )
            ORDER BY created_at DESC, id
            LIMIT $3
            OFFSET $4
            "#,
        )
        .bind(query.qbox_id.as_deref())
        .bind(query.active_only)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to list access grants: {error}")))?;

        rows.into_iter().map(AccessGrant::try_from).collect()
    }

    pub(super) async fn save_grant_impl(
        &self,
        grant: &AccessGrant,
        activation: Option<bool>,
    ) -> AppResult<()> {
        let max_users = column_count(grant.max_users(), "max_users")?;
        let updated = sqlx::query_scalar::<_, Uuid>(
            r#"
            UPDATE access_grants
            SET
                name = $2,
                location = $3,
                address = $4,
                max_users = $5,
                duration_type = $6,
                valid_duration = $7,
                is_active = COALESCE($8, is_active),
                updated_at = $9
            WHERE id = $1
              AND current_users <= $5
            RETURNING id
            "#,
        )
        .bind(grant.id().as_uuid())
        .bind(grant.name())
        .bind(grant.location())
        .bind(grant.address())
        .bind(max_users)
        .bind(grant.duration().duration_type().as_str())
        .bind(column_count(grant.duration().valid_duration(), "valid_duration")?)
        .bind(activation)
        .bind(grant.updated_at())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to save access grant '{}': {error}",
                grant.id()
            ))
        })?;

        if updated.is_some() {
            return Ok(());
        }

        // Distinguish a deleted grant from a concurrent consume that outgrew the new capacity.
        match self.find_grant_impl(grant.id()).await? {
            None => Err(AppError::NotFound(format!(
                "access grant '{}' was not found",
                grant.id()
            ))),
            Some(stored) => Err(AppError::Conflict(format!(
                "access grant '{}' already has {} users, above the requested max_users {}",
                grant.id(),
                stored.current_users(),
                grant.max_users()
            ))),
        }
    }

    pub(super) async fn revoke_grant_impl(&self, grant_id: AccessGrantId) -> AppResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE access_grants
            SET
                is_active = FALSE,
                updated_at = CASE WHEN is_active THEN now() ELSE updated_at END
            WHERE id = $1
            "#,
        )
        .bind(grant_id.as_uuid())
        .execute(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to revoke access grant '{grant_id}': {error}"))
        })?;

        Ok(result.rows_affected() > 0)
    }

    pub(super) async fn delete_grant_impl(&self, grant_id: AccessGrantId) -> AppResult<bool> {
        // Events and the stored QR image go with the row.
        let result = sqlx::query(
            r#"
            DELETE FROM access_grants
            WHERE id = $1
            "#,
        )
        .bind(grant_id.as_uuid())
        .execute(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to delete access grant '{grant_id}': {error}"))
        })?;

        Ok(result.rows_affected() > 0)
    }
}
