use tracing::debug;

use super::*;

impl PostgresAccessGrantRepository {
    /// Takes one slot and records the event in a single transaction.
    ///
    /// The conditional `UPDATE` holds the row lock until commit, so concurrent
    /// consumers of the same grant serialize on it and the capacity check is
    /// re-evaluated against the committed counter.
    pub(super) async fn consume_grant_impl(
        &self,
        event: AccessEvent,
    ) -> AppResult<ConsumeRecordOutcome> {
        let grant_id = event.grant_id;
        let mut transaction = self.pool.begin().await.map_err(|error| {
            AppError::Internal(format!("failed to begin transaction: {error}"))
        })?;

        let row = sqlx::query_as::<_, AccessGrantRow>(
            r#"
            UPDATE access_grants
            SET
                current_users = current_users + 1,
                updated_at = $2
            WHERE id = $1
              AND is_active
              AND expires_at > $2
              AND current_users < max_users
            RETURNING
                id, qbox_id, created_by, name, location, address, max_users, current_users,
                duration_type, valid_duration, expires_at, is_active, created_at, updated_at
            "#,
        )
        .bind(grant_id.as_uuid())
        .bind(event.accessed_at)
        .fetch_optional(&mut *transaction)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to consume access grant '{grant_id}': {error}"
            ))
        })?;

        let Some(row) = row else {
            transaction.rollback().await.map_err(|error| {
                AppError::Internal(format!("failed to roll back transaction: {error}"))
            })?;
            return Ok(ConsumeRecordOutcome::Unavailable);
        };

        let inserted = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO access_grant_events (
                id,
                grant_id,
                user_identifier,
                user_name,
                accessed_at,
                access_method
            )
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (grant_id, user_identifier) DO NOTHING
            RETURNING id
            "#,
        )
        .bind(event.id)
        .bind(grant_id.as_uuid())
        .bind(event.user_identifier.as_str())
        .bind(event.user_name.as_deref())
        .bind(event.accessed_at)
        .bind(event.access_method.as_str())
        .fetch_optional(&mut *transaction)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to record access event for grant '{grant_id}': {error}"
            ))
        })?;

        if inserted.is_none() {
            debug!(grant_id = %grant_id, "access event already recorded, increment rolled back");
            transaction.rollback().await.map_err(|error| {
                AppError::Internal(format!("failed to roll back transaction: {error}"))
            })?;
            return Ok(ConsumeRecordOutcome::AlreadyRecorded);
        }

        transaction.commit().await.map_err(|error| {
            AppError::Internal(format!("failed to commit transaction: {error}"))
        })?;

        Ok(ConsumeRecordOutcome::Consumed {
            grant: AccessGrant::try_from(row)?,
            event,
        })
    }
}
