use super::*;

impl PostgresAccessGrantRepository {
    pub(super) async fn find_access_event_impl(
        &self,
        grant_id: AccessGrantId,
        user_identifier: &str,
    ) -> AppResult<Option<AccessEvent>> {
        let row = sqlx::query_as::<_, AccessEventRow>(
            r#"
            SELECT id, grant_id, user_identifier, user_name, accessed_at, access_method
            FROM access_grant_events
            WHERE grant_id = $1
              AND user_identifier = $2
            "#,
        )
        .bind(grant_id.as_uuid())
        .bind(user_identifier)
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to find access event for grant '{grant_id}': {error}"
            ))
        })?;

        row.map(AccessEvent::try_from).transpose()
    }

    pub(super) async fn list_access_events_impl(
        &self,
        grant_id: AccessGrantId,
    ) -> AppResult<Vec<AccessEvent>> {
        let rows = sqlx::query_as::<_, AccessEventRow>(
            r#"
            SELECT id, grant_id, user_identifier, user_name, accessed_at, access_method
            FROM access_grant_events
            WHERE grant_id = $1
            ORDER BY accessed_at DESC, id
            "#,
        )
        .bind(grant_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to list access events for grant '{grant_id}': {error}"
            ))
        })?;

        rows.into_iter().map(AccessEvent::try_from).collect()
    }
}
