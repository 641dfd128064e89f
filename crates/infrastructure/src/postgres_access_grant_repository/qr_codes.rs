use super::*;

#[derive(Debug, FromRow)]
struct QrCodeRow {
    qr_code_content_type: Option<String>,
    qr_code_image: Option<Vec<u8>>,
}

impl PostgresAccessGrantRepository {
    pub(super) async fn find_token_ciphertext_impl(
        &self,
        grant_id: AccessGrantId,
    ) -> AppResult<Option<Vec<u8>>> {
        sqlx::query_scalar::<_, Vec<u8>>(
            r#"
            SELECT token_ciphertext
            FROM access_grants
            WHERE id = $1
            "#,
        )
        .bind(grant_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to load access token for grant '{grant_id}': {error}"
            ))
        })
    }

    pub(super) async fn find_qr_code_impl(
        &self,
        grant_id: AccessGrantId,
    ) -> AppResult<Option<RenderedQrCode>> {
        let row = sqlx::query_as::<_, QrCodeRow>(
            r#"
            SELECT qr_code_content_type, qr_code_image
            FROM access_grants
            WHERE id = $1
            "#,
        )
        .bind(grant_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to load qr code for grant '{grant_id}': {error}"
            ))
        })?;

        Ok(row.and_then(|row| match (row.qr_code_content_type, row.qr_code_image) {
            (Some(content_type), Some(bytes)) => Some(RenderedQrCode {
                content_type,
                bytes,
            }),
            _ => None,
        }))
    }

    pub(super) async fn store_qr_code_impl(
        &self,
        grant_id: AccessGrantId,
        qr_code: &RenderedQrCode,
    ) -> AppResult<()> {
        sqlx::query(
            r#"
            UPDATE access_grants
            SET
                qr_code_content_type = $2,
                qr_code_image = $3
            WHERE id = $1
            "#,
        )
        .bind(grant_id.as_uuid())
        .bind(qr_code.content_type.as_str())
        .bind(qr_code.bytes.as_slice())
        .execute(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to store qr code for grant '{grant_id}': {error}"
            ))
        })?;

        Ok(())
    }
}
