use serde_json::json;
use tracing::{info, warn};

use crate::access_grant_ports::RenderedQrCode;

use super::token_crypto::ACCESS_TOKEN_HEX_LEN;
use super::*;

impl AccessGrantService {
    /// Returns the grant's QR image, rendering and storing it first if missing.
    pub async fn qr_code(&self, grant_id: AccessGrantId) -> AppResult<RenderedQrCode> {
        let grant = self.require_grant(grant_id).await?;

        if let Some(qr_code) = self.repository.find_qr_code(grant_id).await? {
            return Ok(qr_code);
        }

        let access_token = self.decrypt_access_token(grant_id).await?;
        let qr_code = self.render_and_store_qr_code(&grant, &access_token).await?;
        info!(grant_id = %grant_id, "access grant qr code regenerated");

        Ok(qr_code)
    }

    pub(super) async fn render_and_store_qr_code(
        &self,
        grant: &AccessGrant,
        access_token: &str,
    ) -> AppResult<RenderedQrCode> {
        let qr_code = self.qr_encoder.render(&qr_payload(grant, access_token))?;
        self.repository.store_qr_code(grant.id(), &qr_code).await?;
        Ok(qr_code)
    }

    /// Rejects grants whose text fields would not fit into a QR image.
    ///
    /// Field limits count characters, so multi-byte text can still overflow
    /// the encoder's byte capacity.
    pub(super) fn ensure_qr_payload_fits(&self, grant: &AccessGrant) -> AppResult<()> {
        let sizing_token = "0".repeat(ACCESS_TOKEN_HEX_LEN);
        let payload_bytes = qr_payload(grant, &sizing_token).to_string().len();
        let max_payload_bytes = self.qr_encoder.max_payload_bytes();
        if payload_bytes > max_payload_bytes {
            return Err(AppError::Validation(format!(
                "name, location and address are too long for a QR code ({payload_bytes} of {max_payload_bytes} bytes)"
            )));
        }

        Ok(())
    }

    /// Re-renders a stored image after the grant's snapshot fields changed.
    pub(super) async fn refresh_qr_code(&self, grant: &AccessGrant) {
        let result = match self.decrypt_access_token(grant.id()).await {
            Ok(access_token) => self
                .render_and_store_qr_code(grant, &access_token)
                .await
                .map(|_| ()),
            Err(error) => Err(error),
        };

        if let Err(error) = result {
            warn!(grant_id = %grant.id(), %error, "access grant qr code refresh failed");
        }
    }

    async fn decrypt_access_token(&self, grant_id: AccessGrantId) -> AppResult<String> {
        let ciphertext = self
            .repository
            .find_token_ciphertext(grant_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("access grant '{grant_id}' was not found"))
            })?;

        let plaintext = self.token_encryptor.decrypt(&ciphertext)?;
        String::from_utf8(plaintext).map_err(|error| {
            AppError::Internal(format!("stored access token is not valid UTF-8: {error}"))
        })
    }
}

/// Builds the payload embedded in the QR image.
///
/// This is a snapshot for presentation; validity is always re-checked
/// against the stored grant.
fn qr_payload(grant: &AccessGrant, access_token: &str) -> serde_json::Value {
    json!({
        "qbox_id": grant.qbox_id(),
        "access_token": access_token,
        "name": grant.name(),
        "location": grant.location(),
        "address": grant.address(),
        "max_users": grant.max_users(),
        "duration_type": grant.duration().duration_type().as_str(),
        "valid_duration": grant.duration().valid_duration(),
        "expires_at": grant.expires_at().to_rfc3339(),
    })
}
