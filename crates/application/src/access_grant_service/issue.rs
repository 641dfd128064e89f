use chrono::Utc;
use tracing::{info, warn};

use qbox_core::{AppError, UserIdentity};
use qbox_domain::{AccessGrant, GrantDuration, NewAccessGrant};

use crate::access_grant_ports::NewAccessGrantRecord;

use super::token_crypto::generate_token;
use super::*;

impl AccessGrantService {
    /// Issues a new grant for an existing device.
    ///
    /// The grant is persisted before the QR image is rendered; a rendering
    /// failure is logged and reported through `qr_code_rendered` only.
    pub async fn issue_grant(
        &self,
        actor: Option<&UserIdentity>,
        input: IssueAccessGrantInput,
    ) -> AppResult<IssuedAccessGrant> {
        let duration = GrantDuration::new(input.duration_type, input.valid_duration)?;
        let qbox_id = input.qbox_id.trim();

        let device = self
            .device_registry
            .resolve(qbox_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("qbox '{qbox_id}' was not found")))?;

        let grant = AccessGrant::issue(
            NewAccessGrant {
                qbox_id: device.qbox_id().to_owned(),
                created_by: actor.map(|identity| identity.subject().to_owned()),
                name: input.name,
                location: input
                    .location
                    .or_else(|| device.location().map(str::to_owned)),
                address: input
                    .address
                    .or_else(|| device.address().map(str::to_owned)),
                max_users: input.max_users,
                duration,
            },
            Utc::now(),
        )?;
        self.ensure_qr_payload_fits(&grant)?;

        let (access_token, token_hash) = generate_token()?;
        let token_ciphertext = self.token_encryptor.encrypt(access_token.as_bytes())?;

        self.repository
            .create_grant(NewAccessGrantRecord {
                grant: grant.clone(),
                token_hash,
                token_ciphertext,
            })
            .await?;

        let qr_code_rendered = match self.render_and_store_qr_code(&grant, &access_token).await {
            Ok(_) => true,
            Err(error) => {
                warn!(grant_id = %grant.id(), %error, "access grant qr code rendering failed");
                false
            }
        };

        info!(
            grant_id = %grant.id(),
            qbox_id = grant.qbox_id(),
            max_users = grant.max_users(),
            expires_at = %grant.expires_at(),
            "access grant issued"
        );

        Ok(IssuedAccessGrant {
            grant,
            access_token,
            qr_code_rendered,
        })
    }
}
