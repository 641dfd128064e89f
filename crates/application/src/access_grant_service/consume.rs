use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use qbox_core::AppError;
use qbox_domain::{AccessMethod, AccessGrantStatus, UserIdentifier};

use crate::access_grant_ports::ConsumeRecordOutcome;

use super::token_crypto::hash_token;
use super::*;

const INVALID_TOKEN_MESSAGE: &str = "access token is invalid";

impl AccessGrantService {
    /// Consumes one slot of the grant identified by `input.access_token`.
    ///
    /// A repeat presentation by the same user is reported as
    /// [`ConsumeOutcome::AlreadyGranted`] and changes nothing.
    pub async fn consume_grant(&self, input: ConsumeAccessInput) -> AppResult<ConsumeOutcome> {
        let user_identifier = UserIdentifier::new(input.user_identifier)?;
        let user_name = UserIdentifier::display_name(input.user_name)?;

        let access_token = input.access_token.trim();
        if access_token.is_empty() {
            return Err(AppError::NotFound(INVALID_TOKEN_MESSAGE.to_owned()));
        }

        let grant = self
            .repository
            .find_grant_by_token_hash(&hash_token(access_token))
            .await?
            .ok_or_else(|| AppError::NotFound(INVALID_TOKEN_MESSAGE.to_owned()))?;

        if self
            .repository
            .find_access_event(grant.id(), user_identifier.as_str())
            .await?
            .is_some()
        {
            return Ok(ConsumeOutcome::AlreadyGranted { grant });
        }

        let now = Utc::now();
        let status = grant.status_at(now);
        if status != AccessGrantStatus::Active {
            return Err(AppError::GrantExhaustedOrExpired(
                status.unavailable_reason().to_owned(),
            ));
        }

        let event = AccessEvent {
            id: Uuid::new_v4(),
            grant_id: grant.id(),
            user_identifier: user_identifier.as_str().to_owned(),
            user_name,
            accessed_at: now,
            access_method: AccessMethod::QrCode,
        };

        match self.repository.consume_grant(event).await? {
            ConsumeRecordOutcome::Consumed { grant, event } => {
                info!(
                    grant_id = %grant.id(),
                    event_id = %event.id,
                    remaining_users = grant.remaining_users(),
                    "access grant consumed"
                );
                Ok(ConsumeOutcome::Granted { grant, event })
            }
            ConsumeRecordOutcome::AlreadyRecorded => {
                let grant = self.refetch_after_race(grant.id()).await?;
                Ok(ConsumeOutcome::AlreadyGranted { grant })
            }
            ConsumeRecordOutcome::Unavailable => {
                let grant = self.refetch_after_race(grant.id()).await?;
                let reason = match grant.status_at(now) {
                    AccessGrantStatus::Active => AccessGrantStatus::Exhausted.unavailable_reason(),
                    status => status.unavailable_reason(),
                };
                info!(grant_id = %grant.id(), reason, "access grant consumption lost a race");
                Err(AppError::GrantExhaustedOrExpired(reason.to_owned()))
            }
        }
    }

    async fn refetch_after_race(&self, grant_id: AccessGrantId) -> AppResult<AccessGrant> {
        self.repository
            .find_grant(grant_id)
            .await?
            .ok_or_else(|| AppError::NotFound(INVALID_TOKEN_MESSAGE.to_owned()))
    }
}
