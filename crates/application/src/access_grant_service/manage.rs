use chrono::Utc;
use tracing::info;

use qbox_core::UserIdentity;
use qbox_domain::AccessGrantUpdate;

use crate::access_grant_ports::AccessGrantQuery;

use super::*;

impl AccessGrantService {
    /// Returns one grant.
    pub async fn get_grant(&self, grant_id: AccessGrantId) -> AppResult<AccessGrant> {
        self.require_grant(grant_id).await
    }

    /// Lists grants, newest first.
    pub async fn list_grants(&self, query: AccessGrantQuery) -> AppResult<Vec<AccessGrant>> {
        let active_only = query.active_only;
        let query = AccessGrantQuery {
            qbox_id: query
                .qbox_id
                .map(|value| value.trim().to_owned())
                .filter(|value| !value.is_empty()),
            limit: query.limit.clamp(1, 200),
            ..query
        };

        let grants = self.repository.list_grants(query).await?;
        if !active_only {
            return Ok(grants);
        }

        let now = Utc::now();
        Ok(grants
            .into_iter()
            .filter(|grant| Self::check_validity(grant, now))
            .collect())
    }

    /// Applies an edit to a grant's mutable fields.
    pub async fn update_grant(
        &self,
        actor: &UserIdentity,
        grant_id: AccessGrantId,
        update: AccessGrantUpdate,
    ) -> AppResult<AccessGrant> {
        let mut grant = self.require_grant(grant_id).await?;
        let activation = update.is_active;
        grant.apply_update(update, Utc::now())?;
        self.ensure_qr_payload_fits(&grant)?;
        self.repository.save_grant(&grant, activation).await?;
        // Storage owns the usage counter; reload to pick up concurrent consumes.
        let grant = self.require_grant(grant_id).await?;

        if self.repository.find_qr_code(grant_id).await?.is_some() {
            self.refresh_qr_code(&grant).await;
        }

        info!(grant_id = %grant_id, actor = actor.subject(), "access grant updated");
        Ok(grant)
    }

    /// Deactivates a grant. Revoking an already revoked grant succeeds.
    pub async fn revoke_grant(&self, actor: &UserIdentity, grant_id: AccessGrantId) -> AppResult<()> {
        if !self.repository.revoke_grant(grant_id).await? {
            return Err(AppError::NotFound(format!(
                "access grant '{grant_id}' was not found"
            )));
        }

        info!(grant_id = %grant_id, actor = actor.subject(), "access grant revoked");
        Ok(())
    }

    /// Deletes a grant together with its access events.
    pub async fn delete_grant(&self, actor: &UserIdentity, grant_id: AccessGrantId) -> AppResult<()> {
        if !self.repository.delete_grant(grant_id).await? {
            return Err(AppError::NotFound(format!(
                "access grant '{grant_id}' was not found"
            )));
        }

        info!(grant_id = %grant_id, actor = actor.subject(), "access grant deleted");
        Ok(())
    }

    /// Lists the access events recorded for a grant, newest first.
    pub async fn list_access_events(&self, grant_id: AccessGrantId) -> AppResult<Vec<AccessEvent>> {
        self.require_grant(grant_id).await?;
        self.repository.list_access_events(grant_id).await
    }
}
