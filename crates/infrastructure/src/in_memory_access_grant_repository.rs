//! In-memory adapters for the access grant ports.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, RwLock};

use qbox_application::{
    AccessGrantQuery, AccessGrantRepository, AttemptInfo, ConsumeRecordOutcome, DeviceRegistry,
    NewAccessGrantRecord, RateLimitRepository, RenderedQrCode,
};
use qbox_core::{AppError, AppResult};
use qbox_domain::{AccessEvent, AccessGrant, AccessGrantId, Device};

#[derive(Debug, Clone)]
struct StoredGrant {
    grant: AccessGrant,
    token_hash: String,
    token_ciphertext: Vec<u8>,
    qr_code: Option<RenderedQrCode>,
}

#[derive(Debug, Default)]
struct GrantStore {
    grants: HashMap<AccessGrantId, StoredGrant>,
    events: Vec<AccessEvent>,
}

impl GrantStore {
    fn event(&self, grant_id: AccessGrantId, user_identifier: &str) -> Option<&AccessEvent> {
        self.events
            .iter()
            .find(|event| event.grant_id == grant_id && event.user_identifier == user_identifier)
    }
}

/// In-memory access grant repository.
///
/// Grants and events share one lock so consumption is atomic.
#[derive(Debug, Default)]
pub struct InMemoryAccessGrantRepository {
    store: RwLock<GrantStore>,
}

impl InMemoryAccessGrantRepository {
    /// Creates an empty in-memory repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AccessGrantRepository for InMemoryAccessGrantRepository {
    async fn create_grant(&self, record: NewAccessGrantRecord) -> AppResult<()> {
        let mut store = self.store.write().await;
        let grant_id = record.grant.id();

        if store
            .grants
            .values()
            .any(|stored| stored.token_hash == record.token_hash)
        {
            return Err(AppError::Conflict(
                "access token hash already exists".to_owned(),
            ));
        }

        store.grants.insert(
            grant_id,
            StoredGrant {
                grant: record.grant,
                token_hash: record.token_hash,
                token_ciphertext: record.token_ciphertext,
                qr_code: None,
            },
        );
        Ok(())
    }

    async fn find_grant(&self, grant_id: AccessGrantId) -> AppResult<Option<AccessGrant>> {
        Ok(self
            .store
            .read()
            .await
            .grants
            .get(&grant_id)
            .map(|stored| stored.grant.clone()))
    }

    async fn find_grant_by_token_hash(&self, token_hash: &str) -> AppResult<Option<AccessGrant>> {
        Ok(self
            .store
            .read()
            .await
            .grants
            .values()
            .find(|stored| stored.token_hash == token_hash)
            .map(|stored| stored.grant.clone()))
    }

    async fn list_grants(&self, query: AccessGrantQuery) -> AppResult<Vec<AccessGrant>> {
        let now = Utc::now();
        let store = self.store.read().await;

        let mut grants: Vec<AccessGrant> = store
            .grants
            .values()
            .map(|stored| &stored.grant)
            .filter(|grant| {
                query
                    .qbox_id
                    .as_deref()
                    .is_none_or(|qbox_id| grant.qbox_id() == qbox_id)
            })
            .filter(|grant| !query.active_only || grant.is_valid_at(now))
            .cloned()
            .collect();
        grants.sort_by(|left, right| {
            right
                .created_at()
                .cmp(&left.created_at())
                .then_with(|| left.id().as_uuid().cmp(&right.id().as_uuid()))
        });

        Ok(grants
            .into_iter()
            .skip(query.offset)
            .take(query.limit)
            .collect())
    }

    async fn save_grant(&self, grant: &AccessGrant, activation: Option<bool>) -> AppResult<()> {
        let mut store = self.store.write().await;
        let stored = store.grants.get_mut(&grant.id()).ok_or_else(|| {
            AppError::NotFound(format!("access grant '{}' was not found", grant.id()))
        })?;

        let current_users = stored.grant.current_users();
        if current_users > grant.max_users() {
            return Err(AppError::Conflict(format!(
                "access grant '{}' already has {current_users} users, above the requested max_users {}",
                grant.id(),
                grant.max_users()
            )));
        }

        let mut parts = grant.clone().into_parts();
        parts.current_users = current_users;
        parts.is_active = activation.unwrap_or(stored.grant.is_active());
        stored.grant = AccessGrant::from_parts(parts)?;
        Ok(())
    }

    async fn revoke_grant(&self, grant_id: AccessGrantId) -> AppResult<bool> {
        let mut store = self.store.write().await;
        let Some(stored) = store.grants.get_mut(&grant_id) else {
            return Ok(false);
        };

        stored.grant.revoke(Utc::now());
        Ok(true)
    }

    async fn delete_grant(&self, grant_id: AccessGrantId) -> AppResult<bool> {
        let mut store = self.store.write().await;
        if store.grants.remove(&grant_id).is_none() {
            return Ok(false);
        }

        store.events.retain(|event| event.grant_id != grant_id);
        Ok(true)
    }

    async fn find_access_event(
        &self,
        grant_id: AccessGrantId,
        user_identifier: &str,
    ) -> AppResult<Option<AccessEvent>> {
        Ok(self
            .store
            .read()
            .await
            .event(grant_id, user_identifier)
            .cloned())
    }

    async fn list_access_events(&self, grant_id: AccessGrantId) -> AppResult<Vec<AccessEvent>> {
        let mut events: Vec<AccessEvent> = self
            .store
            .read()
            .await
            .events
            .iter()
            .filter(|event| event.grant_id == grant_id)
            .cloned()
            .collect();
        events.sort_by_key(|event| std::cmp::Reverse(event.accessed_at));
        Ok(events)
    }

    async fn consume_grant(&self, event: AccessEvent) -> AppResult<ConsumeRecordOutcome> {
        let mut store = self.store.write().await;

        if store.event(event.grant_id, &event.user_identifier).is_some() {
            return Ok(ConsumeRecordOutcome::AlreadyRecorded);
        }

        let Some(stored) = store.grants.get_mut(&event.grant_id) else {
            return Ok(ConsumeRecordOutcome::Unavailable);
        };
        if stored.grant.record_consumption(event.accessed_at).is_err() {
            return Ok(ConsumeRecordOutcome::Unavailable);
        }

        let grant = stored.grant.clone();
        store.events.push(event.clone());
        Ok(ConsumeRecordOutcome::Consumed { grant, event })
    }

    async fn find_token_ciphertext(&self, grant_id: AccessGrantId) -> AppResult<Option<Vec<u8>>> {
        Ok(self
            .store
            .read()
            .await
            .grants
            .get(&grant_id)
            .map(|stored| stored.token_ciphertext.clone()))
    }

    async fn find_qr_code(&self, grant_id: AccessGrantId) -> AppResult<Option<RenderedQrCode>> {
        Ok(self
            .store
            .read()
            .await
            .grants
            .get(&grant_id)
            .and_then(|stored| stored.qr_code.clone()))
    }

    async fn store_qr_code(
        &self,
        grant_id: AccessGrantId,
        qr_code: &RenderedQrCode,
    ) -> AppResult<()> {
        if let Some(stored) = self.store.write().await.grants.get_mut(&grant_id) {
            stored.qr_code = Some(qr_code.clone());
        }
        Ok(())
    }
}

/// In-memory device registry.
#[derive(Debug, Default)]
pub struct InMemoryDeviceRegistry {
    devices: RwLock<HashMap<String, Device>>,
}

impl InMemoryDeviceRegistry {
    /// Creates a registry holding `devices`.
    #[must_use]
    pub fn with_devices(devices: impl IntoIterator<Item = Device>) -> Self {
        Self {
            devices: RwLock::new(
                devices
                    .into_iter()
                    .map(|device| (device.qbox_id().to_owned(), device))
                    .collect(),
            ),
        }
    }

    /// Inserts or replaces a device.
    pub async fn upsert_device(&self, device: Device) {
        self.devices
            .write()
            .await
            .insert(device.qbox_id().to_owned(), device);
    }
}

#[async_trait]
impl DeviceRegistry for InMemoryDeviceRegistry {
    async fn resolve(&self, qbox_id: &str) -> AppResult<Option<Device>> {
        Ok(self.devices.read().await.get(qbox_id).cloned())
    }
}

/// In-memory fixed-window rate limit counters.
#[derive(Debug, Default)]
pub struct InMemoryRateLimitRepository {
    windows: Mutex<HashMap<String, (i32, DateTime<Utc>)>>,
}

impl InMemoryRateLimitRepository {
    /// Creates an empty counter store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RateLimitRepository for InMemoryRateLimitRepository {
    async fn record_attempt(&self, key: &str, window_seconds: i64) -> AppResult<AttemptInfo> {
        let now = Utc::now();
        let mut windows = self.windows.lock().await;
        let entry = windows.entry(key.to_owned()).or_insert((0, now));

        if entry.1 + chrono::Duration::seconds(window_seconds) < now {
            *entry = (0, now);
        }
        entry.0 += 1;

        Ok(AttemptInfo {
            attempt_count: entry.0,
            window_started_at: entry.1,
        })
    }

    async fn cleanup_expired(&self, before: DateTime<Utc>) -> AppResult<u64> {
        let mut windows = self.windows.lock().await;
        let stored = windows.len();
        windows.retain(|_, (_, window_started_at)| *window_started_at >= before);
        Ok((stored - windows.len()) as u64)
    }
}
