//! Ports consumed by the access grant service.

use async_trait::async_trait;

use qbox_core::AppResult;
use qbox_domain::{AccessEvent, AccessGrant, AccessGrantId, Device};

/// Resolves public device identifiers against the external device registry.
#[async_trait]
pub trait DeviceRegistry: Send + Sync {
    /// Returns the device registered under `qbox_id`, if any.
    async fn resolve(&self, qbox_id: &str) -> AppResult<Option<Device>>;
}

/// Grant record handed to storage at issuance.
#[derive(Debug, Clone)]
pub struct NewAccessGrantRecord {
    /// Fully initialised grant.
    pub grant: AccessGrant,
    /// SHA-256 hex digest of the access token, used as lookup key.
    pub token_hash: String,
    /// Encrypted access token, kept so the QR image can be rebuilt.
    pub token_ciphertext: Vec<u8>,
}

/// Result of the storage-level atomic consume.
#[derive(Debug, Clone)]
pub enum ConsumeRecordOutcome {
    /// One slot was taken and the event stored.
    Consumed {
        /// Grant state after the increment.
        grant: AccessGrant,
        /// Stored event.
        event: AccessEvent,
    },
    /// An event for this user already existed; nothing changed.
    AlreadyRecorded,
    /// The conditional increment matched no row (revoked, expired, full or deleted).
    Unavailable,
}

/// Listing filter for grants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessGrantQuery {
    /// Restrict to one device.
    pub qbox_id: Option<String>,
    /// Return only consumable grants.
    pub active_only: bool,
    /// Maximum rows returned.
    pub limit: usize,
    /// Number of rows skipped for pagination.
    pub offset: usize,
}

/// Rendered QR image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedQrCode {
    /// MIME type of `bytes`.
    pub content_type: String,
    /// Encoded image.
    pub bytes: Vec<u8>,
}

/// Persistent store for grants, their access events and rendered QR images.
#[async_trait]
pub trait AccessGrantRepository: Send + Sync {
    /// Persists a newly issued grant in a single write.
    async fn create_grant(&self, record: NewAccessGrantRecord) -> AppResult<()>;

    /// Finds a grant by id.
    async fn find_grant(&self, grant_id: AccessGrantId) -> AppResult<Option<AccessGrant>>;

    /// Finds a grant by the hash of its access token.
    async fn find_grant_by_token_hash(&self, token_hash: &str) -> AppResult<Option<AccessGrant>>;

    /// Lists grants, newest first.
    async fn list_grants(&self, query: AccessGrantQuery) -> AppResult<Vec<AccessGrant>>;

    /// Writes the editable fields of `grant`.
    ///
    /// Never touches the token, `expires_at` or `current_users`. `is_active`
    /// is only written when `activation` is set, so a revoke stored after
    /// `grant` was loaded survives an unrelated edit. Fails with `NotFound`
    /// when the grant is gone and `Conflict` when the stored usage counter
    /// already exceeds the new capacity.
    async fn save_grant(&self, grant: &AccessGrant, activation: Option<bool>) -> AppResult<()>;

    /// Sets `is_active = false`. Returns `false` when no such grant exists.
    async fn revoke_grant(&self, grant_id: AccessGrantId) -> AppResult<bool>;

    /// Deletes a grant with its events and QR image. Returns `false` when no such grant exists.
    async fn delete_grant(&self, grant_id: AccessGrantId) -> AppResult<bool>;

    /// Finds the event recorded for one user on one grant.
    async fn find_access_event(
        &self,
        grant_id: AccessGrantId,
        user_identifier: &str,
    ) -> AppResult<Option<AccessEvent>>;

    /// Lists a grant's events, newest first.
    async fn list_access_events(&self, grant_id: AccessGrantId) -> AppResult<Vec<AccessEvent>>;

    /// Atomically takes one slot and records `event`.
    ///
    /// The increment only applies while the grant is active, unexpired at
    /// `event.accessed_at` and below capacity, and is rolled back if an event
    /// for the same user already exists.
    async fn consume_grant(&self, event: AccessEvent) -> AppResult<ConsumeRecordOutcome>;

    /// Returns the encrypted access token of a grant.
    async fn find_token_ciphertext(&self, grant_id: AccessGrantId) -> AppResult<Option<Vec<u8>>>;

    /// Returns the stored QR image of a grant.
    async fn find_qr_code(&self, grant_id: AccessGrantId) -> AppResult<Option<RenderedQrCode>>;

    /// Stores the rendered QR image of a grant.
    async fn store_qr_code(
        &self,
        grant_id: AccessGrantId,
        qr_code: &RenderedQrCode,
    ) -> AppResult<()>;
}

/// Renders a scannable image for a JSON payload.
pub trait QrEncoder: Send + Sync {
    /// Renders `payload` into an image.
    fn render(&self, payload: &serde_json::Value) -> AppResult<RenderedQrCode>;

    /// Largest serialized payload, in bytes, that `render` can encode.
    fn max_payload_bytes(&self) -> usize;
}

/// Port for encrypting access tokens at rest.
pub trait SecretEncryptor: Send + Sync {
    /// Encrypts a secret for database storage.
    fn encrypt(&self, plaintext: &[u8]) -> AppResult<Vec<u8>>;

    /// Decrypts a stored secret.
    fn decrypt(&self, ciphertext: &[u8]) -> AppResult<Vec<u8>>;
}
