//! Application services and ports.

#![forbid(unsafe_code)]

mod access_grant_ports;
mod access_grant_service;
mod rate_limit_service;

pub use access_grant_ports::{
    AccessGrantQuery, AccessGrantRepository, ConsumeRecordOutcome, DeviceRegistry,
    NewAccessGrantRecord, QrEncoder, RenderedQrCode, SecretEncryptor,
};
pub use access_grant_service::{
    AccessGrantService, ConsumeAccessInput, ConsumeOutcome, DEFAULT_MAX_USERS,
    IssueAccessGrantInput, IssuedAccessGrant,
};
pub use rate_limit_service::{
    AttemptInfo, RATE_LIMIT_RETENTION_SECONDS, RateLimitRepository, RateLimitRule,
    RateLimitService,
};
