//! Infrastructure adapters for application ports.

#![forbid(unsafe_code)]

mod aes_token_encryptor;
mod in_memory_access_grant_repository;
mod postgres_access_grant_repository;
mod postgres_device_registry;
mod postgres_rate_limit_repository;
mod svg_qr_encoder;

pub use aes_token_encryptor::AesTokenEncryptor;
pub use in_memory_access_grant_repository::{
    InMemoryAccessGrantRepository, InMemoryDeviceRegistry, InMemoryRateLimitRepository,
};
pub use postgres_access_grant_repository::PostgresAccessGrantRepository;
pub use postgres_device_registry::PostgresDeviceRegistry;
pub use postgres_rate_limit_repository::PostgresRateLimitRepository;
pub use svg_qr_encoder::SvgQrEncoder;
