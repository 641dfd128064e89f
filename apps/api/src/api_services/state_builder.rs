use std::sync::Arc;

use qbox_application::{AccessGrantService, RateLimitRule, RateLimitService};
use qbox_core::AppError;
use qbox_infrastructure::{
    AesTokenEncryptor, PostgresAccessGrantRepository, PostgresDeviceRegistry,
    PostgresRateLimitRepository, SvgQrEncoder,
};
use sqlx::PgPool;

use crate::api_config::ApiConfig;
use crate::state::AppState;

/// Counter category for access token presentations.
pub const ACCESS_RATE_LIMIT_CATEGORY: &str = "access_consume";

pub fn build_app_state(pool: PgPool, config: &ApiConfig) -> Result<AppState, AppError> {
    let token_encryptor = AesTokenEncryptor::from_hex(&config.access_token_encryption_key)?;

    let access_grant_service = AccessGrantService::new(
        Arc::new(PostgresDeviceRegistry::new(pool.clone())),
        Arc::new(PostgresAccessGrantRepository::new(pool.clone())),
        Arc::new(SvgQrEncoder::default()),
        Arc::new(token_encryptor),
    );
    let rate_limit_service =
        RateLimitService::new(Arc::new(PostgresRateLimitRepository::new(pool.clone())));

    Ok(AppState {
        access_grant_service,
        rate_limit_service,
        access_rate_limit_rule: RateLimitRule::new(
            ACCESS_RATE_LIMIT_CATEGORY,
            config.access_rate_limit_max_attempts,
            config.access_rate_limit_window_seconds,
        ),
        trust_forwarded_for: config.trust_forwarded_for,
        public_base_url: config.public_base_url.clone(),
        postgres_pool: pool,
    })
}
