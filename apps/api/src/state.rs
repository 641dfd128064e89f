use qbox_application::{AccessGrantService, RateLimitRule, RateLimitService};
use sqlx::PgPool;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub access_grant_service: AccessGrantService,
    pub rate_limit_service: RateLimitService,
    pub access_rate_limit_rule: RateLimitRule,
    /// Whether `x-forwarded-for` comes from a trusted proxy.
    pub trust_forwarded_for: bool,
    /// Externally reachable origin, without trailing slash.
    pub public_base_url: String,
    pub postgres_pool: PgPool,
}
