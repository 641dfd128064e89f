use std::sync::Arc;

use chrono::{Duration, Utc};
use tracing::{debug, warn};

use qbox_core::{AppError, AppResult};

use super::config::RateLimitRule;
use super::ports::RateLimitRepository;

/// How long a counter is kept after its window started.
///
/// Rules with longer windows are rejected at configuration time.
pub const RATE_LIMIT_RETENTION_SECONDS: i64 = 24 * 60 * 60;

/// Application service for request throttling.
#[derive(Clone)]
pub struct RateLimitService {
    repository: Arc<dyn RateLimitRepository>,
}

impl RateLimitService {
    /// Creates a new rate limit service.
    #[must_use]
    pub fn new(repository: Arc<dyn RateLimitRepository>) -> Self {
        Self { repository }
    }

    /// Records an attempt for `identifier` under `rule`.
    ///
    /// Returns `AppError::RateLimited` once the window's budget is spent.
    pub async fn check_rate_limit(&self, rule: &RateLimitRule, identifier: &str) -> AppResult<()> {
        let key = format!("{}:{identifier}", rule.category);
        let info = self
            .repository
            .record_attempt(&key, rule.window_seconds)
            .await?;

        if info.attempt_count > rule.max_attempts {
            warn!(
                category = rule.category.as_str(),
                identifier,
                attempts = info.attempt_count,
                window_started_at = %info.window_started_at,
                "rate limit exceeded"
            );
            return Err(AppError::RateLimited(
                "too many requests, please try again later".to_owned(),
            ));
        }

        Ok(())
    }

    /// Removes counters older than [`RATE_LIMIT_RETENTION_SECONDS`].
    pub async fn cleanup(&self) -> AppResult<u64> {
        let cutoff = Utc::now() - Duration::seconds(RATE_LIMIT_RETENTION_SECONDS);
        let removed = self.repository.cleanup_expired(cutoff).await?;
        debug!(removed, %cutoff, "expired rate limit counters removed");
        Ok(removed)
    }
}
