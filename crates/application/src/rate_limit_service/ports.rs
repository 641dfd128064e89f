use async_trait::async_trait;
use chrono::{DateTime, Utc};

use qbox_core::AppResult;

/// Repository port for rate limit counters.
#[async_trait]
pub trait RateLimitRepository: Send + Sync {
    /// Counts one attempt for `key`.
    ///
    /// Starts a fresh window when the stored one is older than
    /// `window_seconds`. Returns the count including this attempt.
    async fn record_attempt(&self, key: &str, window_seconds: i64) -> AppResult<AttemptInfo>;

    /// Deletes counters whose window started before `before`.
    ///
    /// Returns the number of counters removed.
    async fn cleanup_expired(&self, before: DateTime<Utc>) -> AppResult<u64>;
}

/// Counter state of the active window for a key.
#[derive(Debug, Clone)]
pub struct AttemptInfo {
    /// Attempts in the current window, this one included.
    pub attempt_count: i32,
    /// Start of the current window.
    pub window_started_at: DateTime<Utc>,
}
