use std::time::Duration;

use qbox_application::RateLimitService;
use tracing::{info, warn};

/// Periodically deletes stale rate limit counters while the server runs.
pub fn spawn_rate_limit_cleanup(rate_limit_service: RateLimitService, interval_seconds: u64) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(interval_seconds));
        loop {
            interval.tick().await;
            match rate_limit_service.cleanup().await {
                Ok(0) => {}
                Ok(removed) => info!(removed, "expired access rate limits removed"),
                Err(error) => warn!(%error, "access rate limit cleanup failed"),
            }
        }
    });
}
