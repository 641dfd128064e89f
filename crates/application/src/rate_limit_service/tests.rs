use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tokio::sync::Mutex;

use qbox_core::{AppError, AppResult};

use super::{
    AttemptInfo, RATE_LIMIT_RETENTION_SECONDS, RateLimitRepository, RateLimitRule,
    RateLimitService,
};

#[derive(Default)]
struct CountingRepository {
    counts: Mutex<HashMap<String, (i32, DateTime<Utc>)>>,
}

#[async_trait]
impl RateLimitRepository for CountingRepository {
    async fn record_attempt(&self, key: &str, _window_seconds: i64) -> AppResult<AttemptInfo> {
        let mut counts = self.counts.lock().await;
        let entry = counts.entry(key.to_owned()).or_insert((0, Utc::now()));
        entry.0 += 1;

        Ok(AttemptInfo {
            attempt_count: entry.0,
            window_started_at: entry.1,
        })
    }

    async fn cleanup_expired(&self, before: DateTime<Utc>) -> AppResult<u64> {
        let mut counts = self.counts.lock().await;
        let stored = counts.len();
        counts.retain(|_, (_, window_started_at)| *window_started_at >= before);
        Ok((stored - counts.len()) as u64)
    }
}

#[tokio::test]
async fn rejects_attempts_beyond_the_window_budget() {
    let repository = Arc::new(CountingRepository::default());
    let service = RateLimitService::new(repository.clone());
    let rule = RateLimitRule::new("access_consume", 2, 60);

    assert!(service.check_rate_limit(&rule, "10.0.0.1").await.is_ok());
    assert!(service.check_rate_limit(&rule, "10.0.0.1").await.is_ok());
    assert!(matches!(
        service.check_rate_limit(&rule, "10.0.0.1").await,
        Err(AppError::RateLimited(_))
    ));

    assert!(service.check_rate_limit(&rule, "10.0.0.2").await.is_ok());
    assert!(
        repository
            .counts
            .lock()
            .await
            .contains_key("access_consume:10.0.0.1")
    );
}

#[tokio::test]
async fn cleanup_removes_only_counters_past_retention() {
    let repository = Arc::new(CountingRepository::default());
    let service = RateLimitService::new(repository.clone());
    let rule = RateLimitRule::new("access_consume", 5, 60);

    assert!(service.check_rate_limit(&rule, "10.0.0.1").await.is_ok());
    assert!(service.check_rate_limit(&rule, "10.0.0.2").await.is_ok());
    if let Some(entry) = repository
        .counts
        .lock()
        .await
        .get_mut("access_consume:10.0.0.1")
    {
        entry.1 = Utc::now() - Duration::seconds(RATE_LIMIT_RETENTION_SECONDS + 60);
    }

    assert_eq!(service.cleanup().await.ok(), Some(1));
    let counts = repository.counts.lock().await;
    assert!(!counts.contains_key("access_consume:10.0.0.1"));
    assert!(counts.contains_key("access_consume:10.0.0.2"));
}
