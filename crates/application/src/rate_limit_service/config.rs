/// Throttling rule for one category of requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitRule {
    /// Category prefix for counter keys (for example `access_consume`).
    pub category: String,
    /// Maximum number of attempts allowed in one window.
    pub max_attempts: i32,
    /// Window length in seconds.
    pub window_seconds: i64,
}

impl RateLimitRule {
    /// Creates a new rate limit rule.
    #[must_use]
    pub fn new(category: impl Into<String>, max_attempts: i32, window_seconds: i64) -> Self {
        Self {
            category: category.into(),
            max_attempts,
            window_seconds,
        }
    }
}
