//! Fixed-window request throttling.
//!
//! Counters live in the persistent store so every API instance shares them.

mod config;
mod ports;
mod service;

pub use config::RateLimitRule;
pub use ports::{AttemptInfo, RateLimitRepository};
pub use service::{RATE_LIMIT_RETENTION_SECONDS, RateLimitService};

#[cfg(test)]
mod tests;
