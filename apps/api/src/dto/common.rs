mod types;

pub use types::{HealthDependencyStatus, HealthResponse};
