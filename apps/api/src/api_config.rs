use std::env;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;

use qbox_application::RATE_LIMIT_RETENTION_SECONDS;
use qbox_core::AppError;
use tracing_subscriber::EnvFilter;
use url::Url;

/// Subcommand selected on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    Serve,
    MigrateOnly,
    Seed,
}

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub run_mode: RunMode,
    pub database_url: String,
    pub database_max_connections: u32,
    pub api_host: String,
    pub api_port: u16,
    pub public_base_url: String,
    pub access_token_encryption_key: String,
    pub access_rate_limit_max_attempts: i32,
    pub access_rate_limit_window_seconds: i64,
    pub access_rate_limit_cleanup_interval_seconds: u64,
    /// Key rate limits on the first `x-forwarded-for` hop instead of the peer address.
    pub trust_forwarded_for: bool,
}

impl ApiConfig {
    pub fn load() -> Result<Self, AppError> {
        let run_mode = match env::args().nth(1).as_deref() {
            None | Some("serve") => RunMode::Serve,
            Some("migrate") => RunMode::MigrateOnly,
            Some("seed") => RunMode::Seed,
            Some(other) => {
                return Err(AppError::Validation(format!(
                    "unknown subcommand '{other}', expected 'serve', 'migrate' or 'seed'"
                )));
            }
        };

        let database_url = required_non_empty_env("DATABASE_URL")?;
        let database_max_connections = parsed_env("DATABASE_MAX_CONNECTIONS", 10)?;
        if database_max_connections == 0 {
            return Err(AppError::Validation(
                "DATABASE_MAX_CONNECTIONS must be at least 1".to_owned(),
            ));
        }

        let api_host = env::var("API_HOST").unwrap_or_else(|_| "127.0.0.1".to_owned());
        let api_port = parsed_env("API_PORT", 3001)?;

        let public_base_url =
            env::var("PUBLIC_BASE_URL").unwrap_or_else(|_| format!("http://localhost:{api_port}"));
        Url::parse(&public_base_url)
            .map_err(|error| AppError::Validation(format!("invalid PUBLIC_BASE_URL: {error}")))?;
        let public_base_url = public_base_url.trim_end_matches('/').to_owned();

        let access_token_encryption_key = required_non_empty_env("ACCESS_TOKEN_ENCRYPTION_KEY")?;

        let access_rate_limit_max_attempts = parsed_env("ACCESS_RATE_LIMIT_MAX_ATTEMPTS", 30)?;
        let access_rate_limit_window_seconds =
            parsed_env("ACCESS_RATE_LIMIT_WINDOW_SECONDS", 60)?;
        if access_rate_limit_max_attempts < 1 || access_rate_limit_window_seconds < 1 {
            return Err(AppError::Validation(
                "ACCESS_RATE_LIMIT_MAX_ATTEMPTS and ACCESS_RATE_LIMIT_WINDOW_SECONDS must be positive"
                    .to_owned(),
            ));
        }
        if access_rate_limit_window_seconds > RATE_LIMIT_RETENTION_SECONDS {
            return Err(AppError::Validation(format!(
                "ACCESS_RATE_LIMIT_WINDOW_SECONDS must not exceed {RATE_LIMIT_RETENTION_SECONDS}"
            )));
        }

        let access_rate_limit_cleanup_interval_seconds =
            parsed_env("ACCESS_RATE_LIMIT_CLEANUP_INTERVAL_SECONDS", 3600)?;
        if access_rate_limit_cleanup_interval_seconds == 0 {
            return Err(AppError::Validation(
                "ACCESS_RATE_LIMIT_CLEANUP_INTERVAL_SECONDS must be at least 1".to_owned(),
            ));
        }

        let trust_forwarded_for = parsed_env("TRUST_FORWARDED_FOR", false)?;

        Ok(Self {
            run_mode,
            database_url,
            database_max_connections,
            api_host,
            api_port,
            public_base_url,
            access_token_encryption_key,
            access_rate_limit_max_attempts,
            access_rate_limit_window_seconds,
            access_rate_limit_cleanup_interval_seconds,
            trust_forwarded_for,
        })
    }

    pub fn socket_address(&self) -> Result<SocketAddr, AppError> {
        let host = IpAddr::from_str(&self.api_host).map_err(|error| {
            AppError::Validation(format!("invalid API_HOST '{}': {error}", self.api_host))
        })?;
        Ok(SocketAddr::from((host, self.api_port)))
    }
}

pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}

fn required_env(name: &str) -> Result<String, AppError> {
    env::var(name).map_err(|_| AppError::Validation(format!("{name} is required")))
}

fn required_non_empty_env(name: &str) -> Result<String, AppError> {
    let value = required_env(name)?;
    if value.trim().is_empty() {
        return Err(AppError::Validation(format!("{name} must not be empty")));
    }

    Ok(value)
}

fn parsed_env<T>(name: &str, default: T) -> Result<T, AppError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(value) if !value.trim().is_empty() => value
            .trim()
            .parse::<T>()
            .map_err(|error| AppError::Validation(format!("invalid {name}: {error}"))),
        _ => Ok(default),
    }
}
