//! Qbox access grant API composition root.

#![forbid(unsafe_code)]

mod api_config;
mod api_router;
mod api_services;
mod dev_seed;
mod dto;
mod error;
mod extract;
mod handlers;
mod middleware;
mod state;

use std::net::SocketAddr;

use qbox_core::AppError;
use tracing::info;

use crate::api_config::{ApiConfig, RunMode};

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    api_config::init_tracing();

    let config = ApiConfig::load()?;
    let pool = api_services::connect_and_migrate(&config).await?;

    match config.run_mode {
        RunMode::MigrateOnly => {
            info!("database migrations applied successfully");
            return Ok(());
        }
        RunMode::Seed => {
            dev_seed::run(&pool).await?;
            info!("development seed applied successfully");
            return Ok(());
        }
        RunMode::Serve => {}
    }

    let app_state = api_services::build_app_state(pool, &config)?;
    api_services::spawn_rate_limit_cleanup(
        app_state.rate_limit_service.clone(),
        config.access_rate_limit_cleanup_interval_seconds,
    );
    let app = api_router::build_router(app_state);

    let address = config.socket_address()?;
    let listener = tokio::net::TcpListener::bind(address)
        .await
        .map_err(|error| AppError::Internal(format!("failed to bind {address}: {error}")))?;

    info!(%address, public_base_url = %config.public_base_url, "qbox api listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .map_err(|error| AppError::Internal(format!("server error: {error}")))
}
