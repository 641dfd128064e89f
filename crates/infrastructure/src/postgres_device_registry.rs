//! PostgreSQL-backed device registry using the `qboxes` table.

use async_trait::async_trait;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use qbox_application::DeviceRegistry;
use qbox_core::{AppError, AppResult};
use qbox_domain::Device;

/// PostgreSQL implementation of the device registry port.
#[derive(Clone)]
pub struct PostgresDeviceRegistry {
    pool: PgPool,
}

impl PostgresDeviceRegistry {
    /// Creates a registry with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Inserts or refreshes a device keyed by its public `qbox_id`.
    pub async fn upsert_device(&self, device: &Device) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO qboxes (id, qbox_id, name, location, address)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (qbox_id) DO UPDATE
            SET
                name = EXCLUDED.name,
                location = EXCLUDED.location,
                address = EXCLUDED.address
            "#,
        )
        .bind(device.id())
        .bind(device.qbox_id())
        .bind(device.name())
        .bind(device.location())
        .bind(device.address())
        .execute(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to upsert qbox '{}': {error}",
                device.qbox_id()
            ))
        })?;

        Ok(())
    }
}

#[derive(Debug, FromRow)]
struct DeviceRow {
    id: Uuid,
    qbox_id: String,
    name: String,
    location: Option<String>,
    address: Option<String>,
}

#[async_trait]
impl DeviceRegistry for PostgresDeviceRegistry {
    async fn resolve(&self, qbox_id: &str) -> AppResult<Option<Device>> {
        let row = sqlx::query_as::<_, DeviceRow>(
            r#"
            SELECT id, qbox_id, name, location, address
            FROM qboxes
            WHERE qbox_id = $1
            "#,
        )
        .bind(qbox_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to resolve qbox '{qbox_id}': {error}"))
        })?;

        Ok(row.map(|row| Device::new(row.id, row.qbox_id, row.name, row.location, row.address)))
    }
}
